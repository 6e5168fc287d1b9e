//! Shared helpers for command handlers.

use std::path::Path;

use serde_json::Value;

use crate::error::CliError;

/// Split repeated `key=value` flags into ordered query pairs.
pub fn parse_query_pairs(raw: &[String]) -> Result<Vec<(String, String)>, CliError> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
            _ => Err(CliError::Validation {
                field: "query".into(),
                reason: format!("expected KEY=VALUE, got '{pair}'"),
            }),
        })
        .collect()
}

/// Body from `--data` or `--from-file`; `null` (no body) when neither is given.
pub fn read_body(data: Option<&str>, from_file: Option<&Path>) -> Result<Value, CliError> {
    match (data, from_file) {
        (Some(inline), _) => parse_json(inline, "data"),
        (None, Some(path)) => {
            let contents = std::fs::read_to_string(path)?;
            parse_json(&contents, "from-file")
        }
        (None, None) => Ok(Value::Null),
    }
}

fn parse_json(text: &str, field: &str) -> Result<Value, CliError> {
    serde_json::from_str(text).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_keep_order_and_allow_empty_values() {
        let raw = vec!["b=2".to_owned(), "a=".to_owned(), "q=x=y".to_owned()];
        let pairs = parse_query_pairs(&raw).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("b".to_owned(), "2".to_owned()),
                ("a".to_owned(), String::new()),
                ("q".to_owned(), "x=y".to_owned()),
            ]
        );
    }

    #[test]
    fn query_pair_without_key_is_rejected() {
        assert!(parse_query_pairs(&["=1".to_owned()]).is_err());
        assert!(parse_query_pairs(&["flag".to_owned()]).is_err());
    }

    #[test]
    fn body_defaults_to_null() {
        assert_eq!(read_body(None, None).unwrap(), Value::Null);
        assert_eq!(
            read_body(Some(r#"{"desc":"Lobby"}"#), None).unwrap(),
            serde_json::json!({"desc": "Lobby"})
        );
        assert!(matches!(
            read_body(Some("{oops"), None),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn body_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(&path, r#"{"pkey":"1000"}"#).unwrap();
        assert_eq!(
            read_body(None, Some(&path)).unwrap(),
            serde_json::json!({"pkey": "1000"})
        );
    }
}
