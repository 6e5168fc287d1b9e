// Field-level error extraction.
//
// Validation failures come back as a JSON object mapping field names to
// lists of messages, e.g. `{"pkey": ["Must be 3-5 digits"]}`. These helpers
// pull them out of a transport failure for display next to form fields.

use std::collections::BTreeMap;

use pbx3_api::{Error, StatusCode};
use serde_json::Value;

/// Field name → messages, from the failure's parsed body.
///
/// Only fields whose value is a non-empty list of strings are kept. Returns
/// `None` when the error carries no such field.
pub fn field_errors(err: &Error) -> Option<BTreeMap<String, Vec<String>>> {
    let Value::Object(body) = err.failure()?.parsed_body.as_ref()? else {
        return None;
    };

    let errors: BTreeMap<String, Vec<String>> = body
        .iter()
        .filter_map(|(field, value)| {
            let Value::Array(items) = value else {
                return None;
            };
            let messages: Vec<String> = items
                .iter()
                .filter_map(|m| m.as_str().map(str::to_owned))
                .collect();
            (!messages.is_empty()).then(|| (field.clone(), messages))
        })
        .collect();

    (!errors.is_empty()).then_some(errors)
}

/// One line suitable for a toast or status bar.
///
/// A 404 uses the server's `message`/`Error` text, then the failure message.
/// Other failures prefer the first field error, then the server's
/// `message`/`Error` text, then the error's own message. `fallback` is used
/// only when all of those are empty.
pub fn first_error_message(err: &Error, fallback: &str) -> String {
    let failure = err.failure();

    if failure.is_some_and(|f| f.status == StatusCode::NOT_FOUND) {
        return server_message(err)
            .or_else(|| failure.map(|f| f.message.clone()))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Not found".to_owned());
    }

    if let Some(first) = field_errors(err).and_then(|errors| errors.into_values().flatten().next())
    {
        return first;
    }

    server_message(err)
        .or_else(|| Some(err.to_string()))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

fn server_message(err: &Error) -> Option<String> {
    let body = err.failure()?.parsed_body.as_ref()?;
    ["message", "Error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_owned)
}
