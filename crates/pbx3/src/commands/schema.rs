//! Schema inspection.

use std::collections::{BTreeMap, BTreeSet};

use tabled::Tabled;

use pbx3_core::{Console, FieldMutability, ResourceSchema, SCHEMAS_PATH, SchemaMap};

use crate::cli::{GlobalOpts, OutputFormat, SchemaArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Read-only")]
    read_only: usize,
    #[tabled(rename = "Updateable")]
    updateable: usize,
    #[tabled(rename = "Defaults")]
    defaults: usize,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Access")]
    access: &'static str,
    #[tabled(rename = "Default")]
    default: String,
}

pub async fn handle(
    args: &SchemaArgs,
    console: &Console,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let schemas = console.schemas().ensure_loaded().await?;

    let rendered = match args.resource.as_deref() {
        None => render_overview(&schemas, format)?,
        Some(resource) => {
            let schema = schemas.get(resource).ok_or_else(|| CliError::NotFound {
                path: SCHEMAS_PATH.into(),
                message: format!("No schema for resource '{resource}'"),
            })?;
            let color = output::should_color(global.color);
            render_resource(resource, schema, format, color)?
        }
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn render_overview(schemas: &SchemaMap, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<ResourceRow> = schemas
                .resource_names()
                .into_iter()
                .filter_map(|name| {
                    let schema = schemas.get(name)?;
                    Some(ResourceRow {
                        resource: name.to_owned(),
                        read_only: schema.read_only.len(),
                        updateable: schema.updateable.len(),
                        defaults: schema.defaults.len(),
                    })
                })
                .collect();
            Ok(output::render_table(&rows))
        }
        OutputFormat::Plain => Ok(schemas.resource_names().join("\n")),
        structured => {
            let all: BTreeMap<&str, &ResourceSchema> =
                schemas.iter().map(|(name, schema)| (name, schema.as_ref())).collect();
            output::render_value(structured, &serde_json::to_value(all)?)
        }
    }
}

fn render_resource(
    resource: &str,
    schema: &ResourceSchema,
    format: OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    let fields: BTreeSet<&str> = schema
        .read_only
        .iter()
        .chain(&schema.updateable)
        .chain(schema.defaults.keys())
        .map(String::as_str)
        .collect();

    match format {
        OutputFormat::Table => {
            let rows: Vec<FieldRow> = fields
                .iter()
                .map(|field| FieldRow {
                    field: (*field).to_owned(),
                    access: access_label(schema.mutability(field)),
                    default: schema.default_text(field).unwrap_or_default(),
                })
                .collect();
            let title = output::heading(&format!("{resource} ({} fields)", rows.len()), color);
            Ok(format!("{title}\n{}", output::render_table(&rows)))
        }
        OutputFormat::Plain => Ok(fields
            .iter()
            .map(|field| format!("{field}\t{}", access_label(schema.mutability(field))))
            .collect::<Vec<_>>()
            .join("\n")),
        structured => output::render_value(structured, &serde_json::to_value(schema)?),
    }
}

fn access_label(mutability: FieldMutability) -> &'static str {
    match mutability {
        FieldMutability::ReadOnly => "read-only",
        FieldMutability::Updateable => "updateable",
        FieldMutability::Unlisted => "-",
    }
}
