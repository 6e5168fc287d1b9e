//! Raw request handlers: get, post, put, delete, blob, list.

use std::io::Write;

use pbx3_core::Console;

use crate::cli::{BlobArgs, BodyArgs, GetArgs, GlobalOpts, ListArgs, OutputFormat, PathArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn get(
    args: &GetArgs,
    console: &Console,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let pairs = util::parse_query_pairs(&args.query)?;
    let client = console.client();
    let payload = if pairs.is_empty() {
        client.get(&args.path).await?
    } else {
        client.get_with_query(&args.path, &pairs).await?
    };
    output::print_output(&output::render_payload(format, &payload)?, global.quiet);
    Ok(())
}

pub async fn post(
    args: &BodyArgs,
    console: &Console,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let body = util::read_body(args.data.as_deref(), args.from_file.as_deref())?;
    let payload = console.client().post(&args.path, &body).await?;
    output::print_output(&output::render_payload(format, &payload)?, global.quiet);
    Ok(())
}

pub async fn put(
    args: &BodyArgs,
    console: &Console,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let body = util::read_body(args.data.as_deref(), args.from_file.as_deref())?;
    let payload = console.client().put(&args.path, &body).await?;
    output::print_output(&output::render_payload(format, &payload)?, global.quiet);
    Ok(())
}

pub async fn delete(
    args: &PathArgs,
    console: &Console,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let payload = console.client().delete(&args.path).await?;
    output::print_output(&output::render_payload(format, &payload)?, global.quiet);
    Ok(())
}

pub async fn blob(args: &BlobArgs, console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    let bytes = console.client().get_blob(&args.path).await?;
    match args.output_file {
        Some(ref path) => {
            std::fs::write(path, &bytes)?;
            if !global.quiet {
                eprintln!("Saved {} bytes to {}", bytes.len(), path.display());
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub async fn list(
    args: &ListArgs,
    console: &Console,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let rows = console.list(&args.path, args.key.as_deref()).await?;
    output::print_output(&output::render_list(format, &rows)?, global.quiet);
    Ok(())
}
