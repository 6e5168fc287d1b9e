//! Command handlers, one module per command group.

pub mod config_cmd;
pub mod request;
pub mod schema;
pub mod session;
pub mod util;

use pbx3_core::Console;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::Context;
use crate::error::CliError;

/// Route a networked command to its handler.
pub async fn dispatch(
    cmd: Command,
    console: &Console,
    ctx: &Context,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => session::login(&args, console, ctx, global, format).await,
        Command::Whoami => session::whoami(console, global, format).await,
        Command::Get(args) => request::get(&args, console, global, format).await,
        Command::Post(args) => request::post(&args, console, global, format).await,
        Command::Put(args) => request::put(&args, console, global, format).await,
        Command::Delete(args) => request::delete(&args, console, global, format).await,
        Command::Blob(args) => request::blob(&args, console, global).await,
        Command::List(args) => request::list(&args, console, global, format).await,
        Command::Schema(args) => schema::handle(&args, console, global, format).await,
        // Handled in main without a connection.
        Command::Logout | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
