//! One-shot subcommands.

pub(crate) mod prices;
pub(crate) mod records;
pub(crate) mod seed;
pub(crate) mod trace;

use std::error::Error;
use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;

use crate::OutputFormat;

pub(crate) type CmdResult = Result<(), Box<dyn Error>>;

/// Global options shared by every subcommand.
pub(crate) struct Context {
    pub(crate) data: Option<PathBuf>,
    pub(crate) prices: Option<PathBuf>,
    pub(crate) output: OutputFormat,
    pub(crate) quiet: bool,
}

/// Run an async command on a fresh multi-threaded runtime.
pub(crate) fn block_on<F>(command: F) -> CmdResult
where
    F: Future<Output = CmdResult>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(command)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
