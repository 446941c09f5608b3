pub mod config;
pub mod models;
pub mod query;
pub mod serve;

use dtbridge::OutputFormat;
use serde::Serialize;

/// Print a serializable value in one of the JSON formats
pub(crate) fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let text = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    };
    println!("{}", text);
    Ok(())
}
