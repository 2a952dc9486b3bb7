//! CLI argument definitions for the quire binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quire_core::{LookupFields, Value};

/// Inspect a quire user store from the command line
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(about = "Resolve users, roles and session tokens from a quire store")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file, layered under QUIRE__* environment variables
    #[arg(short, long, env = "QUIRE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up a user and print the matched row
    Find(LookupArgs),
    /// Print a user's role names, one per line
    Roles(LookupArgs),
    /// Look up a user and print its session token
    Freeze(LookupArgs),
    /// Restore a user from a session token and print the row
    Thaw(ThawArgs),
}

/// Lookup constraints shared by the user commands
#[derive(clap::Args, Debug)]
pub struct LookupArgs {
    /// Equality constraint as column=value; repeat for more columns.
    /// Append :text, :int, :real or :bool to the column to skip type inference
    #[arg(short, long = "field", value_name = "COLUMN[:TYPE]=VALUE", value_parser = parse_field, required = true)]
    pub fields: Vec<(String, Value)>,
}

impl LookupArgs {
    /// Collects the constraints; a repeated column keeps its last value.
    pub fn lookup_fields(&self) -> LookupFields {
        self.fields.iter().cloned().collect()
    }
}

/// Arguments for the thaw command
#[derive(clap::Args, Debug)]
pub struct ThawArgs {
    /// Base64 session token as printed by `freeze`
    pub token: String,
}

fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{raw}'"))?;
    let (column, kind) = match column.split_once(':') {
        Some((column, kind)) => (column.trim(), Some(kind.trim())),
        None => (column.trim(), None),
    };
    if column.is_empty() {
        return Err(format!("missing column name in '{raw}'"));
    }
    let value = match kind {
        None => Value::infer(value),
        Some(kind) => parse_typed(kind, value)?,
    };
    Ok((column.to_string(), value))
}

fn parse_typed(kind: &str, value: &str) -> Result<Value, String> {
    match kind {
        "text" => Ok(Value::from(value)),
        "int" => value
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| format!("'{value}' is not an int: {e}")),
        "real" => value
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|e| format!("'{value}' is not a real: {e}")),
        "bool" => value
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|e| format!("'{value}' is not a bool: {e}")),
        other => Err(format!("unknown type '{other}', expected text, int, real or bool")),
    }
}
