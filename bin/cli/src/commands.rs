//! Command execution and output formatting.

use std::fmt;
use std::process::ExitCode;

use quire_core::Value;
use quire_store::{AuthStore, Row, SessionToken, SqlxDatabase, Store, StoreError};
use rootcause::Report;
use tracing::{debug, info};

use crate::cli::Commands;
use crate::config::CliConfig;

/// Exit status when no user matched.
const NO_USER: u8 = 1;

/// Errors surfaced by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config(config::ConfigError),
    /// A store operation failed.
    Store(Report<StoreError>),
    /// The thaw argument is not base64.
    InvalidToken,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "failed to load configuration: {e}"),
            Self::Store(report) => write!(f, "{report}"),
            Self::InvalidToken => write!(f, "session token is not valid base64"),
        }
    }
}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<Report<StoreError>> for CliError {
    fn from(report: Report<StoreError>) -> Self {
        Self::Store(report)
    }
}

/// Connects to the configured database and runs `command`.
///
/// # Errors
///
/// Returns an error if configuration, connection or the store operation
/// fails. "No user" is reported through the exit code, not as an error.
pub async fn run(config: CliConfig, command: Commands) -> Result<ExitCode, CliError> {
    let store = Store::new(config.store)?;
    let db = SqlxDatabase::connect(&config.database).await?;
    info!(table = store.config().user_table(), "store ready");

    match command {
        Commands::Find(args) => {
            let user = store.find_user(&args.lookup_fields(), &db).await?;
            Ok(print_user(user.as_ref().map(|u| u.row())))
        }
        Commands::Roles(args) => {
            let roles = store.find_user_roles(&args.lookup_fields(), &db).await?;
            debug!(count = roles.len(), "resolved roles");
            for role in roles {
                println!("{role}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Freeze(args) => {
            let Some(user) = store.find_user(&args.lookup_fields(), &db).await? else {
                return Ok(print_user(None));
            };
            let token = store.for_session(&db, &user)?;
            println!("{}", token.to_base64());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Thaw(args) => {
            let token = SessionToken::from_base64(&args.token).ok_or(CliError::InvalidToken)?;
            let user = store.from_session(&db, token.as_bytes()).await?;
            Ok(print_user(user.as_ref().map(|u| u.row())))
        }
    }
}

fn print_user(row: Option<&Row>) -> ExitCode {
    match row {
        Some(row) => {
            println!("{}", row_json(row));
            ExitCode::SUCCESS
        }
        None => {
            println!("no user");
            ExitCode::from(NO_USER)
        }
    }
}

/// Renders a row as a plain JSON object.
fn row_json(row: &Row) -> serde_json::Value {
    row.iter()
        .map(|(column, value)| (column.to_string(), plain(value)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn plain(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => (*b).into(),
        Value::Integer(i) => (*i).into(),
        Value::Real(f) => serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, Into::into),
        Value::Text(s) => s.as_str().into(),
    }
}
