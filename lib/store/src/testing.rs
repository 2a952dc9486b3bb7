//! In-memory `Database` that records every statement it is asked to run.

use std::sync::Mutex;

use async_trait::async_trait;
use quire_core::Value;

use crate::StoreResult;
use crate::database::{Database, Dialect, RawRow, Statement};
use crate::error::StoreError;

/// A statement execution as observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub binds: Vec<Value>,
    pub persistent: bool,
}

struct Rule {
    fragment: String,
    binds: Option<Vec<Value>>,
    outcome: Result<Vec<RawRow>, String>,
}

/// Answers statements from canned rules and records every call.
pub struct RecordingDatabase {
    dialect: Dialect,
    rules: Vec<Rule>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingDatabase {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns `rows` for any statement containing `fragment`.
    pub fn respond(mut self, fragment: &str, rows: Vec<RawRow>) -> Self {
        self.rules.push(Rule {
            fragment: fragment.to_string(),
            binds: None,
            outcome: Ok(rows),
        });
        self
    }

    /// Returns `rows` for statements containing `fragment` bound with exactly `binds`.
    pub fn respond_to(mut self, fragment: &str, binds: Vec<Value>, rows: Vec<RawRow>) -> Self {
        self.rules.push(Rule {
            fragment: fragment.to_string(),
            binds: Some(binds),
            outcome: Ok(rows),
        });
        self
    }

    /// Fails any statement containing `fragment`.
    pub fn fail(mut self, fragment: &str, details: &str) -> Self {
        self.rules.push(Rule {
            fragment: fragment.to_string(),
            binds: None,
            outcome: Err(details.to_string()),
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    fn run(&self, statement: &Statement, binds: &[Value]) -> StoreResult<Vec<RawRow>> {
        self.calls.lock().expect("calls lock").push(Call {
            sql: statement.sql().to_string(),
            binds: binds.to_vec(),
            persistent: statement.is_persistent(),
        });

        let rule = self.rules.iter().find(|rule| {
            statement.sql().contains(&rule.fragment)
                && rule.binds.as_deref().is_none_or(|expected| expected == binds)
        });
        match rule.map(|r| &r.outcome) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(details)) => Err(StoreError::query(statement.sql(), details).into()),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn fetch_optional(
        &self,
        statement: &Statement,
        binds: &[Value],
    ) -> StoreResult<Option<RawRow>> {
        Ok(self.run(statement, binds)?.into_iter().next())
    }

    async fn fetch_all(&self, statement: &Statement, binds: &[Value]) -> StoreResult<Vec<RawRow>> {
        self.run(statement, binds)
    }
}

/// Builds a raw row from column/value pairs.
pub fn row(pairs: &[(&str, Value)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}
