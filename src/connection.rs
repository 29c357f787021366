use anyhow::Result;
use log::debug;
use postgres::row::Row;
use postgres::types::ToSql;
use postgres::{Client, NoTls, Transaction};

use crate::config::Connection;
use crate::error::Error;
use crate::grant::{execute_statements, Statement};

// TODO: support TLS connections

/// Minimal statement-execution handle for the mutating operations.
/// Implemented by the live connection and by transactions, and by recording
/// mocks in tests, so every mutation can be verified without a database.
pub trait SqlRunner {
    /// Execute one statement, returning the number of rows affected.
    fn run(&mut self, sql: &str) -> Result<u64>;
}

pub struct DbConnection {
    connection_info: String,
    client: Client,
}

impl DbConnection {
    /// Connect to the database described by the connection config.
    pub fn new(connection: &Connection) -> Result<Self, Error> {
        let url = connection.url.clone();
        let client = Client::connect(&url, NoTls).map_err(|cause| Error::Connection {
            url: url.clone(),
            cause,
        })?;

        debug!("Connected to database: {}", url);

        Ok(Self {
            connection_info: url,
            client,
        })
    }

    /// Returns the connection url
    pub fn connection_info(&self) -> &str {
        &self.connection_info
    }

    /// Run a read-only query and return the rows.
    pub fn query(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        debug!("query: {}", sql);
        let rows = self.client.query(sql, params)?;

        Ok(rows)
    }

    /// Execute a statement plan inside one transaction. A failing statement
    /// rolls the whole plan back, so a grant or revoke call is never left
    /// half-applied.
    pub fn apply(&mut self, plan: &[Statement]) -> Result<(), Error> {
        let mut tx = self
            .client
            .transaction()
            .map_err(|e| Error::Statement {
                phase: "begin",
                target: "transaction".to_string(),
                cause: e.into(),
            })?;

        execute_statements(&mut tx, plan)?;

        tx.commit().map_err(|e| Error::Statement {
            phase: "commit",
            target: "transaction".to_string(),
            cause: e.into(),
        })
    }
}

impl SqlRunner for DbConnection {
    fn run(&mut self, sql: &str) -> Result<u64> {
        debug!("execute: {}", sql);
        let nrows = self.client.execute(sql, &[])?;

        Ok(nrows)
    }
}

impl SqlRunner for Transaction<'_> {
    fn run(&mut self, sql: &str) -> Result<u64> {
        debug!("execute: {}", sql);
        let nrows = self.execute(sql, &[])?;

        Ok(nrows)
    }
}
