//! Statement execution capability shared by connections and transactions.
//!
//! Repository code is written once against `Executor` and runs unchanged
//! inside or outside a transaction.

use rusqlite::{Connection, Params, Row, Transaction};

/// Minimal capability for parametrized execution and single-row queries.
pub trait Executor {
    /// Executes one statement and returns the number of changed rows.
    fn exec_context<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<usize>;

    /// Runs a query expected to yield one row and maps it with `map`.
    ///
    /// Returns `rusqlite::Error::QueryReturnedNoRows` when the query is empty.
    fn query_row_context<T, P, F>(&self, sql: &str, params: P, map: F) -> rusqlite::Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>;
}

impl Executor for Connection {
    fn exec_context<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<usize> {
        self.prepare_cached(sql)?.execute(params)
    }

    fn query_row_context<T, P, F>(&self, sql: &str, params: P, map: F) -> rusqlite::Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.prepare_cached(sql)?;
        stmt.query_row(params, map)
    }
}

impl Executor for Transaction<'_> {
    fn exec_context<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<usize> {
        let conn: &Connection = self;
        conn.exec_context(sql, params)
    }

    fn query_row_context<T, P, F>(&self, sql: &str, params: P, map: F) -> rusqlite::Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn: &Connection = self;
        conn.query_row_context(sql, params, map)
    }
}
