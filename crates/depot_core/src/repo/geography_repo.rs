//! Geography repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Translate Country/Province/Locality create and find operations to SQL.
//! - Delegate transaction lifecycle to rusqlite without extra bookkeeping.
//!
//! # Invariants
//! - Data operations run on the caller-supplied `Executor`, never on a
//!   handle held by the repository, so the caller decides transactionality.
//! - Find operations report absence as `RepoError::NotFound`.
//! - Create operations surface store errors unchanged.

use crate::db::migrations::latest_version;
use crate::db::{DbError, Executor};
use crate::model::geography::{
    name_key, Country, CountryId, Locality, Province, ProvinceId, ResponseGeography,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid geography data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract for the geographic hierarchy.
pub trait GeographyRepository {
    /// Opens a write transaction.
    fn begin_tx(&self) -> RepoResult<Transaction<'_>>;
    fn commit_tx(&self, tx: Transaction<'_>) -> RepoResult<()>;
    fn rollback_tx(&self, tx: Transaction<'_>) -> RepoResult<()>;

    /// Inserts a country and returns it with its assigned id.
    fn create_country<E: Executor>(&self, exec: &E, name: &str) -> RepoResult<Country>;
    /// Finds a country by case-insensitive exact name.
    fn find_country_by_name<E: Executor>(&self, exec: &E, name: &str) -> RepoResult<Country>;
    /// Inserts a province under `country_id`.
    fn create_province<E: Executor>(
        &self,
        exec: &E,
        name: &str,
        country_id: CountryId,
    ) -> RepoResult<Province>;
    /// Finds a province by case-insensitive name within one country.
    fn find_province_by_name<E: Executor>(
        &self,
        exec: &E,
        name: &str,
        country_id: CountryId,
    ) -> RepoResult<Province>;
    /// Inserts a locality under its caller-supplied id.
    fn create_locality<E: Executor>(&self, exec: &E, locality: &Locality) -> RepoResult<Locality>;
    fn find_locality_by_id<E: Executor>(&self, exec: &E, id: &str) -> RepoResult<Locality>;
    /// Loads the flattened hierarchy of one locality.
    fn find_geography_by_locality_id<E: Executor>(
        &self,
        exec: &E,
        id: &str,
    ) -> RepoResult<ResponseGeography>;

    /// Plain handle for reads that need no transaction.
    fn connection(&self) -> &Connection;
}

/// SQLite-backed geography repository.
pub struct SqliteGeographyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGeographyRepository<'conn> {
    /// Creates a repository from a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the schema version or tables do not match.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_geography_schema(conn)?;
        Ok(Self { conn })
    }
}

impl GeographyRepository for SqliteGeographyRepository<'_> {
    fn begin_tx(&self) -> RepoResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn commit_tx(&self, tx: Transaction<'_>) -> RepoResult<()> {
        Ok(tx.commit()?)
    }

    fn rollback_tx(&self, tx: Transaction<'_>) -> RepoResult<()> {
        Ok(tx.rollback()?)
    }

    fn create_country<E: Executor>(&self, exec: &E, name: &str) -> RepoResult<Country> {
        let id = exec.query_row_context(
            "INSERT INTO countries (country_name, name_key)
             VALUES (?1, ?2)
             RETURNING id;",
            params![name, name_key(name)],
            |row| row.get(0),
        )?;
        Ok(Country {
            id,
            name: name.to_string(),
        })
    }

    fn find_country_by_name<E: Executor>(&self, exec: &E, name: &str) -> RepoResult<Country> {
        exec.query_row_context(
            "SELECT id, country_name
             FROM countries
             WHERE name_key = ?1;",
            [name_key(name)],
            |row| {
                Ok(Country {
                    id: row.get("id")?,
                    name: row.get("country_name")?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| not_found("country", name))
    }

    fn create_province<E: Executor>(
        &self,
        exec: &E,
        name: &str,
        country_id: CountryId,
    ) -> RepoResult<Province> {
        let id = exec.query_row_context(
            "INSERT INTO provinces (province_name, name_key, country_id)
             VALUES (?1, ?2, ?3)
             RETURNING id;",
            params![name, name_key(name), country_id],
            |row| row.get(0),
        )?;
        Ok(Province {
            id,
            name: name.to_string(),
            country_id,
        })
    }

    fn find_province_by_name<E: Executor>(
        &self,
        exec: &E,
        name: &str,
        country_id: CountryId,
    ) -> RepoResult<Province> {
        exec.query_row_context(
            "SELECT id, province_name, country_id
             FROM provinces
             WHERE country_id = ?1
               AND name_key = ?2;",
            params![country_id, name_key(name)],
            parse_province_row,
        )
        .optional()?
        .ok_or_else(|| not_found("province", format!("{name} (country {country_id})")))
    }

    fn create_locality<E: Executor>(&self, exec: &E, locality: &Locality) -> RepoResult<Locality> {
        exec.exec_context(
            "INSERT INTO localities (id, locality_name, province_id)
             VALUES (?1, ?2, ?3);",
            params![
                locality.id.as_str(),
                locality.name.as_str(),
                locality.province_id
            ],
        )?;
        Ok(locality.clone())
    }

    fn find_locality_by_id<E: Executor>(&self, exec: &E, id: &str) -> RepoResult<Locality> {
        exec.query_row_context(
            "SELECT id, locality_name, province_id
             FROM localities
             WHERE id = ?1;",
            [id],
            parse_locality_row,
        )
        .optional()?
        .ok_or_else(|| not_found("locality", id))
    }

    fn find_geography_by_locality_id<E: Executor>(
        &self,
        exec: &E,
        id: &str,
    ) -> RepoResult<ResponseGeography> {
        exec.query_row_context(
            "SELECT
                l.id AS locality_id,
                l.locality_name AS locality_name,
                p.province_name AS province_name,
                c.country_name AS country_name
             FROM localities l
             INNER JOIN provinces p ON p.id = l.province_id
             INNER JOIN countries c ON c.id = p.country_id
             WHERE l.id = ?1;",
            [id],
            |row| {
                Ok(ResponseGeography {
                    locality_id: row.get("locality_id")?,
                    locality_name: row.get("locality_name")?,
                    province_name: row.get("province_name")?,
                    country_name: row.get("country_name")?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| not_found("locality", id))
    }

    fn connection(&self) -> &Connection {
        self.conn
    }
}

fn not_found(entity: &'static str, key: impl Into<String>) -> RepoError {
    RepoError::NotFound {
        entity,
        key: key.into(),
    }
}

fn parse_province_row(row: &Row<'_>) -> rusqlite::Result<Province> {
    Ok(Province {
        id: row.get::<_, ProvinceId>("id")?,
        name: row.get("province_name")?,
        country_id: row.get("country_id")?,
    })
}

fn parse_locality_row(row: &Row<'_>) -> rusqlite::Result<Locality> {
    Ok(Locality {
        id: row.get("id")?,
        name: row.get("locality_name")?,
        province_id: row.get("province_id")?,
    })
}

fn ensure_geography_schema(conn: &Connection) -> RepoResult<()> {
    let expected = latest_version();
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual != expected {
        return Err(RepoError::InvalidData(format!(
            "geography repository requires schema version {expected}, got {actual}"
        )));
    }

    for table in ["countries", "provinces", "localities"] {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::InvalidData(format!(
                "geography repository requires table `{table}`"
            )));
        }
    }

    Ok(())
}
