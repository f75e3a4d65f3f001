//! Core domain logic for the depot geography hierarchy.
//! This crate is the single source of truth for Country/Province/Locality
//! resolution rules.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use error::{is_app_error, AppError, AppResult, ErrorBody, ErrorKind};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::geography::{
    Country, Locality, NewLocality, Province, RequestGeography, ResponseGeography,
};
pub use repo::geography_repo::{
    GeographyRepository, RepoError, RepoResult, SqliteGeographyRepository,
};
pub use service::geography_service::GeographyService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
