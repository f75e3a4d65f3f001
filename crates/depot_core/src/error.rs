//! Application error taxonomy shared by services and outer surfaces.
//!
//! # Responsibility
//! - Classify failures into a closed set of kinds with an HTTP status each.
//! - Provide the kind predicate used as a control-flow discriminator by
//!   find-or-create and strict-create flows.
//!
//! # Invariants
//! - Kind-to-status mapping is fixed at compile time; there is no mutable
//!   registry of error definitions.
//! - Wrapping a lower-level error keeps it reachable through `source()`.

use crate::repo::geography_repo::RepoError;
use http::StatusCode;
use serde::Serialize;
use std::error::Error as StdError;

pub type AppResult<T> = Result<T, AppError>;

/// Closed set of application error classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    UnprocessableEntity,
    Internal,
}

impl ErrorKind {
    /// HTTP status an outer surface should answer with.
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::UnprocessableEntity => "unprocessable_entity",
            Self::Internal => "internal",
        }
    }
}

/// Typed application error with kind, message and optional detail.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attaches structured detail shown to callers next to the message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Keeps the originating error reachable through `source()`.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Returns whether this error is classified as `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Builds the serializable response envelope for this error.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status().as_u16(),
            code: self.kind.code(),
            message: self.message.clone(),
            detail: self.detail.clone(),
        }
    }
}

/// Free-function form of [`AppError::is`], convenient in `matches!`-style
/// guards over `Result` values.
pub fn is_app_error(err: &AppError, kind: ErrorKind) -> bool {
    err.is(kind)
}

/// Serializable error envelope for outer surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<RepoError> for AppError {
    fn from(value: RepoError) -> Self {
        match &value {
            RepoError::NotFound { entity, key } => {
                Self::not_found(format!("{entity} not found")).with_detail(key.clone())
            }
            RepoError::InvalidData(message) => {
                let message = message.clone();
                Self::internal("invalid persisted geography data")
                    .with_detail(message)
                    .with_source(value)
            }
            RepoError::Db(err) if err.is_constraint_violation() => {
                let detail = err.to_string();
                Self::conflict("integrity constraint violated")
                    .with_detail(detail)
                    .with_source(value)
            }
            RepoError::Db(err) => {
                let detail = err.to_string();
                Self::internal("storage failure")
                    .with_detail(detail)
                    .with_source(value)
            }
        }
    }
}
