//! Uniform repository error convention.
//!
//! # Responsibility
//! - Define the three request-level failure kinds shared by every repository.
//! - Convert SQLite failures into those kinds at the repository boundary.
//!
//! # Invariants
//! - Every repository operation returns `RepoResult<T>`; store errors never
//!   escape unmapped.
//! - Messages are fixed per entity and kind; callers branch on `kind()`,
//!   never on message text or store payloads.
//! - Store faults keep the underlying SQLite error as `source()` for logs.

use crate::db::StoreFault;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Failure class of one repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The requested id or alias does not resolve to a record.
    NotFound,
    /// A uniqueness or quantity constraint would be violated.
    Conflict,
    /// Any other store-level fault.
    ServerError,
}

impl ErrorKind {
    /// Transport status callers should answer with.
    pub fn status(self) -> u16 {
        match self {
            Self::NotFound | Self::Conflict => 400,
            Self::ServerError => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::ServerError => "server_error",
        }
    }
}

/// Serializable `{message, status}` pair handed to transport layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
}

/// Request-level repository error.
#[derive(Debug)]
pub struct RepoError {
    kind: ErrorKind,
    message: &'static str,
    source: Option<rusqlite::Error>,
}

impl RepoError {
    pub fn not_found(message: &'static str) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message,
            source: None,
        }
    }

    pub fn conflict(message: &'static str) -> Self {
        Self {
            kind: ErrorKind::Conflict,
            message,
            source: None,
        }
    }

    pub fn server_error(message: &'static str, source: rusqlite::Error) -> Self {
        Self {
            kind: ErrorKind::ServerError,
            message,
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }

    /// Returns the transport-facing body; store details are not included.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            message: self.message.to_string(),
            status: self.status(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{} ({source})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|err| err as &(dyn Error + 'static))
    }
}

impl From<RepoError> for ErrorBody {
    fn from(value: RepoError) -> Self {
        value.body()
    }
}

/// Fixed messages and log labels for one entity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntityErrors {
    pub entity: &'static str,
    pub not_found: &'static str,
    pub conflict: &'static str,
    pub server_error: &'static str,
}

pub(crate) const ITEM_ERRORS: EntityErrors = EntityErrors {
    entity: "item",
    not_found: "Item not found",
    conflict: "Item already exists",
    server_error: "Server Error",
};

pub(crate) const COUPON_ERRORS: EntityErrors = EntityErrors {
    entity: "coupon",
    not_found: "Coupon not found",
    conflict: "Coupon code already exists",
    server_error: "Internal Server Error",
};

pub(crate) const CART_ERRORS: EntityErrors = EntityErrors {
    entity: "cart",
    not_found: "Cart not found",
    conflict: "Cart already exists",
    server_error: "Internal Server Error",
};

impl EntityErrors {
    pub(crate) fn not_found(&self, op: &'static str) -> RepoError {
        self.not_found_with(op, self.not_found)
    }

    /// `NotFound` for a related record (a referenced coupon, a cart line).
    pub(crate) fn not_found_with(&self, op: &'static str, message: &'static str) -> RepoError {
        debug!(
            "event=repo_op module=repo entity={} op={} status=not_found message={}",
            self.entity, op, message
        );
        RepoError::not_found(message)
    }

    pub(crate) fn conflict_with(&self, op: &'static str, message: &'static str) -> RepoError {
        debug!(
            "event=repo_op module=repo entity={} op={} status=conflict message={}",
            self.entity, op, message
        );
        RepoError::conflict(message)
    }

    /// Maps a store error: unique violations become `Conflict`, everything
    /// else becomes `ServerError`.
    pub(crate) fn fault(&self, op: &'static str, err: rusqlite::Error) -> RepoError {
        match StoreFault::classify(&err) {
            StoreFault::UniqueViolation => self.conflict_with(op, self.conflict),
            fault => self.server(op, fault, err),
        }
    }

    pub(crate) fn server(
        &self,
        op: &'static str,
        fault: StoreFault,
        err: rusqlite::Error,
    ) -> RepoError {
        warn!(
            "event=store_fault module=repo entity={} op={} error_code={} error={}",
            self.entity,
            op,
            fault.as_code(),
            err
        );
        RepoError::server_error(self.server_error, err)
    }
}
