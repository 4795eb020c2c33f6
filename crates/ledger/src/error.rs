//! The module contains the errors the ledger can return.
//!
//! Every operation reports exactly one of these; a failed operation never
//! leaves partial state behind.
//!
//! - [`NotFound`] a wallet, user, item or listing does not exist.
//! - [`InsufficientFunds`] a debit would take a balance below zero.
//! - [`Storage`] and [`Database`] the persistence layer failed.
//!
//!  [`NotFound`]: LedgerError::NotFound
//!  [`InsufficientFunds`]: LedgerError::InsufficientFunds
//!  [`Storage`]: LedgerError::Storage
//!  [`Database`]: LedgerError::Database
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Wallet already exists for user \"{0}\"")]
    DuplicateOwner(String),
    #[error("Username \"{0}\" already taken")]
    DuplicateUsername(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Credential hashing failed: {0}")]
    Credential(String),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl LedgerError {
    /// Returns `true` for failures of the persistence layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Database(_))
    }

    /// Classify a failed write.
    ///
    /// Unique violations become `on_unique`, foreign-key violations become
    /// `NotFound(subject)`, anything else stays a database error.
    pub(crate) fn from_write(err: DbErr, subject: &str, on_unique: LedgerError) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => on_unique,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => Self::NotFound(subject.to_string()),
            _ => Self::Database(err),
        }
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::DuplicateOwner(a), Self::DuplicateOwner(b)) => a == b,
            (Self::DuplicateUsername(a), Self::DuplicateUsername(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::Credential(a), Self::Credential(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
