// SPDX-License-Identifier: MIT

//! Typed error handling for roster-rs
//!
//! `RosterError` is what every store operation returns. Storage failures are
//! kept in their own `PersistenceError` so backends never need to know about
//! roster semantics.

use std::fmt;
use thiserror::Error;

use super::model::{Field, WorkerId};

/// Top-level error type for roster operations
#[derive(Debug, Error)]
pub enum RosterError {
    /// One or more fields failed validation; nothing was changed
    #[error("Validation failed: {}", ValidationList(.0))]
    Validation(Vec<FieldError>),

    /// The referenced worker does not exist; nothing was changed
    #[error("Worker {id} not found")]
    NotFound { id: WorkerId },

    /// Durable storage read or write failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// An operation was issued before `initialize`
    #[error("Roster store has not been initialized")]
    NotInitialized,

    /// `initialize` was called a second time
    #[error("Roster store is already initialized")]
    AlreadyInitialized,

    /// No id above the highest one ever issued is left
    #[error("No worker ids left after {last}")]
    IdsExhausted { last: WorkerId },

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A session transition that the current selection does not allow
    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),
}

/// Errors raised by a key-value backend or by (de)serialization of the roster
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend-specific failure that is neither I/O nor JSON
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A single failing field with a user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// The canonical "X is required." error for a required field
    pub fn required(field: Field) -> Self {
        Self::new(field, format!("{} is required.", field.label()))
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.key(), self.message)
    }
}

struct ValidationList<'a>(&'a [FieldError]);

impl fmt::Display for ValidationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl RosterError {
    /// Create a not found error
    pub fn not_found(id: WorkerId) -> Self {
        Self::NotFound { id }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Fields named by a validation error, empty for every other variant
    pub fn invalid_fields(&self) -> Vec<Field> {
        match self {
            Self::Validation(errors) => errors.iter().map(|e| e.field).collect(),
            _ => vec![],
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl PersistenceError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
