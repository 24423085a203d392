// SPDX-License-Identifier: MIT

//! Worker roster
//!
//! This module provides:
//! - `RosterStore` - owns the worker list and keeps it in sync with storage
//! - `Session` / `AddForm` - selection and draft state for the screens
//! - `storage` - the key-value persistence adapter and its backends
//! - `collab` - image picker and confirmation dialog contracts

pub mod collab;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod storage;
pub mod store;

pub use config::RosterConfig;
pub use error::{FieldError, PersistenceError, RosterError};
pub use model::{Field, WorkerId, WorkerPatch, WorkerRecord, WorkerRecordInput};
pub use session::{AddForm, Selection, Session};
pub use store::{RosterEvent, RosterStore};
