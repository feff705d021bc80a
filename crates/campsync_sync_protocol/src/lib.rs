//! # campsync Sync Protocol
//!
//! Inventory data model and remote wire types for campsync.
//!
//! This crate provides:
//! - [`Material`], the inventory item record, and its editable [`Field`]s
//! - [`FieldValue`] and the coercion rules applied to remote records
//! - [`ChangeRecord`], one pending local edit
//! - The spreadsheet endpoint's JSON envelope and batch-update request
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod coerce;
mod error;
mod field;
mod material;
mod messages;

pub use change::{ChangeRecord, RowUpdate};
pub use coerce::{coerce_bool, coerce_number, coerce_text};
pub use error::{ProtocolError, ProtocolResult};
pub use field::{Field, FieldKind, FieldValue};
pub use material::Material;
pub use messages::{
    decode_fetch_response, decode_push_response, BatchUpdateRequest, Envelope,
    BATCH_UPDATE_ACTION, STATUS_ERROR,
};
