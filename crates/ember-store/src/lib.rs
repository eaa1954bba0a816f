#![warn(missing_docs)]

//! # Ember Store
//!
//! Persistence of [parameter collections](ember_params::ParameterCollection) into a pair of
//! plain text files:
//!
//! - a **data file** holding framed records, appended back to back;
//! - a **metadata file** indexing every saved entity by key, with the byte offset of its
//!   block in the data file and, for whole collections, the offset of every nested record.
//!
//! ## Data File Layout
//!
//! ```text
//! #                      <- start of a block (the offset stored in the index)
//! #Parameter#
//! /model/w               <- nested offset of `/model/w`
//! {3,4}
//! 0.1 0.2 ...            <- values
//! 0 0 ...                <- gradients
//! #LookupParameter#
//! /model/emb             <- nested offset of `/model/emb`
//! {8,100}                <- dimension of the whole table
//! {8}                    <- dimension of a row
//! ...                    <- values
//! ...                    <- gradients
//! #                      <- start of the next block
//! ```
//!
//! ## Metadata File Layout
//!
//! One line per save, never rewritten:
//!
//! ```text
//! /model/:0|/model/w:14|/model/emb:97
//! /model/emb:2048
//! ```
//!
//! The [`Packer`] ties both files together.

#[macro_use]
extern crate derive_new;

/// Text rendering of dimensions and value arrays.
pub mod codec;
/// Offset index stored in the metadata file.
pub mod index;
/// Framed records of the data file.
pub mod record;

mod config;
mod error;
mod packer;

pub use config::*;
pub use error::*;
pub use index::{IndexEntry, IndexFile};
pub use packer::*;
pub use record::{Record, RecordKind};

#[cfg(test)]
mod tests;
