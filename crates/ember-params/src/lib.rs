#![warn(missing_docs)]

//! Parameter runtime of the ember toolkit.
//!
//! A [`ParameterCollection`] owns dense [parameters](Parameter) and
//! [lookup tables](LookupParameter), each addressed by a fully qualified name that starts with
//! the collection's namespace.

#[macro_use]
extern crate derive_new;

mod dim;
mod error;

/// Parameters, lookup tables and the collections owning them.
pub mod param;

pub use dim::*;
pub use error::*;
pub use param::{
    LookupParameter, LookupParameterStorage, Parameter, ParameterCollection, ParameterStorage,
    Storage,
};
