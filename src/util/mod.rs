//! Utility types and functions shared across the pipeline.
//!
//! This module contains fundamental types used throughout the library:
//! - [`StorageType`], [`AttributeOwner`], [`GroupType`], [`AttributeValues`] - attribute vocabulary
//! - [`Transform`] / [`TransformRecord`] - engine and host transform conventions
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam

mod error;
mod math;
mod storage;

pub use error::*;
pub use math::*;
pub use storage::*;
