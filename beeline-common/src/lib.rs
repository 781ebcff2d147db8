//! # BeeLine Common Library
//!
//! Shared code for the BeeLine service and client tools:
//! - Database schema, initialization and row models
//! - Configuration loading and root folder resolution
//! - Plant name normalization
//! - Static species lookup table and the pollinator resolver

pub mod config;
pub mod db;
pub mod error;
pub mod names;
pub mod resolver;
pub mod species;

pub use error::{Error, Result};
pub use resolver::{resolve, MatchKind, Resolution};
pub use species::{SpeciesEntry, SpeciesTable};
