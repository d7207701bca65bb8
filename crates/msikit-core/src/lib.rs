//! # msikit-core
//!
//! Core library for the msikit authoring engine providing:
//! - The transactional key-ordered table store over the installer schema
//! - Typed row structs for every builtin table
//! - The summary information property set
//! - Shared error types

pub mod error;
pub mod schema;
pub mod store;
pub mod summary;
pub mod tables;
pub mod value;

pub use error::{Error, Result};
pub use store::{OpenMode, Package};
pub use summary::{SummaryInformation, SummaryPid, SummaryValue};
pub use value::{Row, TableRow, Value};
