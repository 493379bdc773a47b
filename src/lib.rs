//! recordkit - mapping, projection and keyed set difference for records
//!
//! Copy fields between differently shaped records, project records into
//! typed tables, and split one collection against another by key.

pub mod config;
pub mod convert;
pub mod diff;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;

pub use config::Config;
pub use convert::{Mapper, Projector};
pub use diff::{InsertUpdate, KeyComparer, SetDiff};
pub use error::{ConversionError, Error, Result};
pub use model::{DynamicRecord, Record, Table, Value};
