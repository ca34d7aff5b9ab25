//! Dataset domain types and the headerless CSV reader for the canopy pipeline.

mod domain;
mod error;
mod reader;

pub use domain::{ClassLabel, Dataset, DatasetRole};
pub use error::IoError;
pub use reader::DatasetReader;
