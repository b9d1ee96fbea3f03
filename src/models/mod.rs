//! Model records, use-case classification, and the model database

mod database;
mod record;
mod usecase;

pub use database::*;
pub use record::*;
pub use usecase::*;
