//! Terminal and JSON rendering of snapshots and fit results
//!
//! Every renderer returns a `String`; the binary decides where it goes.

mod json;
mod text;

pub use json::*;
pub use text::*;
