//! Common utilities for the butterfly-ch workspace

pub mod error;

pub use error::{suggest_correction, Error, Result};
