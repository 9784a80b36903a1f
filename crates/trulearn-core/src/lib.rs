//! trulearn-core: Data model, answer aggregation, and assessment session.
//!
//! This crate defines the question/answer model, the traits through which the
//! remote question and detection services are consumed, and the pure analysis
//! functions that turn an attempt into a verdict and a per-concept
//! difficulty map.

pub mod analysis;
pub mod error;
pub mod model;
pub mod parser;
pub mod practice;
pub mod report;
pub mod session;
pub mod traits;
