//! trulearn-client: service backends for TruLearn.
//!
//! Implements the `QuestionSource`, `DetectionService` and `ReferenceStore`
//! traits against the TruLearn HTTP API, plus a deterministic mock backend
//! for offline use.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{
    create_backend, load_config, load_config_from, Backend, ServiceConfig, TrulearnConfig,
};
pub use trulearn_core::error::ServiceError;
