//! miqctl
//!
//! Resolve, inspect and migrate ManageIQ VM and service metadata.

pub mod config;
pub mod error;
pub mod miq;
pub mod output;
pub mod prompt;
pub mod resource;

pub use error::{MiqError, MiqResult};
