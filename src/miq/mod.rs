//! ManageIQ API interaction module
//!
//! This module provides the core functionality for talking to the ManageIQ REST
//! API: credentials, the HTTP transport and the client that ties them together.
//!
//! # Module Structure
//!
//! - [`auth`] - Basic-auth credentials from flags or the environment
//! - [`client`] - Main client and endpoint configuration
//! - [`http`] - HTTP utilities with timeout and single retry
//!
//! # Example
//!
//! ```ignore
//! use miqctl::miq::{auth::Credentials, client::{MiqClient, MiqConfig}};
//!
//! async fn example() -> miqctl::error::MiqResult<()> {
//!     let config = MiqConfig::new("https://manageiq.local/api")?;
//!     let client = MiqClient::new(config, Credentials::resolve(None, None)?)?;
//!     let vms = client.get(&client.collection_url("vms")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
