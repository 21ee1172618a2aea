//! Resource layer
//!
//! Everything above the raw HTTP client: finding resources by name and the
//! operations run on them once found.
//!
//! # Architecture
//!
//! - [`model`] - Query, candidate and resolution types
//! - [`fetcher`] - Collection queries with filters and pagination
//! - [`resolver`] - Cascading name resolution for VMs and services
//! - [`tags`] - Typed tag map and the tag catalog
//! - [`inspect`] - Single-resource reads and edits
//! - [`quota`] - Tenant quota reads and updates
//! - [`migrate`] - Archived-to-live VM metadata migration
//!
//! # Example
//!
//! ```ignore
//! use miqctl::resource::{PowerState, ResourceQuery, Resolver};
//!
//! async fn find(client: &miqctl::miq::client::MiqClient) -> miqctl::error::MiqResult<()> {
//!     let query = ResourceQuery::vm("web01", PowerState::On)?;
//!     let vm = Resolver::new(client).resolve_one(&query).await?;
//!     println!("{}", vm.href);
//!     Ok(())
//! }
//! ```

pub mod fetcher;
pub mod inspect;
pub mod migrate;
pub mod model;
pub mod quota;
pub mod resolver;
pub mod tags;

pub use fetcher::{CollectionQuery, ResourceFilter};
pub use model::{
    CandidateResource, PowerState, Resolution, ResourceKind, ResourcePage, ResourceQuery,
    ServiceRef,
};
pub use resolver::{select_closest, ResourceLookup, Resolver};
pub use tags::{TagCatalog, TagMap};
