//! Resource Resolver
//!
//! Locates a VM or service record from a human-supplied name. The API only
//! offers exact-match filters, while names in the inventory drift in case and
//! spacing, so lookups cascade from strict to loose:
//!
//! 1. exact name and state
//! 2. lower- then upper-cased name, same state
//! 3. running VMs only: repeat 1-2 with the VM powered off
//! 4. services only: server-side wildcard `name='*<name>'`
//! 5. full collection scan, case-insensitive substring match
//!
//! A step only runs when every earlier step matched nothing. A filtered step
//! matching more than one resource is reported as ambiguous rather than guessed.

use super::fetcher::ResourceFilter;
use super::model::{
    CandidateResource, PowerState, Resolution, ResourceKind, ResourcePage, ResourceQuery,
};
use crate::error::MiqResult;
use async_trait::async_trait;

/// Read access the resolver needs from the API
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// Query a collection with equality filters
    async fn find(&self, kind: ResourceKind, filters: &[ResourceFilter]) -> MiqResult<ResourcePage>;

    /// Fetch every resource of a collection
    async fn list_all(&self, kind: ResourceKind) -> MiqResult<ResourcePage>;
}

/// Cascading name resolver over a [`ResourceLookup`]
pub struct Resolver<'a, L: ResourceLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: ResourceLookup + ?Sized> Resolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Validate raw input and resolve it. Invalid input never reaches the API.
    pub async fn resolve_name(
        &self,
        name: &str,
        state: Option<&str>,
        kind: ResourceKind,
    ) -> MiqResult<Resolution> {
        let query = ResourceQuery::parse(name, state, kind)?;
        self.resolve(&query).await
    }

    /// Resolve a query to exactly one of found, ambiguous or not found
    pub async fn resolve(&self, query: &ResourceQuery) -> MiqResult<Resolution> {
        let target = query.target_name();
        let kind = query.kind();

        for state in query.state_cascade() {
            for variant in name_variants(&target) {
                let filters = filters_for(kind, &variant, state);
                let page = self.lookup.find(kind, &filters).await?;

                if page.count() > 1 {
                    tracing::warn!(
                        "{} {} resources share the name '{}'",
                        page.count(),
                        kind,
                        variant
                    );
                    return Ok(Resolution::Ambiguous(page.resources));
                }

                if let Some(candidate) = page.resources.into_iter().next() {
                    tracing::info!("{} '{}' resolved to {}", kind, variant, candidate.href);
                    return Ok(Resolution::Found(candidate));
                }

                tracing::debug!("No {} named '{}' with state {}", kind, variant, state);
            }
        }

        if kind == ResourceKind::Service {
            let wildcard = [ResourceFilter::name(&format!("*{}", query.name()))];
            let page = self.lookup.find(kind, &wildcard).await?;
            if let Some(candidate) = select_closest(&page.resources, query) {
                tracing::warn!(
                    "{} '{}' matched '{}' with extra whitespace",
                    kind,
                    target,
                    candidate.name
                );
                return Ok(Resolution::Found(candidate.clone()));
            }
        }

        tracing::debug!("Scanning all {} for names containing '{}'", kind, query.name());
        let page = self.lookup.list_all(kind).await?;
        let compatible: Vec<CandidateResource> = page
            .resources
            .into_iter()
            .filter(|c| state_compatible(c, query))
            .collect();

        match select_closest(&compatible, query) {
            Some(candidate) => {
                tracing::warn!(
                    "{} '{}' matched '{}' ({}) by case-insensitive scan",
                    kind,
                    target,
                    candidate.name,
                    candidate.href
                );
                Ok(Resolution::Found(candidate.clone()))
            }
            None => {
                tracing::info!("{} '{}' not found", kind, target);
                Ok(Resolution::NotFound)
            }
        }
    }

    /// Resolve to a single candidate; ambiguity and absence become errors
    pub async fn resolve_one(&self, query: &ResourceQuery) -> MiqResult<CandidateResource> {
        self.resolve(query).await?.into_single(query)
    }
}

/// Pick the closest substring match.
///
/// A candidate whose name is exactly as long as the target differs only in
/// case and wins immediately. Otherwise the shortest name longer than the
/// target wins; ties keep the first seen.
pub fn select_closest<'c>(
    candidates: &'c [CandidateResource],
    query: &ResourceQuery,
) -> Option<&'c CandidateResource> {
    let needle = query.name().to_lowercase();
    let target_len = query.target_name().chars().count();
    let mut best: Option<(&CandidateResource, usize)> = None;

    for candidate in candidates {
        if !is_substring_match(candidate, query.kind(), &needle) {
            continue;
        }

        let len = candidate.name.chars().count();
        if len == target_len {
            return Some(candidate);
        }
        if len > target_len && best.map_or(true, |(_, best_len)| len < best_len) {
            best = Some((candidate, len));
        }
    }

    best.map(|(candidate, _)| candidate)
}

fn is_substring_match(candidate: &CandidateResource, kind: ResourceKind, needle: &str) -> bool {
    let name = candidate.name.to_lowercase();
    match kind {
        ResourceKind::Vm => name.contains(needle),
        ResourceKind::Service => name.starts_with("vm") && name.contains(needle),
    }
}

/// Archived lookups only accept archived VMs and live lookups never accept
/// them. Any other reported state (suspended, never, ...) is kept, as are
/// candidates without a reported state.
fn state_compatible(candidate: &CandidateResource, query: &ResourceQuery) -> bool {
    if query.kind() == ResourceKind::Service {
        return true;
    }
    let Some(reported) = candidate.state.as_deref() else {
        return true;
    };
    let archived = PowerState::Archived.matches_reported(reported);
    match query.desired_state() {
        PowerState::Archived => archived,
        PowerState::On | PowerState::Off => !archived,
    }
}

/// Exact, lower-cased and upper-cased forms, without repeats
fn name_variants(name: &str) -> Vec<String> {
    let mut variants = vec![name.to_string()];
    for variant in [name.to_lowercase(), name.to_uppercase()] {
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    variants
}

fn filters_for(kind: ResourceKind, name: &str, state: PowerState) -> Vec<ResourceFilter> {
    match kind {
        ResourceKind::Vm => vec![
            ResourceFilter::name(name),
            ResourceFilter::new("power_state", state.api_value()),
        ],
        ResourceKind::Service => vec![ResourceFilter::name(name)],
    }
}
