//! Resource Fetcher
//!
//! Builds filtered collection queries and fetches collection pages, following
//! `links.next` until the collection is exhausted.

use super::model::{ResourceKind, ResourcePage};
use super::resolver::ResourceLookup;
use crate::error::MiqResult;
use crate::miq::client::MiqClient;
use async_trait::async_trait;
use serde_json::Value;

/// Page size used when scanning a whole collection
const PAGE_LIMIT: usize = 1000;

/// Attributes the resolver needs on every candidate; services have no power state
pub fn candidate_attributes(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Vm => &["name", "power_state"],
        ResourceKind::Service => &["name"],
    }
}

/// Attribute equality filter, sent as `filter[]=<attribute>='<value>'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    pub attribute: String,
    pub value: String,
}

impl ResourceFilter {
    pub fn new(attribute: &str, value: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    pub fn name(value: &str) -> Self {
        Self::new("name", value)
    }

    fn to_query_part(&self) -> String {
        let expression = format!("{}='{}'", self.attribute, self.value);
        format!("filter[]={}", urlencoding::encode(&expression))
    }
}

/// Query against a collection
#[derive(Debug, Clone, Default)]
pub struct CollectionQuery {
    pub attributes: Vec<String>,
    pub filters: Vec<ResourceFilter>,
}

impl CollectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: ResourceFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: &[ResourceFilter]) -> Self {
        self.filters.extend(filters.iter().cloned());
        self
    }

    /// Render the query string (without the leading `?`)
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.attributes.is_empty() {
            parts.push("expand=resources".to_string());
            parts.push(format!(
                "attributes={}",
                urlencoding::encode(&self.attributes.join(","))
            ));
        }

        parts.extend(self.filters.iter().map(ResourceFilter::to_query_part));
        parts.join("&")
    }
}

/// Append query parts to a URL that may already carry a query string
pub fn with_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}

/// Fetch one page of a collection
pub async fn fetch_page(client: &MiqClient, url: &str) -> MiqResult<(ResourcePage, Option<String>)> {
    let response = client.get(url).await?;

    let next = response
        .pointer("/links/next")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let page = if response.is_null() {
        ResourcePage::default()
    } else {
        serde_json::from_value(response)?
    };

    Ok((page, next))
}

/// Fetch a filtered collection in a single request
pub async fn fetch_collection(
    client: &MiqClient,
    collection: &str,
    query: &CollectionQuery,
) -> MiqResult<ResourcePage> {
    let url = with_query(&client.collection_url(collection), &query.to_query_string());
    let (page, _) = fetch_page(client, &url).await?;
    Ok(page)
}

/// Fetch every resource of a collection (auto-paginate)
pub async fn fetch_all(
    client: &MiqClient,
    collection: &str,
    query: &CollectionQuery,
) -> MiqResult<ResourcePage> {
    let mut query_string = format!("offset=0&limit={}", PAGE_LIMIT);
    let extra = query.to_query_string();
    if !extra.is_empty() {
        query_string.push('&');
        query_string.push_str(&extra);
    }
    let first = with_query(&client.collection_url(collection), &query_string);

    let mut all = ResourcePage::default();
    let mut next_url = Some(first);

    while let Some(url) = next_url.take() {
        let (page, next) = fetch_page(client, &url).await?;
        let fetched = page.resources.len();
        all.subcount = page.subcount.or(all.subcount);
        all.resources.extend(page.resources);

        // Guard against servers that keep returning a next link for empty pages
        if fetched > 0 {
            next_url = next;
        }
    }

    tracing::debug!("Fetched {} {}", all.resources.len(), collection);
    Ok(all)
}

/// Fetch a single resource with extra attributes expanded
pub async fn fetch_resource(client: &MiqClient, href: &str, attributes: &[&str]) -> MiqResult<Value> {
    let query = CollectionQuery::new().attributes(attributes).to_query_string();
    client.get(&with_query(href, &query)).await
}

#[async_trait]
impl ResourceLookup for MiqClient {
    async fn find(&self, kind: ResourceKind, filters: &[ResourceFilter]) -> MiqResult<ResourcePage> {
        let query = CollectionQuery::new()
            .attributes(candidate_attributes(kind))
            .filters(filters);
        fetch_collection(self, kind.collection(), &query).await
    }

    async fn list_all(&self, kind: ResourceKind) -> MiqResult<ResourcePage> {
        let query = CollectionQuery::new().attributes(candidate_attributes(kind));
        fetch_all(self, kind.collection(), &query).await
    }
}
