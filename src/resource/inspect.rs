//! Resource operations
//!
//! Single-call reads and edits on a resolved resource href: tags,
//! descriptions, operating system, attached service, owner, rename, delete.

use super::fetcher::fetch_resource;
use super::model::{service_name_for, ServiceRef};
use super::tags::{TagCatalog, TagMap};
use crate::error::{MiqError, MiqResult};
use crate::miq::client::MiqClient;
use serde::Serialize;
use serde_json::{json, Value};

/// Name, description and decoded tags of a resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedResource {
    pub href: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: TagMap,
}

impl TaggedResource {
    fn from_value(href: &str, value: &Value) -> Self {
        let tags = value
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| TagMap::from_tags(arr))
            .unwrap_or_default();

        Self {
            href: href.to_string(),
            name: str_field(value, "name").unwrap_or_default(),
            description: str_field(value, "description").filter(|d| !d.trim().is_empty()),
            tags,
        }
    }
}

/// Operating system reported for a VM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsInfo {
    pub vm_name: String,
    pub product_name: Option<String>,
    pub id: Option<String>,
}

/// Owner of a service record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Owner {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn require_href(href: &str) -> MiqResult<&str> {
    let href = href.trim();
    if href.is_empty() {
        return Err(MiqError::Validation("resource URL is not provided".to_string()));
    }
    Ok(href)
}

/// Read the tags and description of a VM or service
pub async fn get_tags(client: &MiqClient, href: &str) -> MiqResult<TaggedResource> {
    let href = require_href(href)?;
    tracing::debug!("Extracting tags for {}", href);
    let value = fetch_resource(client, href, &["name", "description", "tags"]).await?;
    Ok(TaggedResource::from_value(href, &value))
}

/// Assign a tag after validating it against the catalog
pub async fn assign_tag(
    client: &MiqClient,
    catalog: &TagCatalog,
    href: &str,
    category: &str,
    value: &str,
) -> MiqResult<Value> {
    let (category, value) = catalog.normalize(category, value)?;
    assign_tag_unchecked(client, href, &category, &value).await
}

/// Assign a tag exactly as given, e.g. when copying tags between resources
pub async fn assign_tag_unchecked(
    client: &MiqClient,
    href: &str,
    category: &str,
    value: &str,
) -> MiqResult<Value> {
    let href = require_href(href)?;
    let url = format!("{}/tags", href.trim_end_matches('/'));
    let response = client
        .action(&url, "assign", json!({ "name": value, "category": category }))
        .await?;
    tracing::info!("Assigned tag {}/{} to {}", category, value, href);
    Ok(response)
}

/// Replace the description of a VM or service
pub async fn update_description(client: &MiqClient, href: &str, description: &str) -> MiqResult<Value> {
    let href = require_href(href)?;
    let response = client
        .action(href, "edit", json!({ "description": description }))
        .await?;
    tracing::info!("Updated description of {}", href);
    Ok(response)
}

/// Read the operating system of a VM
pub async fn get_vm_os(client: &MiqClient, href: &str) -> MiqResult<OsInfo> {
    let href = require_href(href)?;
    let value = fetch_resource(client, href, &["name", "operating_system"]).await?;
    let os = value.get("operating_system").filter(|v| !v.is_null());

    Ok(OsInfo {
        vm_name: str_field(&value, "name").unwrap_or_default(),
        product_name: os.and_then(|os| str_field(os, "product_name")),
        id: os.and_then(|os| str_field(os, "id")),
    })
}

/// Service record attached to a VM, if any
pub async fn get_vm_service(client: &MiqClient, href: &str) -> MiqResult<Option<ServiceRef>> {
    let href = require_href(href)?;
    let value = fetch_resource(client, href, &["name", "service"]).await?;

    match value.get("service") {
        None | Some(Value::Null) => {
            tracing::info!("{} has no service attached", href);
            Ok(None)
        }
        Some(service) => Ok(Some(serde_json::from_value(service.clone())?)),
    }
}

/// Owner of a service, looked up through `evm_owner_id`
pub async fn get_service_owner(client: &MiqClient, service_href: &str) -> MiqResult<Option<Owner>> {
    let href = require_href(service_href)?;
    let value = fetch_resource(client, href, &["name", "evm_owner_id"]).await?;

    let Some(owner_id) = str_field(&value, "evm_owner_id").filter(|id| !id.is_empty()) else {
        tracing::warn!("{} has no owner id", href);
        return Ok(None);
    };

    let user = client.get(&client.resource_url("users", &owner_id)).await?;
    Ok(Some(Owner {
        id: owner_id,
        name: str_field(&user, "name").unwrap_or_default(),
        email: str_field(&user, "email"),
    }))
}

/// Rename a service to the canonical `VM - <NAME>` form
pub async fn rename_service(client: &MiqClient, service_href: &str, vm_name: &str) -> MiqResult<String> {
    let href = require_href(service_href)?;
    if vm_name.trim().is_empty() {
        return Err(MiqError::Validation("VM name is not provided".to_string()));
    }

    let new_name = service_name_for(&vm_name.trim().to_uppercase());
    client
        .action(href, "edit", json!({ "name": new_name }))
        .await?;
    tracing::info!("Renamed service {} to '{}'", href, new_name);
    Ok(new_name)
}

/// Delete a VM or service
pub async fn delete_resource(client: &MiqClient, href: &str) -> MiqResult<Value> {
    let href = require_href(href)?;
    let response = client.delete(href).await?;
    tracing::info!("Deleted {}", href);
    Ok(response)
}
