//! Tenant quotas
//!
//! Storage and memory quotas are stored in bytes and shown in GB; CPU quotas
//! are a core count.

use super::fetcher::{fetch_collection, with_query, CollectionQuery, ResourceFilter};
use crate::error::{MiqError, MiqResult};
use crate::miq::client::MiqClient;
use serde::Serialize;
use serde_json::Value;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

const QUOTA_ATTRIBUTES: &[&str] = &["name", "value", "unit", "used", "available", "total"];

/// Kind of tenant quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    Storage,
    Memory,
    Cpu,
}

impl QuotaKind {
    /// Quota name as stored by the API
    pub fn api_name(&self) -> &'static str {
        match self {
            QuotaKind::Storage => "storage_allocated",
            QuotaKind::Memory => "mem_allocated",
            QuotaKind::Cpu => "cpu_allocated",
        }
    }

    fn from_api_name(name: &str) -> Option<Self> {
        match name {
            "storage_allocated" => Some(QuotaKind::Storage),
            "mem_allocated" => Some(QuotaKind::Memory),
            "cpu_allocated" => Some(QuotaKind::Cpu),
            _ => None,
        }
    }

    /// Divisor from wire units to display units
    fn scale(&self) -> f64 {
        match self {
            QuotaKind::Cpu => 1.0,
            _ => BYTES_PER_GB,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            QuotaKind::Cpu => "cores",
            _ => "GB",
        }
    }
}

/// One quota in display units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaEntry {
    pub kind: QuotaKind,
    pub href: String,
    pub value: f64,
    pub used: Option<f64>,
    pub available: Option<f64>,
}

/// Storage, memory and CPU quotas of a tenant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantQuota {
    pub tenant_href: String,
    pub storage: Option<QuotaEntry>,
    pub memory: Option<QuotaEntry>,
    pub cpu: Option<QuotaEntry>,
}

impl TenantQuota {
    /// Decode a quota collection response
    pub fn from_response(tenant_href: &str, response: &Value) -> Self {
        let mut quota = Self {
            tenant_href: tenant_href.to_string(),
            storage: None,
            memory: None,
            cpu: None,
        };

        let resources = response
            .get("resources")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        for resource in &resources {
            let Some(kind) = resource
                .get("name")
                .and_then(|v| v.as_str())
                .and_then(QuotaKind::from_api_name)
            else {
                continue;
            };
            let (Some(href), Some(raw)) = (
                resource.get("href").and_then(|v| v.as_str()),
                number_field(resource, "value"),
            ) else {
                tracing::warn!("Quota {} is missing href or value", kind.api_name());
                continue;
            };

            let scale = kind.scale();
            let entry = QuotaEntry {
                kind,
                href: href.to_string(),
                value: raw / scale,
                used: number_field(resource, "used").map(|v| round3(v / scale)),
                available: number_field(resource, "available").map(|v| round3(v / scale)),
            };
            *quota.slot(kind) = Some(entry);
        }

        quota
    }

    fn slot(&mut self, kind: QuotaKind) -> &mut Option<QuotaEntry> {
        match kind {
            QuotaKind::Storage => &mut self.storage,
            QuotaKind::Memory => &mut self.memory,
            QuotaKind::Cpu => &mut self.cpu,
        }
    }

    pub fn entry(&self, kind: QuotaKind) -> Option<&QuotaEntry> {
        match kind {
            QuotaKind::Storage => self.storage.as_ref(),
            QuotaKind::Memory => self.memory.as_ref(),
            QuotaKind::Cpu => self.cpu.as_ref(),
        }
    }
}

/// Requested change; zero means leave untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QuotaDelta {
    pub cpu: i64,
    pub memory_gb: f64,
    pub storage_gb: f64,
}

impl QuotaDelta {
    pub fn is_empty(&self) -> bool {
        self.cpu == 0 && self.memory_gb == 0.0 && self.storage_gb == 0.0
    }
}

/// A planned quota edit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaUpdate {
    pub kind: QuotaKind,
    pub href: String,
    pub old_value: f64,
    pub new_value: f64,
    /// Value sent to the API, in wire units
    pub wire_value: String,
}

/// Compute the edits for a delta. Fails if a quota is missing or would go negative.
pub fn plan_updates(quota: &TenantQuota, delta: &QuotaDelta) -> MiqResult<Vec<QuotaUpdate>> {
    let requested = [
        (QuotaKind::Storage, delta.storage_gb),
        (QuotaKind::Memory, delta.memory_gb),
        (QuotaKind::Cpu, delta.cpu as f64),
    ];

    let mut updates = Vec::new();
    for (kind, change) in requested {
        if !change.is_finite() {
            return Err(MiqError::Validation(format!(
                "{} change must be a finite number, got {}",
                kind.api_name(),
                change
            )));
        }
        if change == 0.0 {
            continue;
        }
        let entry = quota.entry(kind).ok_or_else(|| MiqError::NotFound {
            kind: "Quota".to_string(),
            name: kind.api_name().to_string(),
        })?;

        let new_value = entry.value + change;
        if !new_value.is_finite() || new_value * kind.scale() >= i64::MAX as f64 {
            return Err(MiqError::Validation(format!(
                "{} quota {} {} is out of range",
                kind.api_name(),
                new_value,
                kind.unit()
            )));
        }
        if new_value < 0.0 {
            return Err(MiqError::Validation(format!(
                "{} quota would become negative ({} {})",
                kind.api_name(),
                new_value,
                kind.unit()
            )));
        }

        let wire_value = match kind {
            QuotaKind::Cpu => format!("{}", new_value.round() as i64),
            _ => format!("{}", (new_value * BYTES_PER_GB).round() as i64),
        };

        updates.push(QuotaUpdate {
            kind,
            href: entry.href.clone(),
            old_value: entry.value,
            new_value,
            wire_value,
        });
    }

    Ok(updates)
}

/// Find a tenant by its CI name, e.g. `rsb_ci85262`
pub async fn find_tenant(client: &MiqClient, ci_name: &str) -> MiqResult<String> {
    let ci_name = ci_name.trim();
    if ci_name.is_empty() {
        return Err(MiqError::Validation("tenant name is not provided".to_string()));
    }

    let query = CollectionQuery::new()
        .attributes(&["name"])
        .filter(ResourceFilter::name(ci_name));
    let page = fetch_collection(client, "tenants", &query).await?;

    page.resources
        .into_iter()
        .next()
        .map(|tenant| tenant.href)
        .ok_or_else(|| MiqError::NotFound {
            kind: "Tenant".to_string(),
            name: ci_name.to_string(),
        })
}

/// Read the quotas of a tenant
pub async fn get_tenant_quota(client: &MiqClient, tenant_href: &str) -> MiqResult<TenantQuota> {
    let url = with_query(
        &format!("{}/quotas", tenant_href.trim_end_matches('/')),
        &CollectionQuery::new()
            .attributes(QUOTA_ATTRIBUTES)
            .to_query_string(),
    );
    let response = client.get(&url).await?;
    Ok(TenantQuota::from_response(tenant_href, &response))
}

/// Send planned quota edits, in order
pub async fn apply_updates(client: &MiqClient, updates: &[QuotaUpdate]) -> MiqResult<Vec<Value>> {
    let mut responses = Vec::with_capacity(updates.len());
    for update in updates {
        let response = client
            .action(&update.href, "edit", serde_json::json!({ "value": update.wire_value }))
            .await?;
        tracing::info!(
            "{} quota: {} -> {} {}",
            update.kind.api_name(),
            update.old_value,
            update.new_value,
            update.kind.unit()
        );
        responses.push(response);
    }
    Ok(responses)
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
