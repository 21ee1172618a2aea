//! Resource model
//!
//! Query and candidate types shared by the resolver and the higher-level operations.

use crate::error::{MiqError, MiqResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Collection a resource lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vm,
    Service,
}

impl ResourceKind {
    /// Collection path segment under the API root
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Vm => "vms",
            ResourceKind::Service => "services",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Vm => "VM",
            ResourceKind::Service => "Service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// VM lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Archived,
}

impl PowerState {
    /// Value of the `power_state` attribute as the API reports it.
    /// Archived VMs carry no power state and show up as `unknown`.
    pub fn api_value(&self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Off => "off",
            PowerState::Archived => "unknown",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Off => "off",
            PowerState::Archived => "archived",
        }
    }

    /// Check whether a reported `power_state` belongs to this lifecycle state
    pub fn matches_reported(&self, reported: &str) -> bool {
        let reported = reported.to_lowercase();
        match self {
            PowerState::Archived => reported == "unknown" || reported == "archived",
            other => reported == other.api_value(),
        }
    }
}

impl FromStr for PowerState {
    type Err = MiqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on" => Ok(PowerState::On),
            "off" => Ok(PowerState::Off),
            "archived" | "unknown" => Ok(PowerState::Archived),
            other => Err(MiqError::Validation(format!(
                "unknown VM state '{}' (expected on, off or archived)",
                other
            ))),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    name: String,
    desired_state: PowerState,
    kind: ResourceKind,
}

impl ResourceQuery {
    /// Build a query, rejecting blank names before any lookup happens
    pub fn new(name: &str, desired_state: PowerState, kind: ResourceKind) -> MiqResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MiqError::Validation(format!(
                "{} name is not provided",
                kind.display_name()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            desired_state,
            kind,
        })
    }

    /// Build a query from raw user input
    pub fn parse(name: &str, state: Option<&str>, kind: ResourceKind) -> MiqResult<Self> {
        let Some(state) = state else {
            return Err(MiqError::Validation("VM state is not provided".to_string()));
        };
        let state = state.parse::<PowerState>()?;
        Self::new(name, state, kind)
    }

    pub fn vm(name: &str, state: PowerState) -> MiqResult<Self> {
        Self::new(name, state, ResourceKind::Vm)
    }

    /// Service records are looked up by the name of the VM they wrap
    pub fn service(vm_name: &str) -> MiqResult<Self> {
        Self::new(vm_name, PowerState::On, ResourceKind::Service)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desired_state(&self) -> PowerState {
        self.desired_state
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Name the resource is stored under remotely
    pub fn target_name(&self) -> String {
        match self.kind {
            ResourceKind::Vm => self.name.clone(),
            ResourceKind::Service => service_name_for(&self.name),
        }
    }

    /// States to try, in order. A running VM may have been powered off since it was recorded.
    pub fn state_cascade(&self) -> Vec<PowerState> {
        match (self.kind, self.desired_state) {
            (ResourceKind::Vm, PowerState::On) => vec![PowerState::On, PowerState::Off],
            (_, state) => vec![state],
        }
    }
}

/// Display name of the service record wrapping a VM
pub fn service_name_for(vm_name: &str) -> String {
    format!("VM - {}", vm_name)
}

/// Reference from a VM to its service record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub href: Option<String>,
}

/// A resource returned by a lookup, before the caller acts on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResource {
    pub href: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "power_state", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, rename = "service", skip_serializing_if = "Option::is_none")]
    pub service_link: Option<ServiceRef>,
}

impl CandidateResource {
    /// Trailing id segment of the href
    pub fn id(&self) -> Option<&str> {
        self.href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
    }
}

/// One page of a collection query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcePage {
    #[serde(default)]
    pub resources: Vec<CandidateResource>,
    #[serde(default)]
    pub subcount: Option<u64>,
}

impl ResourcePage {
    /// Number of matching resources reported by the server
    pub fn count(&self) -> usize {
        self.subcount
            .map(|n| n as usize)
            .unwrap_or(self.resources.len())
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "resources", rename_all = "snake_case")]
pub enum Resolution {
    Found(CandidateResource),
    Ambiguous(Vec<CandidateResource>),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// Convert into a single candidate, turning the other outcomes into errors
    pub fn into_single(self, query: &ResourceQuery) -> MiqResult<CandidateResource> {
        match self {
            Resolution::Found(candidate) => Ok(candidate),
            Resolution::Ambiguous(candidates) => Err(MiqError::Ambiguous {
                name: query.target_name(),
                candidates: candidates.into_iter().map(|c| c.href).collect(),
            }),
            Resolution::NotFound => Err(MiqError::NotFound {
                kind: format!("{} ({})", query.kind(), query.desired_state()),
                name: query.target_name(),
            }),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
