//! VM metadata migration
//!
//! Moves the metadata of an archived VM onto the live VM that replaced it:
//! tags, description and the service record name, then removes the archived
//! VM. One VM per run; each mutating step is confirmed first.

use super::inspect::{
    assign_tag_unchecked, delete_resource, get_tags, rename_service, update_description,
    TaggedResource,
};
use super::model::{service_name_for, CandidateResource, PowerState, Resolution, ResourceQuery};
use super::resolver::Resolver;
use crate::error::{MiqError, MiqResult};
use crate::miq::client::MiqClient;
use crate::prompt::Confirm;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

/// What a migration would change
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub vm_name: String,
    pub archived: TaggedResource,
    pub live: TaggedResource,
    pub live_state: Option<String>,
    /// Tags on the archived VM that the live VM lacks
    pub tag_changes: Vec<(String, String)>,
    /// Description to copy, when the live VM has none
    pub description: Option<String>,
    pub service: Option<CandidateResource>,
    /// New service name, when the current one is not canonical
    pub service_rename: Option<String>,
}

impl MigrationPlan {
    pub fn has_changes(&self) -> bool {
        !self.tag_changes.is_empty() || self.description.is_some() || self.service_rename.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    AssignTags,
    CopyDescription,
    RenameService,
    DeleteArchived,
}

impl MigrationStep {
    pub fn display_name(&self) -> &'static str {
        match self {
            MigrationStep::AssignTags => "Assign tags",
            MigrationStep::CopyDescription => "Copy description",
            MigrationStep::RenameService => "Rename service",
            MigrationStep::DeleteArchived => "Delete archived VM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    Applied,
    Skipped(String),
    Declined,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: MigrationStep,
    pub status: StepStatus,
}

/// Record of one migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub vm_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepOutcome>,
}

impl MigrationReport {
    pub fn has_failures(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed(_)))
    }
}

/// Resolve both VMs and the service record, and work out what to change
pub async fn plan_migration(client: &MiqClient, vm_name: &str) -> MiqResult<MigrationPlan> {
    let resolver = Resolver::new(client);

    let archived_query = ResourceQuery::vm(vm_name, PowerState::Archived)?;
    let archived = resolver.resolve_one(&archived_query).await?;

    let live_query = ResourceQuery::vm(vm_name, PowerState::On)?;
    let live = resolver.resolve_one(&live_query).await?;

    if archived.href == live.href {
        return Err(MiqError::Validation(format!(
            "archived and live VM resolve to the same resource {}",
            live.href
        )));
    }

    let service_query = ResourceQuery::service(vm_name)?;
    let service = match resolver.resolve(&service_query).await? {
        Resolution::Found(service) => Some(service),
        Resolution::NotFound => {
            tracing::warn!("No service record for VM '{}'", vm_name);
            None
        }
        Resolution::Ambiguous(candidates) => {
            return Err(MiqError::Ambiguous {
                name: service_query.target_name(),
                candidates: candidates.into_iter().map(|c| c.href).collect(),
            });
        }
    };

    let archived_tags = get_tags(client, &archived.href).await?;
    let live_tags = get_tags(client, &live.href).await?;

    let tag_changes = archived_tags.tags.missing_from(&live_tags.tags);
    let description = match (&archived_tags.description, &live_tags.description) {
        (Some(old), None) => Some(old.clone()),
        _ => None,
    };

    let canonical = service_name_for(&live_query.name().to_uppercase());
    let service_rename = service
        .as_ref()
        .filter(|s| s.name != canonical)
        .map(|_| canonical);

    Ok(MigrationPlan {
        vm_name: live_query.name().to_string(),
        archived: archived_tags,
        live: live_tags,
        live_state: live.state,
        tag_changes,
        description,
        service,
        service_rename,
    })
}

/// Apply a plan step by step. The archived VM is only deleted when nothing failed.
pub async fn execute_migration(
    client: &MiqClient,
    plan: &MigrationPlan,
    confirm: &mut dyn Confirm,
) -> MigrationReport {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let span = tracing::info_span!("migrate", %run_id, vm = %plan.vm_name);

    let steps = async {
        let mut steps = Vec::new();

        steps.push(StepOutcome {
            step: MigrationStep::AssignTags,
            status: assign_tags(client, plan, confirm).await,
        });
        steps.push(StepOutcome {
            step: MigrationStep::CopyDescription,
            status: copy_description(client, plan, confirm).await,
        });
        steps.push(StepOutcome {
            step: MigrationStep::RenameService,
            status: rename(client, plan, confirm).await,
        });

        let failed = steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed(_)));
        let status = if failed {
            StepStatus::Skipped("an earlier step failed".to_string())
        } else {
            delete_archived(client, plan, confirm).await
        };
        steps.push(StepOutcome {
            step: MigrationStep::DeleteArchived,
            status,
        });

        for outcome in &steps {
            tracing::info!("{}: {:?}", outcome.step.display_name(), outcome.status);
        }
        steps
    }
    .instrument(span)
    .await;

    MigrationReport {
        run_id,
        vm_name: plan.vm_name.clone(),
        started_at,
        finished_at: Utc::now(),
        steps,
    }
}

async fn assign_tags(client: &MiqClient, plan: &MigrationPlan, confirm: &mut dyn Confirm) -> StepStatus {
    if plan.tag_changes.is_empty() {
        return StepStatus::Skipped("live VM already carries every tag".to_string());
    }

    let listed = plan
        .tag_changes
        .iter()
        .map(|(c, v)| format!("{}={}", c, v))
        .collect::<Vec<_>>()
        .join(", ");
    if !confirm.confirm(&format!("Assign tags [{}] to {}?", listed, plan.live.href)) {
        return StepStatus::Declined;
    }

    for (category, value) in &plan.tag_changes {
        if let Err(e) = assign_tag_unchecked(client, &plan.live.href, category, value).await {
            return StepStatus::Failed(format!("{}/{}: {}", category, value, e));
        }
    }
    StepStatus::Applied
}

async fn copy_description(
    client: &MiqClient,
    plan: &MigrationPlan,
    confirm: &mut dyn Confirm,
) -> StepStatus {
    let Some(description) = &plan.description else {
        return StepStatus::Skipped("nothing to copy".to_string());
    };
    if !confirm.confirm(&format!("Set description '{}' on {}?", description, plan.live.href)) {
        return StepStatus::Declined;
    }
    match update_description(client, &plan.live.href, description).await {
        Ok(_) => StepStatus::Applied,
        Err(e) => StepStatus::Failed(e.to_string()),
    }
}

async fn rename(client: &MiqClient, plan: &MigrationPlan, confirm: &mut dyn Confirm) -> StepStatus {
    let (Some(service), Some(new_name)) = (&plan.service, &plan.service_rename) else {
        return StepStatus::Skipped("service name already canonical or no service".to_string());
    };
    if !confirm.confirm(&format!("Rename service '{}' to '{}'?", service.name, new_name)) {
        return StepStatus::Declined;
    }
    match rename_service(client, &service.href, &plan.vm_name).await {
        Ok(_) => StepStatus::Applied,
        Err(e) => StepStatus::Failed(e.to_string()),
    }
}

async fn delete_archived(
    client: &MiqClient,
    plan: &MigrationPlan,
    confirm: &mut dyn Confirm,
) -> StepStatus {
    if !confirm.confirm(&format!("Delete archived VM {}?", plan.archived.href)) {
        return StepStatus::Declined;
    }
    match delete_resource(client, &plan.archived.href).await {
        Ok(_) => StepStatus::Applied,
        Err(e) => StepStatus::Failed(e.to_string()),
    }
}
