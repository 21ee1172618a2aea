//! Integration tests for the ManageIQ client using wiremock
//!
//! These tests drive the real client, resolver and resource operations
//! against a mocked API, checking query strings, request bodies, retries
//! and error mapping.

use miqctl::miq::auth::Credentials;
use miqctl::miq::client::{MiqClient, MiqConfig};
use miqctl::miq::http::{format_miq_error, HttpSettings};
use miqctl::resource::fetcher::{fetch_all, CollectionQuery};
use miqctl::resource::{inspect, quota, ResourceKind, ResourceQuery, Resolution, Resolver, TagCatalog};
use miqctl::resource::{PowerState, ResourceLookup};
use miqctl::MiqError;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout: Duration) -> MiqClient {
    let config = MiqConfig::new(&format!("{}/api", server.uri()))
        .unwrap()
        .with_http(HttpSettings {
            timeout,
            accept_invalid_certs: false,
        });
    MiqClient::new(config, Credentials::new("admin", "smartvm").unwrap()).unwrap()
}

fn page(resources: Value) -> Value {
    let count = resources.as_array().map(|a| a.len()).unwrap_or(0);
    json!({ "resources": resources, "subcount": count })
}

fn vm(server: &MockServer, id: u32, name: &str, state: &str) -> Value {
    json!({
        "href": format!("{}/api/vms/{}", server.uri(), id),
        "name": name,
        "power_state": state,
    })
}

/// Any filtered query not matched by a more specific mock returns nothing
async fn mount_empty_collection(server: &MockServer, collection: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{}", collection)))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]))))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Test module for HTTP client integration tests
mod http_client_tests {
    use super::*;

    /// Test GET sends basic auth and parses JSON
    #[tokio::test]
    async fn test_get_sends_basic_auth() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms/1"))
            .and(basic_auth("admin", "smartvm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "web01"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let response = client
            .get(&format!("{}/api/vms/1", server.uri()))
            .await
            .expect("request should succeed");

        assert_eq!(response["name"], "web01");
    }

    /// Test a single 503 is retried and the second answer wins
    #[tokio::test]
    async fn test_503_is_retried_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let response = client.get(&format!("{}/api/vms", server.uri())).await;

        assert!(response.is_ok());
    }

    /// Test a persistent 503 gives up after the second attempt
    #[tokio::test]
    async fn test_persistent_503_gives_up_after_two_attempts() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client
            .get(&format!("{}/api/vms", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(503));
    }

    /// Test 500 is not retried and carries the API's own message
    #[tokio::test]
    async fn test_500_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"kind": "internal_server_error", "message": "boom"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client
            .get(&format!("{}/api/vms", server.uri()))
            .await
            .unwrap_err();

        match err {
            MiqError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Test 401 maps to an authentication hint
    #[tokio::test]
    async fn test_401_returns_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"kind": "unauthorized", "message": "Invalid credentials"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client
            .get(&format!("{}/api/vms", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(401));
        let shown = format_miq_error(&anyhow::Error::from(err));
        assert!(shown.contains("Authentication failed"));
    }

    /// Test a slow server surfaces as a transport error
    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(json!([])))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(300));
        let err = client
            .get(&format!("{}/api/vms", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, MiqError::Transport(_)));
        assert!(err.is_retryable());
    }

    /// Test a timed-out DELETE is not sent again
    #[tokio::test]
    async fn test_delete_timeout_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/vms/9"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(3)))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/api/vms/9"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(300));
        let err = inspect::delete_resource(&client, &format!("{}/api/vms/9", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, MiqError::Transport(_)));
    }

    /// Test a POST refused with 503 is sent once more
    #[tokio::test]
    async fn test_post_503_is_retried_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/vms/4"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/vms/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "4"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let response = inspect::update_description(&client, &format!("{}/api/vms/4", server.uri()), "Payroll")
            .await
            .unwrap();

        assert_eq!(response["id"], "4");
    }

    /// Test empty 204 bodies decode as null
    #[tokio::test]
    async fn test_delete_with_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/services/5"))
            .and(basic_auth("admin", "smartvm"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let response = inspect::delete_resource(&client, &format!("{}/api/services/5", server.uri()))
            .await
            .expect("delete should succeed");

        assert!(response.is_null());
    }
}

/// Resolver cascade over HTTP
mod resolver_tests {
    use super::*;

    /// Test the exact query is sent with both filters and short-circuits
    #[tokio::test]
    async fn test_exact_match_sends_name_and_state_filters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .and(query_param("expand", "resources"))
            .and(query_param("attributes", "name,power_state"))
            .and(query_param("filter[]", "name='web01'"))
            .and(query_param("filter[]", "power_state='on'"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(json!([vm(&server, 1, "web01", "on")]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let query = ResourceQuery::vm("web01", PowerState::On).unwrap();
        let found = Resolver::new(&client).resolve_one(&query).await.unwrap();

        assert_eq!(found.href, format!("{}/api/vms/1", server.uri()));
        assert_eq!(found.state.as_deref(), Some("on"));
    }

    /// Test a running VM falls back to a powered-off, lower-cased match
    #[tokio::test]
    async fn test_cascade_reaches_lowercase_off() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .and(query_param("filter[]", "name='web01'"))
            .and(query_param("filter[]", "power_state='off'"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(json!([vm(&server, 4, "web01", "off")]))),
            )
            .with_priority(1)
            .mount(&server)
            .await;
        mount_empty_collection(&server, "vms").await;

        let client = client_for(&server, Duration::from_secs(5));
        let resolution = Resolver::new(&client)
            .resolve_name("WEB01", Some("on"), ResourceKind::Vm)
            .await
            .unwrap();

        match resolution {
            Resolution::Found(vm) => assert!(vm.href.ends_with("/api/vms/4")),
            other => panic!("unexpected resolution: {:?}", other),
        }

        // WEB01/on, web01/on, WEB01/off, web01/off
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 4);
    }

    /// Test archived lookups go out as power_state='unknown'
    #[tokio::test]
    async fn test_archived_is_sent_as_unknown() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .and(query_param("filter[]", "power_state='unknown'"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(json!([vm(&server, 9, "web01", "unknown")]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let query = ResourceQuery::vm("web01", PowerState::Archived).unwrap();
        let found = Resolver::new(&client).resolve_one(&query).await.unwrap();

        assert!(found.href.ends_with("/api/vms/9"));
    }

    /// Test duplicate names are reported, never guessed
    #[tokio::test]
    async fn test_duplicates_are_ambiguous() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([
                vm(&server, 1, "db01", "on"),
                vm(&server, 2, "db01", "on"),
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let query = ResourceQuery::vm("db01", PowerState::On).unwrap();
        let err = Resolver::new(&client).resolve_one(&query).await.unwrap_err();

        match err {
            MiqError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Test a service whose name has extra whitespace is found by wildcard
    #[tokio::test]
    async fn test_service_wildcard() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/services"))
            .and(query_param("attributes", "name"))
            .and(query_param("filter[]", "name='*web01'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{
                "href": format!("{}/api/services/12", server.uri()),
                "name": "VM -  web01",
            }]))))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_empty_collection(&server, "services").await;

        let client = client_for(&server, Duration::from_secs(5));
        let query = ResourceQuery::service("web01").unwrap();
        let found = Resolver::new(&client).resolve_one(&query).await.unwrap();

        assert!(found.href.ends_with("/api/services/12"));
        assert_eq!(found.name, "VM -  web01");
    }

    /// Test the final scan pages through the whole collection
    #[tokio::test]
    async fn test_scan_follows_next_links() {
        let server = MockServer::start().await;
        let next = format!(
            "{}/api/vms?offset=1000&limit=1000&expand=resources&attributes=name%2Cpower_state",
            server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": [vm(&server, 1, "db01", "on")],
                "links": {"next": next},
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .and(query_param("offset", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": [
                    vm(&server, 2, "web01-clone", "off"),
                    vm(&server, 3, "web01_x", "on"),
                ],
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_empty_collection(&server, "vms").await;

        let client = client_for(&server, Duration::from_secs(5));

        let all = fetch_all(
            &client,
            "vms",
            &CollectionQuery::new().attributes(&["name", "power_state"]),
        )
        .await
        .unwrap();
        assert_eq!(all.resources.len(), 3);

        let scanned = client.list_all(ResourceKind::Vm).await.unwrap();
        assert_eq!(scanned.resources.len(), 3);

        let query = ResourceQuery::vm("web01", PowerState::On).unwrap();
        let found = Resolver::new(&client).resolve_one(&query).await.unwrap();
        assert!(found.href.ends_with("/api/vms/3"));
    }

    /// Test nothing anywhere resolves to not found
    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        mount_empty_collection(&server, "vms").await;

        let client = client_for(&server, Duration::from_secs(5));
        let resolution = Resolver::new(&client)
            .resolve_name("ghost", Some("off"), ResourceKind::Vm)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::NotFound);
    }
}

/// Edits sent to resolved resources
mod operation_tests {
    use super::*;

    /// Test tags are decoded from the expanded resource
    #[tokio::test]
    async fn test_get_tags() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms/7"))
            .and(query_param("attributes", "name,description,tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "web01",
                "description": "  ",
                "tags": [
                    {"name": "/managed/vmtype/cloud"},
                    {"name": "/managed/location/b7"},
                    {"name": "/managed/lifecycle/retire_full"},
                ],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let tagged = inspect::get_tags(&client, &format!("{}/api/vms/7", server.uri()))
            .await
            .unwrap();

        assert_eq!(tagged.name, "web01");
        assert_eq!(tagged.description, None);
        assert_eq!(tagged.tags.vmtype(), Some("cloud"));
        assert_eq!(tagged.tags.visible().count(), 2);
    }

    /// Test assign posts an action body to the tags subcollection
    #[tokio::test]
    async fn test_assign_tag_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/vms/7/tags"))
            .and(body_json(json!({
                "action": "assign",
                "resource": {"name": "cloud", "category": "vmtype"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"success": true}]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        inspect::assign_tag(
            &client,
            &TagCatalog::default(),
            &format!("{}/api/vms/7", server.uri()),
            "vmtype",
            "Cloud",
        )
        .await
        .unwrap();
    }

    /// Test a value outside the catalog never reaches the API
    #[tokio::test]
    async fn test_assign_unknown_value_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = inspect::assign_tag(
            &client,
            &TagCatalog::default(),
            &format!("{}/api/vms/7", server.uri()),
            "vmtype",
            "mainframe",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MiqError::Validation(_)));
    }

    /// Test services are renamed to the canonical upper-cased form
    #[tokio::test]
    async fn test_rename_service() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/services/12"))
            .and(body_json(json!({
                "action": "edit",
                "resource": {"name": "VM - WEB01"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "12"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let name = inspect::rename_service(&client, &format!("{}/api/services/12", server.uri()), "web01")
            .await
            .unwrap();

        assert_eq!(name, "VM - WEB01");
    }

    /// Test the owner is read through evm_owner_id
    #[tokio::test]
    async fn test_service_owner() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/services/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "VM - WEB01",
                "evm_owner_id": 4,
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/users/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Jordan Ops",
                "email": "ops@example.com",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let owner = inspect::get_service_owner(&client, &format!("{}/api/services/12", server.uri()))
            .await
            .unwrap()
            .expect("owner should be present");

        assert_eq!(owner.id, "4");
        assert_eq!(owner.name, "Jordan Ops");
        assert_eq!(owner.email.as_deref(), Some("ops@example.com"));
    }

    /// Test a VM without a service reports none
    #[tokio::test]
    async fn test_vm_without_service() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/vms/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "web01"})))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let service = inspect::get_vm_service(&client, &format!("{}/api/vms/7", server.uri()))
            .await
            .unwrap();

        assert!(service.is_none());
    }

    /// Test a quota update converts GB back to bytes on the wire
    #[tokio::test]
    async fn test_quota_update() {
        let server = MockServer::start().await;
        let tenant_href = format!("{}/api/tenants/3", server.uri());

        Mock::given(method("GET"))
            .and(path("/api/tenants"))
            .and(query_param("filter[]", "name='rsb_ci85262'"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(json!([{"href": tenant_href, "name": "rsb_ci85262"}]))),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/tenants/3/quotas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": [{
                    "href": format!("{}/api/tenants/3/quotas/11", server.uri()),
                    "name": "storage_allocated",
                    "value": 107374182400u64,
                    "used": 53687091200u64,
                }],
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/tenants/3/quotas/11"))
            .and(body_json(json!({
                "action": "edit",
                "resource": {"value": "161061273600"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "11"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let href = quota::find_tenant(&client, "rsb_ci85262").await.unwrap();
        assert_eq!(href, tenant_href);

        let current = quota::get_tenant_quota(&client, &href).await.unwrap();
        let storage = current.storage.clone().expect("storage quota");
        assert_eq!(storage.value, 100.0);
        assert_eq!(storage.used, Some(50.0));

        let updates = quota::plan_updates(
            &current,
            &quota::QuotaDelta {
                storage_gb: 50.0,
                ..Default::default()
            },
        )
        .unwrap();
        quota::apply_updates(&client, &updates).await.unwrap();
    }
}

/// Archived-to-live migration against a mocked inventory
mod migration_tests {
    use super::*;
    use miqctl::prompt::AutoConfirm;
    use miqctl::resource::migrate::{execute_migration, plan_migration, StepStatus};

    async fn mount_inventory(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .and(query_param("filter[]", "name='web01'"))
            .and(query_param("filter[]", "power_state='unknown'"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(json!([vm(server, 9, "web01", "unknown")]))),
            )
            .with_priority(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .and(query_param("filter[]", "name='web01'"))
            .and(query_param("filter[]", "power_state='on'"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(json!([vm(server, 4, "web01", "on")]))),
            )
            .with_priority(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/services"))
            .and(query_param("filter[]", "name='VM - web01'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{
                "href": format!("{}/api/services/12", server.uri()),
                "name": "VM - web01",
            }]))))
            .with_priority(1)
            .mount(server)
            .await;

        mount_empty_collection(server, "vms").await;
        mount_empty_collection(server, "services").await;

        Mock::given(method("GET"))
            .and(path("/api/vms/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "web01",
                "description": "Payroll frontend",
                "tags": [
                    {"name": "/managed/vmtype/cloud"},
                    {"name": "/managed/location/b7"},
                ],
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/vms/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "web01",
                "tags": [{"name": "/managed/location/b7"}],
            })))
            .mount(server)
            .await;
    }

    /// Test the plan lists only what the live VM lacks
    #[tokio::test]
    async fn test_plan() {
        let server = MockServer::start().await;
        mount_inventory(&server).await;

        let client = client_for(&server, Duration::from_secs(5));
        let plan = plan_migration(&client, "web01").await.unwrap();

        assert!(plan.archived.href.ends_with("/api/vms/9"));
        assert!(plan.live.href.ends_with("/api/vms/4"));
        assert_eq!(plan.tag_changes, vec![("vmtype".to_string(), "cloud".to_string())]);
        assert_eq!(plan.description.as_deref(), Some("Payroll frontend"));
        assert_eq!(plan.service_rename.as_deref(), Some("VM - WEB01"));
        assert!(plan.has_changes());
    }

    /// Test a confirmed run applies every step and deletes the archived VM last
    #[tokio::test]
    async fn test_execute_confirmed() {
        let server = MockServer::start().await;
        mount_inventory(&server).await;

        Mock::given(method("POST"))
            .and(path("/api/vms/4/tags"))
            .and(body_json(json!({
                "action": "assign",
                "resource": {"name": "cloud", "category": "vmtype"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/vms/4"))
            .and(body_json(json!({
                "action": "edit",
                "resource": {"description": "Payroll frontend"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "4"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/services/12"))
            .and(body_json(json!({
                "action": "edit",
                "resource": {"name": "VM - WEB01"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "12"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/api/vms/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let plan = plan_migration(&client, "web01").await.unwrap();
        let report = execute_migration(&client, &plan, &mut AutoConfirm(true)).await;

        assert!(!report.has_failures());
        assert_eq!(report.steps.len(), 4);
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Applied));
        assert!(report.finished_at >= report.started_at);
    }

    /// Test declining every prompt sends no edits
    #[tokio::test]
    async fn test_execute_declined() {
        let server = MockServer::start().await;
        mount_inventory(&server).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let plan = plan_migration(&client, "web01").await.unwrap();
        let report = execute_migration(&client, &plan, &mut AutoConfirm(false)).await;

        assert!(report.steps.iter().all(|s| s.status == StepStatus::Declined));
    }

    /// Test a failed edit keeps the archived VM
    #[tokio::test]
    async fn test_failure_keeps_archived_vm() {
        let server = MockServer::start().await;
        mount_inventory(&server).await;

        Mock::given(method("POST"))
            .and(path("/api/vms/4/tags"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "invalid tag"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .with_priority(10)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let plan = plan_migration(&client, "web01").await.unwrap();
        let report = execute_migration(&client, &plan, &mut AutoConfirm(true)).await;

        assert!(report.has_failures());
        assert!(matches!(report.steps[0].status, StepStatus::Failed(_)));
        assert!(matches!(report.steps[3].status, StepStatus::Skipped(_)));
    }
}
