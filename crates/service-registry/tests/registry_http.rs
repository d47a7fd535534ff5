//! End-to-end tests of the registry HTTP service through `RegistryClient`

use chrono::{Duration, Utc};
use futures::future::join_all;
use service_registry::{
    Error, ListFilter, RegistrationRequest, ServiceRecord, ServiceStatus, ServiceType,
};

mod common;
use common::TestRegistry;

fn relay(service_id: &str, address: &str) -> RegistrationRequest {
    RegistrationRequest::new(service_id, ServiceType::McpServer, address, ["generate_text"])
}

#[tokio::test]
async fn test_register_get_round_trip() {
    let registry = TestRegistry::start(90).await;
    let client = registry.client();

    let request = relay("relay-a", "http://relay-a:8000").with_status(ServiceStatus::Starting);
    let stored = client.register(&request).await.unwrap();
    let fetched = client.get("relay-a").await.unwrap();

    assert_eq!(fetched.service_id, request.service_id);
    assert_eq!(fetched.service_type, request.service_type);
    assert_eq!(fetched.address, request.address);
    assert_eq!(fetched.capabilities, stored.capabilities);
    assert!(fetched.has_capability("generate_text"));
    assert_eq!(fetched.status, ServiceStatus::Starting);

    registry.stop().await;
}

#[tokio::test]
async fn test_concurrent_registration_last_write_wins() {
    let registry = TestRegistry::start(90).await;
    let client = registry.client();

    let statuses = [
        ServiceStatus::Starting,
        ServiceStatus::Healthy,
        ServiceStatus::Unhealthy,
        ServiceStatus::Unknown,
    ];
    let requests: Vec<RegistrationRequest> = (0..16)
        .map(|i| {
            RegistrationRequest::new(
                "relay-a",
                ServiceType::McpServer,
                format!("http://relay-{i}:8000"),
                [format!("capability_{i}"), format!("writer_{i}")],
            )
            .with_status(statuses[i % statuses.len()])
        })
        .collect();

    let results = join_all(requests.iter().map(|request| {
        let client = client.clone();
        async move { client.register(request).await }
    }))
    .await;
    assert!(results.iter().all(|r| r.is_ok()));

    assert_eq!(registry.store.len(), 1);
    let record = client.get("relay-a").await.unwrap();

    // Every field comes from the same writer
    let writer = requests
        .iter()
        .find(|r| r.address == record.address)
        .expect("address from an unknown writer");
    assert!(record.capabilities.iter().eq(writer.capabilities.iter()));
    assert_eq!(Some(record.status), writer.status);

    registry.stop().await;
}

#[tokio::test]
async fn test_ids_with_reserved_characters() {
    let registry = TestRegistry::start(90).await;
    let client = registry.client();

    for id in ["relay/a", "relay?x", "relay#1", "relay a", "relay%2Fb"] {
        client.register(&relay(id, "http://a")).await.unwrap();

        assert_eq!(client.get(id).await.unwrap().service_id, id);
        let updated = client
            .update_status(id, ServiceStatus::Unhealthy)
            .await
            .unwrap();
        assert_eq!(updated.status, ServiceStatus::Unhealthy);
        assert_eq!(client.heartbeat(id).await.unwrap().service_id, id);

        client.deregister(id).await.unwrap();
        assert!(registry.store.get(id).is_err(), "{id} still stored");
    }
    assert!(registry.store.is_empty());

    let err = client.register(&relay("..", "http://a")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    registry.stop().await;
}

#[tokio::test]
async fn test_deregister_is_idempotent() {
    let registry = TestRegistry::start(90).await;
    let client = registry.client();

    client.register(&relay("relay-a", "http://a")).await.unwrap();
    client.deregister("relay-a").await.unwrap();
    client.deregister("relay-a").await.unwrap();
    client.deregister("never-registered").await.unwrap();

    assert!(matches!(
        client.get("relay-a").await,
        Err(Error::ServiceNotFound(id)) if id == "relay-a"
    ));
    assert!(registry.store.is_empty());

    registry.stop().await;
}

#[tokio::test]
async fn test_stale_records_hidden_from_listing() {
    let registry = TestRegistry::start(90).await;
    let client = registry.client();

    client.register(&relay("fresh", "http://fresh")).await.unwrap();
    registry.store.put(ServiceRecord {
        last_seen: Utc::now() - Duration::seconds(600),
        ..ServiceRecord::from_registration(relay("stale", "http://stale"), Utc::now())
    });

    let listed = client
        .list(&ListFilter::capability("generate_text"), None)
        .await
        .unwrap();
    let ids: Vec<_> = listed.iter().map(|r| r.service_id.as_str()).collect();
    assert_eq!(ids, vec!["fresh"]);

    // Explicit lookup ignores staleness
    assert_eq!(client.get("stale").await.unwrap().address, "http://stale");

    client.heartbeat("stale").await.unwrap();
    let listed = client.list(&ListFilter::default(), None).await.unwrap();
    assert_eq!(listed.len(), 2);

    registry.stop().await;
}

#[tokio::test]
async fn test_status_updates_and_errors() {
    let registry = TestRegistry::start(90).await;
    let client = registry.client();

    client.register(&relay("relay-a", "http://a")).await.unwrap();
    let updated = client
        .update_status("relay-a", ServiceStatus::Unhealthy)
        .await
        .unwrap();
    assert_eq!(updated.status, ServiceStatus::Unhealthy);

    assert!(matches!(
        client.update_status("missing", ServiceStatus::Healthy).await,
        Err(Error::ServiceNotFound(_))
    ));
    assert!(matches!(
        client.register(&relay("", "http://a")).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        client.heartbeat("missing").await,
        Err(Error::ServiceNotFound(_))
    ));

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.services_count, 1);

    registry.stop().await;
}

#[tokio::test]
async fn test_unreachable_registry_is_transport_error() {
    let registry = TestRegistry::start(90).await;
    let client = registry.client();
    registry.stop().await;

    let err = client.health().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert_eq!(err.code(), "upstream_error");
}
