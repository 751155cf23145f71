//! Tests for the Sophos Central client

use super::*;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use crate::types::{IdType, Region};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Endpoint {
    id: String,
}

fn mock_client(server: &MockServer) -> CentralClient {
    let config = HttpClientConfig::builder()
        .no_rate_limit()
        .max_retries(0)
        .build();
    CentralClient::with_http(HttpClient::with_config(config).unwrap(), server.uri())
}

fn tenant_client(server: &MockServer) -> CentralClient {
    mock_client(server).tenant("tenant-1", server.uri()).unwrap()
}

fn endpoint_page(ids: &[&str], current: u64, total: u64, items: u64) -> serde_json::Value {
    let items_json: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({
        "items": items_json,
        "pages": { "current": current, "size": ids.len(), "total": total, "items": items, "maxSize": 2 }
    })
}

fn sorted_ids(items: &[Endpoint]) -> Vec<String> {
    let mut ids: Vec<String> = items.iter().map(|e| e.id.clone()).collect();
    ids.sort();
    ids
}

// ============================================================================
// Identity Tests
// ============================================================================

#[tokio::test]
async fn test_whoami_tenant_uses_data_region() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/whoami/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "3b1ff9e4-4f3c-4b4f-9c1e-2a6b1c0c1e11",
            "idType": "tenant",
            "apiHosts": {
                "global": "https://api.central.sophos.com",
                "dataRegion": "https://api-eu01.central.sophos.com"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = mock_client(&server);
    assert!(matches!(client.identity(), Err(Error::IdentityUnknown)));

    let whoami = client.whoami().await.unwrap();
    assert_eq!(whoami.id_type, IdType::Tenant);

    let scope = client.identity().unwrap();
    assert_eq!(scope.header_name(), "X-Tenant-ID");
    assert_eq!(scope.api_host, "https://api-eu01.central.sophos.com");
    assert_eq!(scope.region(), Some(Region::Eu01));
}

#[tokio::test]
async fn test_whoami_partner_uses_global_host() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/whoami/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "partner-1",
            "idType": "partner",
            "apiHosts": { "global": "" }
        })))
        .mount(&server)
        .await;

    let mut client = mock_client(&server);
    client.whoami().await.unwrap();

    let scope = client.scope().unwrap();
    assert_eq!(scope.id_type, IdType::Partner);
    assert_eq!(scope.api_host, server.uri());
    assert_eq!(scope.region(), None);
}

#[tokio::test]
async fn test_whoami_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/whoami/v1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let mut client = mock_client(&server);
    let err = client.whoami().await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    assert!(client.scope().is_none());
}

#[test]
fn test_tenant_rejects_invalid_host() {
    let client = CentralClient::with_http(
        HttpClient::with_config(HttpClientConfig::default()).unwrap(),
        "https://api.central.sophos.com",
    );
    assert!(matches!(
        client.tenant("t", "not a host"),
        Err(Error::InvalidConfigValue { .. })
    ));
}

// ============================================================================
// Request Building Tests
// ============================================================================

#[test]
fn test_list_request_adds_page_total_and_scope() {
    let client = CentralClient::with_http(
        HttpClient::with_config(HttpClientConfig::default()).unwrap(),
        "https://api.central.sophos.com",
    )
    .with_page_size(Some(500))
    .tenant("tenant-1", "https://api-us03.central.sophos.com")
    .unwrap();

    let request = client
        .list_request(
            "/endpoint/v1/endpoints",
            &[("view".to_string(), "basic".to_string())],
        )
        .unwrap();

    assert_eq!(
        request.url,
        "https://api-us03.central.sophos.com/endpoint/v1/endpoints?view=basic&pageTotal=true&pageSize=500"
    );
    assert_eq!(
        request.headers.get("X-Tenant-ID"),
        Some(&"tenant-1".to_string())
    );
}

#[test]
fn test_list_request_keeps_explicit_page_params() {
    let client = CentralClient::with_http(
        HttpClient::with_config(HttpClientConfig::default()).unwrap(),
        "https://api.central.sophos.com",
    )
    .with_page_size(Some(500));

    let request = client
        .list_request(
            "/partner/v1/tenants",
            &[
                ("pageTotal".to_string(), "true".to_string()),
                ("pageSize".to_string(), "10".to_string()),
            ],
        )
        .unwrap();

    assert_eq!(
        request.url,
        "https://api.central.sophos.com/partner/v1/tenants?pageTotal=true&pageSize=10"
    );
    assert!(request.headers.get("X-Tenant-ID").is_none());
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_returns_first_page_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints"))
        .and(query_param("pageTotal", "true"))
        .and(header("X-Tenant-ID", "tenant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_page(&["a", "b"], 1, 2, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let page = tenant_client(&server)
        .list::<Endpoint>("/endpoint/v1/endpoints", &[])
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert!(page.pages.has_more());
}

#[tokio::test]
async fn test_list_all_fetches_every_offset_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_page(&["a", "b"], 1, 3, 5)))
        .expect(1)
        .mount(&server)
        .await;

    for (page, ids) in [("2", vec!["c", "d"]), ("3", vec!["e"])] {
        Mock::given(method("GET"))
            .and(path("/endpoint/v1/endpoints"))
            .and(query_param("page", page))
            .and(query_param("pageTotal", "true"))
            .and(header("X-Tenant-ID", "tenant-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_page(&ids, 0, 3, 5)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let collected = tenant_client(&server)
        .list_all::<Endpoint>("/endpoint/v1/endpoints", &[], &CancellationToken::new())
        .await
        .unwrap();

    assert!(collected.is_complete());
    assert_eq!(collected.pages_merged, 2);
    assert_eq!(
        sorted_ids(&collected.response.items),
        vec!["a", "b", "c", "d", "e"]
    );
    assert_eq!(collected.response.pages.current, Some(1));
}

#[tokio::test]
async fn test_list_all_page_size_below_max_size() {
    let server = MockServer::start().await;
    let page = |ids: &[&str], current: u64| {
        let items: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
        json!({
            "items": items,
            "pages": { "current": current, "size": 2, "total": 4, "items": 8, "maxSize": 100 }
        })
    };

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["a", "b"], 1)))
        .expect(1)
        .mount(&server)
        .await;

    for (n, ids) in [("2", ["c", "d"]), ("3", ["e", "f"]), ("4", ["g", "h"])] {
        Mock::given(method("GET"))
            .and(path("/endpoint/v1/endpoints"))
            .and(query_param("page", n))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page(&ids, n.parse().unwrap())),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let collected = tenant_client(&server)
        .list_all::<Endpoint>("/endpoint/v1/endpoints", &[], &CancellationToken::new())
        .await
        .unwrap();

    assert!(collected.is_complete());
    assert_eq!(collected.pages_merged, 3);
    assert_eq!(
        sorted_ids(&collected.response.items),
        vec!["a", "b", "c", "d", "e", "f", "g", "h"]
    );
}

#[tokio::test]
async fn test_list_all_drops_failed_page_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_page(&["a", "b"], 1, 3, 6)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_page(&["e", "f"], 3, 3, 6)))
        .mount(&server)
        .await;

    let client = CentralClient::with_http(
        HttpClient::with_config(HttpClientConfig::builder().no_rate_limit().max_retries(5).build())
            .unwrap(),
        server.uri(),
    );

    let collected = client
        .list_all::<Endpoint>("/endpoint/v1/endpoints", &[], &CancellationToken::new())
        .await
        .unwrap();

    assert!(!collected.is_complete());
    assert_eq!(collected.pages_dropped, 1);
    assert_eq!(
        sorted_ids(&collected.response.items),
        vec!["a", "b", "e", "f"]
    );
}

#[tokio::test]
async fn test_list_all_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/partner/v1/tenants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_page(&["a"], 1, 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let collected = mock_client(&server)
        .list_all::<Endpoint>("/partner/v1/tenants", &[], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collected.pages_merged, 0);
    assert_eq!(collected.into_inner().items.len(), 1);
}

#[tokio::test]
async fn test_list_all_follows_from_keys() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .and(query_param_is_missing("pageFromKey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "a" }],
            "pages": { "fromKey": "", "nextKey": "k2", "size": 1, "total": 2, "items": 2, "maxSize": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .and(query_param("pageFromKey", "k2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "b" }],
            "pages": { "fromKey": "k2", "size": 1, "total": 2, "items": 2, "maxSize": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collected = tenant_client(&server)
        .list_all::<Endpoint>("/common/v1/alerts", &[], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sorted_ids(&collected.response.items), vec!["a", "b"]);
}

#[tokio::test]
async fn test_list_all_from_key_without_totals_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "a" }],
            "pages": { "nextKey": "k2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = tenant_client(&server)
        .list_all::<Endpoint>("/common/v1/alerts", &[], &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(Error::Pagination { .. })));
}

#[tokio::test]
async fn test_list_undecodable_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let result = tenant_client(&server)
        .list::<Endpoint>("/endpoint/v1/endpoints", &[])
        .await;

    assert!(matches!(result, Err(Error::Decode { .. })));
}
