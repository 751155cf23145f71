//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → token → whoami → paginated list

use serde::Deserialize;
use serde_json::json;
use sophos_central::pagination::{
    FetchContext, PageFetchPipeline, Pages, Paginator, RawPageBatch,
};
use sophos_central::http::{HttpClient, HttpClientConfig, PageRequest};
use sophos_central::{CentralClient, ClientConfig, Error, IdType};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Endpoint {
    id: String,
    hostname: String,
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::from_yaml(&format!(
        r#"
client_id: test-client
client_secret: test-secret
token_url: "{uri}/api/v2/oauth2/token"
global_url: "{uri}"
http:
  max_retries: 0
  rate_limit:
    enabled: false
pagination:
  concurrency: 2
"#,
        uri = server.uri()
    ))
    .unwrap()
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v2/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("scope=token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "central-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_whoami(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/whoami/v1"))
        .and(header("Authorization", "Bearer central-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tenant-42",
            "idType": "tenant",
            "apiHosts": { "global": server.uri(), "dataRegion": server.uri() }
        })))
        .mount(server)
        .await;
}

fn endpoints(range: std::ops::RangeInclusive<u32>) -> Vec<serde_json::Value> {
    range
        .map(|n| json!({ "id": format!("ep-{n}"), "hostname": format!("host-{n}") }))
        .collect()
}

// ============================================================================
// End-to-end Tests
// ============================================================================

#[tokio::test]
async fn test_list_all_end_to_end() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_whoami(&server).await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints"))
        .and(query_param("pageTotal", "true"))
        .and(query_param("view", "basic"))
        .and(query_param_is_missing("page"))
        .and(header("X-Tenant-ID", "tenant-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": endpoints(1..=2),
            "pages": { "current": 1, "size": 2, "total": 3, "items": 5, "maxSize": 2 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    for (page, items) in [("2", endpoints(3..=4)), ("3", endpoints(5..=5))] {
        Mock::given(method("GET"))
            .and(path("/endpoint/v1/endpoints"))
            .and(query_param("page", page))
            .and(query_param("view", "basic"))
            .and(header("X-Tenant-ID", "tenant-42"))
            .and(header("Authorization", "Bearer central-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": items,
                "pages": { "current": page.parse::<u32>().unwrap(), "total": 3, "items": 5, "maxSize": 2 }
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut client = CentralClient::new(&config_for(&server)).unwrap();
    let whoami = client.whoami().await.unwrap();
    assert_eq!(whoami.id_type, IdType::Tenant);

    let collected = client
        .list_all::<Endpoint>(
            "/endpoint/v1/endpoints",
            &[("view".to_string(), "basic".to_string())],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(collected.is_complete());
    let mut ids: Vec<String> = collected
        .response
        .items
        .iter()
        .map(|e| e.id.clone())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["ep-1", "ep-2", "ep-3", "ep-4", "ep-5"]);
    assert_eq!(collected.response.items[0].hostname, "host-1");
    assert_eq!(collected.response.pages.total, Some(3));
}

#[tokio::test]
async fn test_tenant_client_list_first_page() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints"))
        .and(header("X-Tenant-ID", "tenant-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": endpoints(1..=1),
            "pages": { "current": 1, "size": 1, "total": 4, "items": 4, "maxSize": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CentralClient::new(&config_for(&server))
        .unwrap()
        .tenant("tenant-7", server.uri())
        .unwrap();

    let page = client
        .list::<Endpoint>("/endpoint/v1/endpoints", &[])
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert!(page.pages.has_more());
}

#[tokio::test]
async fn test_token_failure_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_client" })))
        .mount(&server)
        .await;

    let mut client = CentralClient::new(&config_for(&server)).unwrap();
    let err = client.whoami().await.unwrap_err();
    assert!(matches!(err, Error::OAuth2 { .. }));
}

#[test]
fn test_client_rejects_invalid_config() {
    let err = CentralClient::new(&ClientConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}

// ============================================================================
// Pipeline over real HTTP
// ============================================================================

#[tokio::test]
async fn test_pipeline_over_http_client() {
    let server = MockServer::start().await;

    for page in 2..=4 {
        Mock::given(method("GET"))
            .and(path("/common/v1/items"))
            .and(query_param("page", page.to_string()))
            .and(header("X-Partner-ID", "partner-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("page-{page}")))
            .expect(1)
            .mount(&server)
            .await;
    }

    let http = HttpClient::with_config(HttpClientConfig::builder().no_rate_limit().build()).unwrap();
    let request = PageRequest::get(format!("{}/common/v1/items?page=1", server.uri()))
        .header("X-Partner-ID", "partner-1");
    let pages = Pages {
        current: Some(1),
        size: Some(10),
        total: Some(4),
        items: Some(35),
        max_size: Some(10),
        ..Pages::default()
    };
    let context = FetchContext::new(request, pages).unwrap();

    let batch: RawPageBatch = Paginator::new(3)
        .fetch_remaining(&http, &context, &CancellationToken::new())
        .await;

    let mut bodies: Vec<String> = batch
        .into_pages()
        .into_iter()
        .map(|b| String::from_utf8(b.to_vec()).unwrap())
        .collect();
    bodies.sort();
    assert_eq!(bodies, vec!["page-2", "page-3", "page-4"]);
    assert_eq!(PageFetchPipeline::new(3).concurrency(), 3);
}
