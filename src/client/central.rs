//! Sophos Central API client

use super::types::{Scope, WhoAmI};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, PageRequest};
use crate::pagination::{
    Collected, ListResponse, Paginator, PAGE_SIZE_PARAM, PAGE_TOTAL_PARAM,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Client for the Sophos Central REST API
///
/// Call [`CentralClient::whoami`] first to learn which entity the
/// credentials belong to, or derive a tenant client with
/// [`CentralClient::tenant`].
#[derive(Debug, Clone)]
pub struct CentralClient {
    http: HttpClient,
    global_url: String,
    scope: Option<Scope>,
    paginator: Paginator,
    page_size: Option<u32>,
}

impl CentralClient {
    /// Create a client from validated configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_auth(config.http_client_config(), config.auth_config())?;

        Ok(Self::with_http(http, &config.global_url)
            .with_concurrency(config.pagination.concurrency)
            .with_page_size(config.pagination.page_size))
    }

    /// Create a client around an existing HTTP client
    pub fn with_http(http: HttpClient, global_url: impl Into<String>) -> Self {
        Self {
            http,
            global_url: global_url.into(),
            scope: None,
            paginator: Paginator::default(),
            page_size: None,
        }
    }

    /// Set how many pages are fetched at once
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.paginator = Paginator::new(concurrency);
        self
    }

    /// Set the page size requested on first pages
    #[must_use]
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// The underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Scope attached to requests, if known
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Scope attached to requests, failing if whoami has not run
    pub fn identity(&self) -> Result<&Scope> {
        self.scope.as_ref().ok_or(Error::IdentityUnknown)
    }

    /// Identify the caller and scope subsequent requests to it
    pub async fn whoami(&mut self) -> Result<WhoAmI> {
        let url = format!("{}/whoami/v1", self.global_url.trim_end_matches('/'));
        let whoami: WhoAmI = self.http.get_json(&url).await?;
        let scope = Scope::from_whoami(&whoami, &self.global_url);

        info!(
            id = %whoami.id,
            id_type = ?whoami.id_type,
            api_host = %scope.api_host,
            "Identified caller"
        );

        self.scope = Some(scope);
        Ok(whoami)
    }

    /// Derive a client scoped to one tenant
    ///
    /// `api_host` is the tenant's data-region host as reported by the
    /// tenant listing or whoami.
    pub fn tenant(&self, tenant_id: impl Into<String>, api_host: impl Into<String>) -> Result<Self> {
        let api_host = api_host.into();
        Url::parse(&api_host).map_err(|e| Error::invalid_value("api_host", e.to_string()))?;

        let mut client = self.clone();
        client.scope = Some(Scope::tenant(tenant_id, api_host));
        Ok(client)
    }

    /// Request for the first page of a list endpoint
    ///
    /// `pageTotal=true` is always requested so the response carries the
    /// totals pagination relies on.
    pub fn list_request(&self, path: &str, query: &[(String, String)]) -> Result<PageRequest> {
        let host = self
            .scope
            .as_ref()
            .map_or(self.global_url.as_str(), |scope| scope.api_host.as_str());
        let mut url = Url::parse(host)?.join(path)?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if !has_param(query, PAGE_TOTAL_PARAM) {
                pairs.append_pair(PAGE_TOTAL_PARAM, "true");
            }
            if let Some(size) = self.page_size {
                if !has_param(query, PAGE_SIZE_PARAM) {
                    pairs.append_pair(PAGE_SIZE_PARAM, &size.to_string());
                }
            }
        }

        let mut request = PageRequest::get(String::from(url)).header("Accept", "application/json");
        if let Some(scope) = &self.scope {
            request = request.header(scope.header_name(), scope.id.as_str());
        }
        Ok(request)
    }

    /// Fetch the first page of a list endpoint
    pub async fn list<T>(&self, path: &str, query: &[(String, String)]) -> Result<ListResponse<T>>
    where
        T: DeserializeOwned + Send,
    {
        let request = self.list_request(path, query)?;
        self.fetch_page(&request).await
    }

    /// Fetch every page of a list endpoint and merge the items
    ///
    /// Pages that fail after the first are dropped and counted in the
    /// result. Cancelling `cancel` returns the pages merged so far.
    pub async fn list_all<T>(
        &self,
        path: &str,
        query: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<Collected<ListResponse<T>>>
    where
        T: DeserializeOwned + Send,
    {
        let request = self.list_request(path, query)?;
        let first: ListResponse<T> = self.fetch_page(&request).await?;

        if !first.pages.has_more() {
            debug!(path, items = first.items.len(), "Single page list");
            return Ok(Collected::single(first));
        }

        self.paginator
            .collect_remaining(&self.http, &request, first, cancel)
            .await
    }

    async fn fetch_page<T>(&self, request: &PageRequest) -> Result<ListResponse<T>>
    where
        T: DeserializeOwned + Send,
    {
        let body = self.http.execute(request, None).await?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::decode(format!("{}: {}", request.url, e)))
    }
}

fn has_param(query: &[(String, String)], key: &str) -> bool {
    query.iter().any(|(k, _)| k == key)
}
