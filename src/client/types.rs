//! Caller identity types

use crate::types::{IdType, OptionStringExt, Region};
use serde::{Deserialize, Serialize};

/// Response of `GET /whoami/v1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    /// Id of the partner, organization or tenant the credentials belong to
    pub id: String,

    /// Kind of entity `id` refers to
    pub id_type: IdType,

    /// Hosts to send subsequent requests to
    #[serde(default)]
    pub api_hosts: ApiHosts,
}

/// API hosts returned by whoami
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHosts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_region: Option<String>,
}

/// Identity attached to every scoped request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Kind of entity
    pub id_type: IdType,
    /// Entity id, sent in the header named by `id_type`
    pub id: String,
    /// Host that serves this entity's data
    pub api_host: String,
}

impl Scope {
    /// Scope for a single tenant on its regional host
    pub fn tenant(id: impl Into<String>, api_host: impl Into<String>) -> Self {
        Self {
            id_type: IdType::Tenant,
            id: id.into(),
            api_host: api_host.into(),
        }
    }

    /// Scope of the caller described by `whoami`
    ///
    /// Tenants are served from their data region; partners and organizations
    /// from the global host. `fallback_host` is used when whoami omits one.
    pub fn from_whoami(whoami: &WhoAmI, fallback_host: &str) -> Self {
        let host = match whoami.id_type {
            IdType::Tenant => whoami.api_hosts.data_region.clone(),
            IdType::Partner | IdType::Organization => whoami.api_hosts.global.clone(),
        };

        Self {
            id_type: whoami.id_type,
            id: whoami.id.clone(),
            api_host: host
                .none_if_empty()
                .unwrap_or_else(|| fallback_host.to_string()),
        }
    }

    /// Name of the header carrying the id
    pub fn header_name(&self) -> &'static str {
        self.id_type.header_name()
    }

    /// Region of the API host, if it is a known regional host
    pub fn region(&self) -> Option<Region> {
        Region::from_url(&self.api_host).ok()
    }
}
