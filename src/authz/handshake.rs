use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use super::config::HandshakeConfig;

/// Resolves the permissions granted to a list of permission groups.
#[async_trait]
pub trait GroupPermissionLookup: Send + Sync {
    async fn get_permission_by_groups(&self, groups: &[String]) -> Result<Vec<String>>;
}

#[derive(Serialize)]
struct GroupsBody<'a> {
    groups: &'a [String],
}

/// Asks the handshake service over HTTP.
pub struct HandshakeLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl HandshakeLookup {
    const PATH: &'static str = "/handshake/auth/permission-groups/getPermission";

    pub fn new(cfg: &HandshakeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("build handshake http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}{}/{}", cfg.url, Self::PATH, cfg.app_type),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GroupPermissionLookup for HandshakeLookup {
    async fn get_permission_by_groups(&self, groups: &[String]) -> Result<Vec<String>> {
        debug!("Lookup permissions of groups {groups:?} from '{}'", self.endpoint);
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&GroupsBody { groups })
            .send()
            .await
            .context("send handshake request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("handshake service responded with status {status}");
        }

        let permissions: Vec<String> = resp
            .json()
            .await
            .context("decode handshake response as a string list")?;
        Ok(permissions)
    }
}
