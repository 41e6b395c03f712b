//! Servers and their lifecycle actions

use crate::action::{ActionHandle, Tracked};
use crate::catalog::Price;
use crate::client::{WebdockClient, segment};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Server as returned by the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    /// Creation date/time
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub virtualization: Option<String>,
    #[serde(default)]
    pub web_server: Option<String>,
    /// Domain names; the first one is the main domain
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Last known snapshot runtime in seconds
    #[serde(default)]
    pub snapshot_run_time: i64,
    #[serde(rename = "SSHPasswordAuthEnabled", default)]
    pub ssh_password_auth_enabled: bool,
    #[serde(rename = "WordPressLockDown", default)]
    pub wordpress_lockdown: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerRequest {
    pub name: String,
    pub location_id: String,
    pub profile_slug: String,
    /// Either this or `snapshot_id` must be set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<i64>,
    /// Suggested slug; the platform may pick another one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// `container` or `kvm`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtualization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchServerRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinstallServerRequest {
    pub image_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeServerRequest {
    pub profile_slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSummaryItem {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub price: Price,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeSummaryTotal {
    #[serde(default)]
    pub sub_total: Price,
    #[serde(default)]
    pub vat: Price,
    #[serde(default)]
    pub total: Price,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeSummary {
    #[serde(default)]
    pub is_refund: bool,
    #[serde(default)]
    pub items: Vec<ChargeSummaryItem>,
    #[serde(default)]
    pub total: ChargeSummaryTotal,
}

/// Result of a resize dry run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResize {
    #[serde(default)]
    pub charge_summary: Option<ChargeSummary>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

#[derive(Serialize)]
struct StatusQuery<'a> {
    status: &'a str,
}

/// Server endpoints
///
/// Calls that start a platform action return its [`ActionHandle`]; the
/// action is not complete when the call returns.
#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn list_servers(&self, status: Option<&str>) -> Result<Vec<Server>>;

    async fn get_server(&self, slug: &str) -> Result<Server>;

    async fn create_server(&self, body: &CreateServerRequest) -> Result<Tracked<Server>>;

    async fn patch_server(&self, slug: &str, body: &PatchServerRequest) -> Result<Server>;

    async fn delete_server(&self, slug: &str) -> Result<ActionHandle>;

    async fn reinstall_server(
        &self,
        slug: &str,
        body: &ReinstallServerRequest,
    ) -> Result<ActionHandle>;

    async fn resize_server(&self, slug: &str, body: &ResizeServerRequest) -> Result<ActionHandle>;

    /// Price and warnings of a resize without performing it
    async fn resize_dry_run(&self, slug: &str, body: &ResizeServerRequest)
    -> Result<ServerResize>;
}

#[async_trait]
impl ServerApi for WebdockClient {
    async fn list_servers(&self, status: Option<&str>) -> Result<Vec<Server>> {
        let mut request = self.request(Method::GET, "servers");
        if let Some(status) = status {
            request = request.query(&StatusQuery { status });
        }
        let response = self.send("get servers", request).await?;
        Self::decode("get servers", response).await
    }

    async fn get_server(&self, slug: &str) -> Result<Server> {
        let path = format!("servers/{}", segment(slug));
        let response = self
            .send("get server", self.request(Method::GET, &path))
            .await?;
        Self::decode("get server", response).await
    }

    async fn create_server(&self, body: &CreateServerRequest) -> Result<Tracked<Server>> {
        let request = self.request(Method::POST, "servers").json(body);
        let response = self.send("create server", request).await?;
        let handle = Self::handle(&response);
        let server = Self::decode("create server", response).await?;
        Ok(Tracked::new(server, handle))
    }

    async fn patch_server(&self, slug: &str, body: &PatchServerRequest) -> Result<Server> {
        let path = format!("servers/{}", segment(slug));
        let request = self.request(Method::PATCH, &path).json(body);
        let response = self.send("update server", request).await?;
        Self::decode("update server", response).await
    }

    async fn delete_server(&self, slug: &str) -> Result<ActionHandle> {
        let path = format!("servers/{}", segment(slug));
        let response = self
            .send("delete server", self.request(Method::DELETE, &path))
            .await?;
        Ok(Self::handle(&response))
    }

    async fn reinstall_server(
        &self,
        slug: &str,
        body: &ReinstallServerRequest,
    ) -> Result<ActionHandle> {
        let path = format!("servers/{}/actions/reinstall", segment(slug));
        let request = self.request(Method::POST, &path).json(body);
        let response = self.send("reinstall server", request).await?;
        Ok(Self::handle(&response))
    }

    async fn resize_server(&self, slug: &str, body: &ResizeServerRequest) -> Result<ActionHandle> {
        let path = format!("servers/{}/actions/resize", segment(slug));
        let request = self.request(Method::POST, &path).json(body);
        let response = self.send("resize server", request).await?;
        Ok(Self::handle(&response))
    }

    async fn resize_dry_run(
        &self,
        slug: &str,
        body: &ResizeServerRequest,
    ) -> Result<ServerResize> {
        let path = format!("servers/{}/actions/resize/dryrun", segment(slug));
        let request = self.request(Method::POST, &path).json(body);
        let response = self.send("resize server dry run", request).await?;
        Self::decode("resize server dry run", response).await
    }
}
