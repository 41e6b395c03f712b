//! Read-only catalog: images, locations, profiles and the account

use crate::client::WebdockClient;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerImage {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub web_server: Option<String>,
    #[serde(default)]
    pub php_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLocation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    #[serde(default)]
    pub cores: i64,
    #[serde(default)]
    pub threads: i64,
}

/// Hardware profile a server can be created with or resized to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ram: i64,
    #[serde(default)]
    pub disk: i64,
    #[serde(default)]
    pub cpu: Cpu,
    #[serde(default)]
    pub price: Price,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInformation {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_avatar: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub is_team_member: bool,
    #[serde(default)]
    pub team_leader: String,
    #[serde(default)]
    pub account_balance: String,
    #[serde(default)]
    pub account_balance_raw: String,
    #[serde(default)]
    pub account_balance_raw_currency: String,
}

#[derive(Serialize)]
struct ProfilesQuery<'a> {
    #[serde(rename = "locationId")]
    location_id: &'a str,
}

/// Catalog endpoints
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_images(&self) -> Result<Vec<ServerImage>>;

    async fn list_locations(&self) -> Result<Vec<ServerLocation>>;

    /// Profiles, optionally restricted to one location
    async fn list_profiles(&self, location_id: Option<&str>) -> Result<Vec<ServerProfile>>;

    async fn account_information(&self) -> Result<AccountInformation>;
}

#[async_trait]
impl CatalogApi for WebdockClient {
    async fn list_images(&self) -> Result<Vec<ServerImage>> {
        let response = self
            .send("get images", self.request(Method::GET, "images"))
            .await?;
        Self::decode("get images", response).await
    }

    async fn list_locations(&self) -> Result<Vec<ServerLocation>> {
        let response = self
            .send("get locations", self.request(Method::GET, "locations"))
            .await?;
        Self::decode("get locations", response).await
    }

    async fn list_profiles(&self, location_id: Option<&str>) -> Result<Vec<ServerProfile>> {
        let mut request = self.request(Method::GET, "profiles");
        if let Some(location_id) = location_id {
            request = request.query(&ProfilesQuery { location_id });
        }
        let response = self.send("get profiles", request).await?;
        Self::decode("get profiles", response).await
    }

    async fn account_information(&self) -> Result<AccountInformation> {
        let request = self.request(Method::GET, "account/accountInformation");
        let response = self.send("get account information", request).await?;
        Self::decode("get account information", response).await
    }
}
