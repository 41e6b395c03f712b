//! Shell users on a server

use crate::action::{ActionHandle, Tracked};
use crate::client::{WebdockClient, segment};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellUser {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub shell: String,
    /// Ids of account public keys installed for this user
    #[serde(default)]
    pub public_keys: Vec<i64>,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShellUserRequest {
    pub username: String,
    pub password: String,
    pub group: String,
    pub shell: String,
    pub public_keys: Vec<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeysBody<'a> {
    public_keys: &'a [i64],
}

/// Shell user endpoints; mutations start platform actions
#[async_trait]
pub trait ShellUserApi: Send + Sync {
    async fn list_shell_users(&self, server_slug: &str) -> Result<Vec<ShellUser>>;

    async fn create_shell_user(
        &self,
        server_slug: &str,
        body: &CreateShellUserRequest,
    ) -> Result<Tracked<ShellUser>>;

    async fn delete_shell_user(&self, server_slug: &str, id: i64) -> Result<ActionHandle>;

    /// Replace the user's public keys
    async fn update_shell_user_keys(
        &self,
        server_slug: &str,
        id: i64,
        public_keys: &[i64],
    ) -> Result<Tracked<ShellUser>>;
}

#[async_trait]
impl ShellUserApi for WebdockClient {
    async fn list_shell_users(&self, server_slug: &str) -> Result<Vec<ShellUser>> {
        let path = format!("servers/{}/shellUsers", segment(server_slug));
        let response = self
            .send("get shell users", self.request(Method::GET, &path))
            .await?;
        Self::decode("get shell users", response).await
    }

    async fn create_shell_user(
        &self,
        server_slug: &str,
        body: &CreateShellUserRequest,
    ) -> Result<Tracked<ShellUser>> {
        let path = format!("servers/{}/shellUsers", segment(server_slug));
        let request = self.request(Method::POST, &path).json(body);
        let response = self.send("create shell user", request).await?;
        let handle = Self::handle(&response);
        let user = Self::decode("create shell user", response).await?;
        Ok(Tracked::new(user, handle))
    }

    async fn delete_shell_user(&self, server_slug: &str, id: i64) -> Result<ActionHandle> {
        let path = format!("servers/{}/shellUsers/{}", segment(server_slug), id);
        let response = self
            .send("delete shell user", self.request(Method::DELETE, &path))
            .await?;
        Ok(Self::handle(&response))
    }

    async fn update_shell_user_keys(
        &self,
        server_slug: &str,
        id: i64,
        public_keys: &[i64],
    ) -> Result<Tracked<ShellUser>> {
        let path = format!("servers/{}/shellUsers/{}", segment(server_slug), id);
        let request = self
            .request(Method::PATCH, &path)
            .json(&PublicKeysBody { public_keys });
        let response = self.send("update shell user", request).await?;
        let handle = Self::handle(&response);
        let user = Self::decode("update shell user", response).await?;
        Ok(Tracked::new(user, handle))
    }
}
