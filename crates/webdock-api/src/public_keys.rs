//! Account public keys
//!
//! Key operations complete synchronously; no action handle is involved.

use crate::client::WebdockClient;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePublicKeyRequest {
    pub name: String,
    pub public_key: String,
}

#[async_trait]
pub trait PublicKeyApi: Send + Sync {
    async fn list_public_keys(&self) -> Result<Vec<PublicKey>>;

    async fn create_public_key(&self, body: &CreatePublicKeyRequest) -> Result<PublicKey>;

    async fn delete_public_key(&self, id: i64) -> Result<()>;
}

#[async_trait]
impl PublicKeyApi for WebdockClient {
    async fn list_public_keys(&self) -> Result<Vec<PublicKey>> {
        let request = self.request(Method::GET, "account/publicKeys");
        let response = self.send("get public keys", request).await?;
        Self::decode("get public keys", response).await
    }

    async fn create_public_key(&self, body: &CreatePublicKeyRequest) -> Result<PublicKey> {
        let request = self.request(Method::POST, "account/publicKeys").json(body);
        let response = self.send("create public key", request).await?;
        Self::decode("create public key", response).await
    }

    async fn delete_public_key(&self, id: i64) -> Result<()> {
        let path = format!("account/publicKeys/{}", id);
        self.send("delete public key", self.request(Method::DELETE, &path))
            .await?;
        Ok(())
    }
}
