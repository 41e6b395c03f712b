use super::changed;
use crate::error::{ProviderError, Result};
use crate::provider::{Provider, Resource};
use crate::state::ResourceState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use webdock_api::{ApiError, CreatePublicKeyRequest, EventLog, PublicKey, PublicKeyApi};

pub const PUBLIC_KEY: &str = "public_key";

/// Desired account public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySpec {
    pub name: String,
    pub key: String,
}

pub fn public_key_state(key: &PublicKey) -> ResourceState {
    ResourceState::new(key.id.to_string(), PUBLIC_KEY)
        .with_attribute("name", key.name.as_str())
        .with_attribute("key", key.key.as_str())
        .with_attribute("created_at", json!(key.created))
}

/// Public key orchestrator
///
/// Key operations are synchronous on the platform side.
pub struct PublicKeyResource<'a, C> {
    provider: &'a Provider<C>,
}

impl<'a, C> PublicKeyResource<'a, C>
where
    C: PublicKeyApi + EventLog + 'static,
{
    pub(crate) fn new(provider: &'a Provider<C>) -> Self {
        Self { provider }
    }

    fn api_error(operation: &'static str, id: &str) -> impl FnOnce(ApiError) -> ProviderError {
        move |source| ProviderError::Api {
            operation,
            resource_type: PUBLIC_KEY,
            id: id.to_string(),
            source,
        }
    }
}

fn parse_id(id: &str) -> Result<i64> {
    id.parse().map_err(|_| ProviderError::InvalidId {
        resource_type: PUBLIC_KEY,
        id: id.to_string(),
    })
}

#[async_trait]
impl<C> Resource for PublicKeyResource<'_, C>
where
    C: PublicKeyApi + EventLog + 'static,
{
    type Spec = PublicKeySpec;

    fn resource_type(&self) -> &'static str {
        PUBLIC_KEY
    }

    async fn create(&self, spec: &PublicKeySpec) -> Result<ResourceState> {
        if spec.name.trim().is_empty() || spec.key.trim().is_empty() {
            return Err(ProviderError::InvalidSpec {
                resource_type: PUBLIC_KEY,
                message: "name and key are required".to_string(),
            });
        }

        let body = CreatePublicKeyRequest {
            name: spec.name.clone(),
            public_key: spec.key.clone(),
        };
        let key = self
            .provider
            .client()
            .create_public_key(&body)
            .await
            .map_err(Self::api_error("create", &spec.name))?;

        info!(id = key.id, name = %key.name, "public key created");
        Ok(public_key_state(&key))
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        let key_id = parse_id(id)?;
        let keys = self
            .provider
            .client()
            .list_public_keys()
            .await
            .map_err(Self::api_error("read", id))?;

        Ok(keys.iter().find(|k| k.id == key_id).map(public_key_state))
    }

    async fn update(
        &self,
        id: &str,
        current: &PublicKeySpec,
        desired: &PublicKeySpec,
    ) -> Result<ResourceState> {
        let fields = changed(&[
            ("name", current.name != desired.name),
            ("key", current.key != desired.key),
        ]);
        if !fields.is_empty() {
            return Err(ProviderError::ReplaceRequired {
                resource_type: PUBLIC_KEY,
                id: id.to_string(),
                fields,
            });
        }

        self.read(id).await?.ok_or_else(|| ProviderError::NotFound {
            resource_type: PUBLIC_KEY,
            id: id.to_string(),
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let key_id = parse_id(id)?;
        match self.provider.client().delete_public_key(key_id).await {
            Ok(()) => {
                info!(id = key_id, "public key deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(Self::api_error("delete", id)(e)),
        }
    }
}
