use crate::output;
use webdock_api::WebdockClient;
use webdock_provider::{Provider, ProviderError, PublicKeySpec, Resource};

pub async fn create(provider: &Provider<WebdockClient>, spec: &PublicKeySpec) -> anyhow::Result<()> {
    output::status(&format!("Adding public key '{}'", spec.name));
    let state = provider.public_keys().create(spec).await?;
    output::success(&format!("Public key '{}' added (id {})", spec.name, state.id));
    output::json(&state)
}

pub async fn get(provider: &Provider<WebdockClient>, id: &str) -> anyhow::Result<()> {
    let state = provider
        .public_keys()
        .read(id)
        .await?
        .ok_or_else(|| ProviderError::NotFound {
            resource_type: "public_key",
            id: id.to_string(),
        })?;
    output::json(&state)
}

pub async fn delete(provider: &Provider<WebdockClient>, id: &str) -> anyhow::Result<()> {
    provider.public_keys().delete(id).await?;
    output::success(&format!("Public key {} deleted", id));
    Ok(())
}
