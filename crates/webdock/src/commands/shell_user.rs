use crate::output;
use webdock_api::WebdockClient;
use webdock_provider::{Provider, ProviderError, Resource, ResourceState, ShellUserSpec};

pub async fn create(provider: &Provider<WebdockClient>, spec: &ShellUserSpec) -> anyhow::Result<()> {
    output::status(&format!(
        "Creating shell user '{}' on '{}'",
        spec.username, spec.server_slug
    ));

    let state = provider.shell_users().create(spec).await?;

    output::success(&format!("Shell user '{}' created", state.id));
    output::json(&state)
}

pub async fn get(provider: &Provider<WebdockClient>, id: &str) -> anyhow::Result<()> {
    let state = fetch(provider, id).await?;
    output::json(&state)
}

pub async fn set_keys(
    provider: &Provider<WebdockClient>,
    id: &str,
    keys: Vec<i64>,
) -> anyhow::Result<()> {
    let state = fetch(provider, id).await?;
    let current = current_spec(&state);
    let desired = current.clone().with_public_keys(keys);

    output::status(&format!(
        "Setting public keys of '{}' to {:?}",
        id, desired.public_keys
    ));
    let state = provider.shell_users().update(id, &current, &desired).await?;

    output::success(&format!("Shell user '{}' updated", id));
    output::json(&state)
}

pub async fn delete(provider: &Provider<WebdockClient>, id: &str) -> anyhow::Result<()> {
    output::status(&format!("Deleting shell user '{}'", id));
    provider.shell_users().delete(id).await?;
    output::success(&format!("Shell user '{}' deleted", id));
    Ok(())
}

async fn fetch(provider: &Provider<WebdockClient>, id: &str) -> anyhow::Result<ResourceState> {
    provider.shell_users().read(id).await?.ok_or_else(|| {
        ProviderError::NotFound {
            resource_type: "shell_user",
            id: id.to_string(),
        }
        .into()
    })
}

/// The password is write-only, so both sides of an update carry the same blank one
fn current_spec(state: &ResourceState) -> ShellUserSpec {
    let text = |key: &str| state.get_str(key).unwrap_or_default().to_string();
    let keys = state
        .get_attribute("public_keys")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    let mut spec = ShellUserSpec::new(text("server_slug"), text("username"), String::new())
        .with_public_keys(keys);
    spec.group = text("group");
    spec.shell = text("shell");
    spec
}
