use crate::output;
use webdock_api::WebdockClient;
use webdock_provider::{Provider, ProviderError, Resource, ResourceState, ServerSpec};

/// Fields `server update` can change in place
pub struct ServerChanges {
    pub name: Option<String>,
    pub profile: Option<String>,
    pub image: Option<String>,
}

pub async fn create(provider: &Provider<WebdockClient>, spec: &ServerSpec) -> anyhow::Result<()> {
    output::status(&format!(
        "Creating server '{}' ({} in {})",
        spec.name, spec.profile_slug, spec.location_id
    ));
    output::status(&format!(
        "Waiting for the platform and port {} (Ctrl-C to stop waiting)",
        provider.settings().server_up_port
    ));

    let state = provider.servers().create(spec).await?;

    output::success(&format!("Server '{}' is up", state.id));
    output::json(&state)
}

pub async fn get(provider: &Provider<WebdockClient>, slug: &str) -> anyhow::Result<()> {
    let state = fetch(provider, slug).await?;
    output::json(&state)
}

pub async fn update(
    provider: &Provider<WebdockClient>,
    slug: &str,
    changes: ServerChanges,
) -> anyhow::Result<()> {
    let state = fetch(provider, slug).await?;
    let current = current_spec(&state);
    let desired = apply(&current, changes);

    if desired == current {
        output::warn("Nothing to change");
        return output::json(&state);
    }

    output::status(&format!("Updating server '{}'", slug));
    let state = provider.servers().update(slug, &current, &desired).await?;

    output::success(&format!("Server '{}' updated", slug));
    output::json(&state)
}

pub async fn delete(provider: &Provider<WebdockClient>, slug: &str) -> anyhow::Result<()> {
    output::status(&format!("Deleting server '{}'", slug));
    provider.servers().delete(slug).await?;
    output::success(&format!("Server '{}' deleted", slug));
    Ok(())
}

async fn fetch(provider: &Provider<WebdockClient>, slug: &str) -> anyhow::Result<ResourceState> {
    provider.servers().read(slug).await?.ok_or_else(|| {
        ProviderError::NotFound {
            resource_type: "server",
            id: slug.to_string(),
        }
        .into()
    })
}

/// Spec as the platform currently reflects it
fn current_spec(state: &ResourceState) -> ServerSpec {
    let text = |key: &str| state.get_str(key).unwrap_or_default().to_string();
    let optional = |key: &str| state.get_str(key).map(str::to_string);

    ServerSpec {
        name: text("name"),
        location_id: text("location_id"),
        profile_slug: text("profile_slug"),
        image_slug: optional("image_slug"),
        virtualization: optional("virtualization"),
        ..Default::default()
    }
}

fn apply(current: &ServerSpec, changes: ServerChanges) -> ServerSpec {
    ServerSpec {
        name: changes.name.unwrap_or_else(|| current.name.clone()),
        profile_slug: changes.profile.unwrap_or_else(|| current.profile_slug.clone()),
        image_slug: changes.image.or_else(|| current.image_slug.clone()),
        ..current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn state() -> ResourceState {
        ResourceState::new("web01", "server")
            .with_attribute("name", "Web 01")
            .with_attribute("location_id", "dk")
            .with_attribute("profile_slug", "webdockbit-2022")
            .with_attribute("image_slug", "ubuntu2204")
            .with_attribute("virtualization", Value::Null)
    }

    #[test]
    fn test_current_spec_from_state() {
        let spec = current_spec(&state());
        assert_eq!(spec.name, "Web 01");
        assert_eq!(spec.location_id, "dk");
        assert_eq!(spec.image_slug.as_deref(), Some("ubuntu2204"));
        assert!(spec.virtualization.is_none());
        assert!(spec.slug.is_none());
    }

    #[test]
    fn test_apply_keeps_unchanged_fields() {
        let current = current_spec(&state());
        let desired = apply(
            &current,
            ServerChanges {
                name: None,
                profile: Some("webdockepyc-2022".to_string()),
                image: None,
            },
        );

        assert_eq!(desired.name, current.name);
        assert_eq!(desired.profile_slug, "webdockepyc-2022");
        assert_eq!(desired.image_slug, current.image_slug);
        assert_eq!(desired.location_id, current.location_id);
    }
}
