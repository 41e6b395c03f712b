use super::changed;
use crate::error::{ProviderError, Result, WaitError};
use crate::provider::{Provider, Resource};
use crate::state::ResourceState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use webdock_api::{
    CreateServerRequest, EventLog, PatchServerRequest, ReinstallServerRequest,
    ResizeServerRequest, Server, ServerApi,
};

pub const SERVER: &str = "server";

/// Desired server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    pub location_id: String,
    pub profile_slug: String,
    #[serde(default)]
    pub image_slug: Option<String>,
    #[serde(default)]
    pub snapshot_id: Option<i64>,
    /// Suggested slug; the platform decides the final one
    #[serde(default)]
    pub slug: Option<String>,
    /// `container` or `kvm`
    #[serde(default)]
    pub virtualization: Option<String>,
}

impl ServerSpec {
    /// Create needs a source; an existing server keeps whatever it was built from
    fn validate(&self) -> Result<()> {
        self.validate_identity()?;
        if self.image_slug.is_none() && self.snapshot_id.is_none() {
            return Err(ProviderError::InvalidSpec {
                resource_type: SERVER,
                message: "either image_slug or snapshot_id is required".to_string(),
            });
        }
        Ok(())
    }

    fn validate_identity(&self) -> Result<()> {
        let invalid = |message: &str| ProviderError::InvalidSpec {
            resource_type: SERVER,
            message: message.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is required"));
        }
        if self.location_id.trim().is_empty() {
            return Err(invalid("location_id is required"));
        }
        if self.profile_slug.trim().is_empty() {
            return Err(invalid("profile_slug is required"));
        }
        Ok(())
    }

    fn to_request(&self) -> CreateServerRequest {
        CreateServerRequest {
            name: self.name.clone(),
            location_id: self.location_id.clone(),
            profile_slug: self.profile_slug.clone(),
            image_slug: self.image_slug.clone(),
            snapshot_id: self.snapshot_id,
            slug: self.slug.clone(),
            virtualization: self.virtualization.clone(),
        }
    }
}

fn usable(ipv4: &Option<String>) -> Option<&str> {
    ipv4.as_deref().filter(|ip| !ip.is_empty())
}

/// Map a platform server onto resource state
pub fn server_state(server: &Server, server_up_port: u16) -> ResourceState {
    let mut state = ResourceState::new(&server.slug, SERVER)
        .with_attribute("name", server.name.as_str())
        .with_attribute("slug", server.slug.as_str())
        .with_attribute("location_id", server.location.as_str())
        .with_attribute("profile_slug", server.profile.as_str())
        .with_attribute("image_slug", json!(server.image))
        .with_attribute("created_at", server.date.as_str())
        .with_attribute("ipv4", json!(server.ipv4))
        .with_attribute("ipv6", json!(server.ipv6))
        .with_attribute("status", server.status.as_str())
        .with_attribute("virtualization", json!(server.virtualization))
        .with_attribute("webserver", json!(server.web_server))
        .with_attribute("aliases", json!(server.aliases))
        .with_attribute("snapshot_runtime", server.snapshot_run_time)
        .with_attribute("ssh_password_auth_enabled", server.ssh_password_auth_enabled)
        .with_attribute("wordpress_lockdown", server.wordpress_lockdown);

    if let Some(ipv4) = usable(&server.ipv4) {
        state = state.with_connection(ipv4, server_up_port);
    }
    state
}

/// Server orchestrator
pub struct ServerResource<'a, C> {
    provider: &'a Provider<C>,
}

impl<'a, C> ServerResource<'a, C>
where
    C: ServerApi + EventLog + 'static,
{
    pub(crate) fn new(provider: &'a Provider<C>) -> Self {
        Self { provider }
    }

    fn api_error(
        operation: &'static str,
        id: &str,
    ) -> impl FnOnce(webdock_api::ApiError) -> ProviderError {
        move |source| ProviderError::Api {
            operation,
            resource_type: SERVER,
            id: id.to_string(),
            source,
        }
    }

    fn wait_error(
        operation: &'static str,
        id: &str,
    ) -> impl FnOnce(WaitError) -> ProviderError {
        move |source| ProviderError::Wait {
            operation,
            resource_type: SERVER,
            id: id.to_string(),
            source,
        }
    }

    /// Address to gate on; re-read when the create response carries none
    async fn ipv4_of(&self, server: &Server) -> Result<String> {
        if let Some(ipv4) = usable(&server.ipv4) {
            return Ok(ipv4.to_string());
        }

        debug!(slug = %server.slug, "no IPv4 address in create response, re-reading server");
        let current = self
            .provider
            .client()
            .get_server(&server.slug)
            .await
            .map_err(Self::api_error("create", &server.slug))?;

        usable(&current.ipv4)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::MissingAddress {
                resource_type: SERVER,
                id: server.slug.clone(),
            })
    }

    async fn fetch(&self, slug: &str) -> Result<ResourceState> {
        self.read(slug).await?.ok_or_else(|| ProviderError::NotFound {
            resource_type: SERVER,
            id: slug.to_string(),
        })
    }
}

#[async_trait]
impl<C> Resource for ServerResource<'_, C>
where
    C: ServerApi + EventLog + 'static,
{
    type Spec = ServerSpec;

    fn resource_type(&self) -> &'static str {
        SERVER
    }

    async fn create(&self, spec: &ServerSpec) -> Result<ResourceState> {
        spec.validate()?;

        let settings = self.provider.settings();
        let cancel = self.provider.cancellation_token();
        let client = self.provider.client();
        let label = spec.slug.clone().unwrap_or_else(|| spec.name.clone());

        if !self.provider.throttle().wait_turn(&cancel).await {
            return Err(ProviderError::Cancelled {
                operation: "create",
                resource_type: SERVER,
                id: label,
            });
        }

        let request = spec.to_request();
        let tracked = settings
            .backoff
            .run(&cancel, || client.create_server(&request))
            .await
            .map_err(Self::api_error("create", &label))?;

        let server = tracked.value;
        let handle = tracked.handle;
        info!(slug = %server.slug, token = %handle, "server creation accepted");

        if handle.is_empty() {
            return Err(Self::wait_error("create", &server.slug)(
                WaitError::MissingHandle,
            ));
        }

        let ipv4 = self.ipv4_of(&server).await?;
        self.provider
            .poller()
            .wait_for_server_up(
                &handle,
                &ipv4,
                settings.server_up_port,
                settings.server_timeout,
            )
            .await
            .map_err(Self::wait_error("create", &server.slug))?;

        info!(slug = %server.slug, "server is up");
        self.fetch(&server.slug).await
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        match self.provider.client().get_server(id).await {
            Ok(server) => Ok(Some(server_state(
                &server,
                self.provider.settings().server_up_port,
            ))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(Self::api_error("read", id)(e)),
        }
    }

    async fn update(
        &self,
        id: &str,
        current: &ServerSpec,
        desired: &ServerSpec,
    ) -> Result<ResourceState> {
        desired.validate_identity()?;

        let forced = changed(&[
            ("location_id", current.location_id != desired.location_id),
            (
                "virtualization",
                current.virtualization != desired.virtualization,
            ),
            ("snapshot_id", current.snapshot_id != desired.snapshot_id),
        ]);
        if !forced.is_empty() {
            return Err(ProviderError::ReplaceRequired {
                resource_type: SERVER,
                id: id.to_string(),
                fields: forced,
            });
        }

        let client = self.provider.client();
        let settings = self.provider.settings();
        let poller = self.provider.poller();

        if current.profile_slug != desired.profile_slug {
            let body = ResizeServerRequest {
                profile_slug: desired.profile_slug.clone(),
            };

            let dry_run = client
                .resize_dry_run(id, &body)
                .await
                .map_err(Self::api_error("resize", id))?;
            for warning in &dry_run.warnings {
                warn!(slug = %id, kind = %warning.kind, "resize warning: {}", warning.message);
            }

            let handle = client
                .resize_server(id, &body)
                .await
                .map_err(Self::api_error("resize", id))?;
            poller
                .wait_for_action(&handle, settings.server_timeout)
                .await
                .map_err(Self::wait_error("resize", id))?;
            info!(slug = %id, profile = %desired.profile_slug, "server resized");
        }

        if current.image_slug != desired.image_slug
            && let Some(image_slug) = &desired.image_slug
        {
            let body = ReinstallServerRequest {
                image_slug: image_slug.clone(),
            };
            let handle = client
                .reinstall_server(id, &body)
                .await
                .map_err(Self::api_error("reinstall", id))?;
            poller
                .wait_for_action(&handle, settings.server_timeout)
                .await
                .map_err(Self::wait_error("reinstall", id))?;
            info!(slug = %id, image = %image_slug, "server reinstalled");
        }

        if current.name != desired.name {
            let body = PatchServerRequest {
                name: desired.name.clone(),
            };
            client
                .patch_server(id, &body)
                .await
                .map_err(Self::api_error("rename", id))?;
        }

        self.fetch(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let handle = match self.provider.client().delete_server(id).await {
            Ok(handle) => handle,
            Err(e) if e.is_not_found() => {
                info!(slug = %id, "server already deleted");
                return Ok(());
            }
            Err(e) => return Err(Self::api_error("delete", id)(e)),
        };

        self.provider
            .poller()
            .wait_for_action(&handle, self.provider.settings().server_timeout)
            .await
            .map_err(Self::wait_error("delete", id))?;

        info!(slug = %id, "server deleted");
        Ok(())
    }
}
