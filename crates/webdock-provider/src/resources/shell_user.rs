use super::changed;
use crate::error::{ProviderError, Result, WaitError};
use crate::provider::{Provider, Resource};
use crate::state::ResourceState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use webdock_api::{ApiError, CreateShellUserRequest, EventLog, ShellUser, ShellUserApi};

pub const SHELL_USER: &str = "shell_user";

pub const DEFAULT_GROUP: &str = "sudo";
pub const DEFAULT_SHELL: &str = "/bin/bash";

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

/// Desired shell user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellUserSpec {
    pub server_slug: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Ids of account public keys
    #[serde(default)]
    pub public_keys: Vec<i64>,
}

impl ShellUserSpec {
    pub fn new(
        server_slug: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_slug: server_slug.into(),
            username: username.into(),
            password: password.into(),
            group: default_group(),
            shell: default_shell(),
            public_keys: Vec::new(),
        }
    }

    pub fn with_public_keys(mut self, keys: Vec<i64>) -> Self {
        self.public_keys = keys;
        self
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("server_slug", &self.server_slug),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(ProviderError::InvalidSpec {
                    resource_type: SHELL_USER,
                    message: format!("{} is required", field),
                });
            }
        }
        Ok(())
    }
}

/// Split `{server_slug}/{shell_user_id}`
fn parse_id(id: &str) -> Result<(&str, i64)> {
    let invalid = || ProviderError::InvalidId {
        resource_type: SHELL_USER,
        id: id.to_string(),
    };

    let (slug, user_id) = id.rsplit_once('/').ok_or_else(invalid)?;
    if slug.is_empty() {
        return Err(invalid());
    }
    let user_id = user_id.parse().map_err(|_| invalid())?;
    Ok((slug, user_id))
}

/// Map a platform shell user onto resource state
pub fn shell_user_state(server_slug: &str, user: &ShellUser) -> ResourceState {
    ResourceState::new(format!("{}/{}", server_slug, user.id), SHELL_USER)
        .with_attribute("server_slug", server_slug)
        .with_attribute("username", user.username.as_str())
        .with_attribute("group", user.group.as_str())
        .with_attribute("shell", user.shell.as_str())
        .with_attribute("public_keys", json!(user.public_keys))
        .with_attribute("created_at", json!(user.created))
}

/// Shell user orchestrator
pub struct ShellUserResource<'a, C> {
    provider: &'a Provider<C>,
}

impl<'a, C> ShellUserResource<'a, C>
where
    C: ShellUserApi + EventLog + 'static,
{
    pub(crate) fn new(provider: &'a Provider<C>) -> Self {
        Self { provider }
    }

    fn api_error(operation: &'static str, id: &str) -> impl FnOnce(ApiError) -> ProviderError {
        move |source| ProviderError::Api {
            operation,
            resource_type: SHELL_USER,
            id: id.to_string(),
            source,
        }
    }

    fn wait_error(operation: &'static str, id: &str) -> impl FnOnce(WaitError) -> ProviderError {
        move |source| ProviderError::Wait {
            operation,
            resource_type: SHELL_USER,
            id: id.to_string(),
            source,
        }
    }

    /// The platform may omit fields it did not change; fill them from `ShellUserSpec`
    fn merged(spec: &ShellUserSpec, mut user: ShellUser) -> ShellUser {
        if user.username.is_empty() {
            user.username = spec.username.clone();
        }
        if user.group.is_empty() {
            user.group = spec.group.clone();
        }
        if user.shell.is_empty() {
            user.shell = spec.shell.clone();
        }
        user
    }
}

#[async_trait]
impl<C> Resource for ShellUserResource<'_, C>
where
    C: ShellUserApi + EventLog + 'static,
{
    type Spec = ShellUserSpec;

    fn resource_type(&self) -> &'static str {
        SHELL_USER
    }

    async fn create(&self, spec: &ShellUserSpec) -> Result<ResourceState> {
        spec.validate()?;

        let label = format!("{}/{}", spec.server_slug, spec.username);
        let body = CreateShellUserRequest {
            username: spec.username.clone(),
            password: spec.password.clone(),
            group: spec.group.clone(),
            shell: spec.shell.clone(),
            public_keys: spec.public_keys.clone(),
        };

        let tracked = self
            .provider
            .client()
            .create_shell_user(&spec.server_slug, &body)
            .await
            .map_err(Self::api_error("create", &label))?;

        let user = Self::merged(spec, tracked.value);
        let id = format!("{}/{}", spec.server_slug, user.id);

        self.provider
            .poller()
            .wait_for_action(&tracked.handle, self.provider.settings().shell_user_timeout)
            .await
            .map_err(Self::wait_error("create", &id))?;

        info!(id = %id, username = %user.username, "shell user created");
        Ok(shell_user_state(&spec.server_slug, &user))
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        let (server_slug, user_id) = parse_id(id)?;

        let users = match self.provider.client().list_shell_users(server_slug).await {
            Ok(users) => users,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(Self::api_error("read", id)(e)),
        };

        Ok(users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| shell_user_state(server_slug, u)))
    }

    async fn update(
        &self,
        id: &str,
        current: &ShellUserSpec,
        desired: &ShellUserSpec,
    ) -> Result<ResourceState> {
        let (server_slug, user_id) = parse_id(id)?;

        let forced = changed(&[
            ("server_slug", current.server_slug != desired.server_slug),
            ("username", current.username != desired.username),
            ("password", current.password != desired.password),
            ("group", current.group != desired.group),
            ("shell", current.shell != desired.shell),
        ]);
        if !forced.is_empty() {
            return Err(ProviderError::ReplaceRequired {
                resource_type: SHELL_USER,
                id: id.to_string(),
                fields: forced,
            });
        }

        if current.public_keys == desired.public_keys {
            return self.read(id).await?.ok_or_else(|| ProviderError::NotFound {
                resource_type: SHELL_USER,
                id: id.to_string(),
            });
        }

        let tracked = self
            .provider
            .client()
            .update_shell_user_keys(server_slug, user_id, &desired.public_keys)
            .await
            .map_err(Self::api_error("update", id))?;

        self.provider
            .poller()
            .wait_for_action(&tracked.handle, self.provider.settings().shell_user_timeout)
            .await
            .map_err(Self::wait_error("update", id))?;

        let mut user = Self::merged(desired, tracked.value);
        user.id = user_id;
        info!(id = %id, keys = ?user.public_keys, "shell user keys updated");
        Ok(shell_user_state(server_slug, &user))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (server_slug, user_id) = parse_id(id)?;

        let handle = match self
            .provider
            .client()
            .delete_shell_user(server_slug, user_id)
            .await
        {
            Ok(handle) => handle,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(Self::api_error("delete", id)(e)),
        };

        self.provider
            .poller()
            .wait_for_action(&handle, self.provider.settings().shell_user_timeout)
            .await
            .map_err(Self::wait_error("delete", id))?;

        info!(id = %id, "shell user deleted");
        Ok(())
    }
}
