//! Read-only data sources

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::resources::{public_key_state, server_state, shell_user_state};
use crate::state::ResourceState;
use serde_json::json;
use webdock_api::{
    AccountInformation, ApiError, CatalogApi, EventLog, PublicKeyApi, ServerApi, ServerImage,
    ServerLocation, ServerProfile, ShellUserApi,
};

fn lookup_error(what: &'static str, id: &str) -> impl FnOnce(ApiError) -> ProviderError {
    move |source| ProviderError::Api {
        operation: "list",
        resource_type: what,
        id: id.to_string(),
        source,
    }
}

pub fn image_state(image: &ServerImage) -> ResourceState {
    ResourceState::new(&image.slug, "image")
        .with_attribute("slug", image.slug.as_str())
        .with_attribute("name", image.name.as_str())
        .with_attribute("web_server", json!(image.web_server))
        .with_attribute("php_version", json!(image.php_version))
}

pub fn location_state(location: &ServerLocation) -> ResourceState {
    ResourceState::new(&location.id, "location")
        .with_attribute("id", location.id.as_str())
        .with_attribute("name", location.name.as_str())
        .with_attribute("city", location.city.as_str())
        .with_attribute("country", location.country.as_str())
        .with_attribute("description", location.description.as_str())
        .with_attribute("icon", location.icon.as_str())
}

pub fn profile_state(profile: &ServerProfile) -> ResourceState {
    ResourceState::new(&profile.slug, "profile")
        .with_attribute("slug", profile.slug.as_str())
        .with_attribute("name", profile.name.as_str())
        .with_attribute("ram", profile.ram)
        .with_attribute("disk", profile.disk)
        .with_attribute(
            "cpu",
            json!({"cores": profile.cpu.cores, "threads": profile.cpu.threads}),
        )
        .with_attribute(
            "price",
            json!({"amount": profile.price.amount, "currency": profile.price.currency}),
        )
}

pub fn account_state(account: &AccountInformation) -> ResourceState {
    ResourceState::new(account.user_id.to_string(), "account")
        .with_attribute("user_id", account.user_id)
        .with_attribute("user_name", account.user_name.as_str())
        .with_attribute("user_email", account.user_email.as_str())
        .with_attribute("user_avatar", account.user_avatar.as_str())
        .with_attribute("company_name", account.company_name.as_str())
        .with_attribute("is_team_member", account.is_team_member)
        .with_attribute("team_leader", account.team_leader.as_str())
        .with_attribute("account_balance", account.account_balance.as_str())
        .with_attribute("account_balance_raw", account.account_balance_raw.as_str())
        .with_attribute(
            "account_balance_raw_currency",
            account.account_balance_raw_currency.as_str(),
        )
}

/// Listings of platform objects, mapped to resource state
pub struct DataSources<'a, C> {
    provider: &'a Provider<C>,
}

impl<'a, C> DataSources<'a, C>
where
    C: EventLog + 'static,
{
    pub(crate) fn new(provider: &'a Provider<C>) -> Self {
        Self { provider }
    }
}

impl<C> DataSources<'_, C>
where
    C: ServerApi + EventLog + 'static,
{
    /// Servers, optionally filtered by status
    pub async fn servers(&self, status: Option<&str>) -> Result<Vec<ResourceState>> {
        let port = self.provider.settings().server_up_port;
        let servers = self
            .provider
            .client()
            .list_servers(status)
            .await
            .map_err(lookup_error("servers", status.unwrap_or("*")))?;
        Ok(servers.iter().map(|s| server_state(s, port)).collect())
    }
}

impl<C> DataSources<'_, C>
where
    C: CatalogApi + EventLog + 'static,
{
    pub async fn images(&self) -> Result<Vec<ResourceState>> {
        let images = self
            .provider
            .client()
            .list_images()
            .await
            .map_err(lookup_error("images", "*"))?;
        Ok(images.iter().map(image_state).collect())
    }

    pub async fn locations(&self) -> Result<Vec<ResourceState>> {
        let locations = self
            .provider
            .client()
            .list_locations()
            .await
            .map_err(lookup_error("locations", "*"))?;
        Ok(locations.iter().map(location_state).collect())
    }

    /// Profiles, optionally for one location
    pub async fn profiles(&self, location_id: Option<&str>) -> Result<Vec<ResourceState>> {
        let profiles = self
            .provider
            .client()
            .list_profiles(location_id)
            .await
            .map_err(lookup_error("profiles", location_id.unwrap_or("*")))?;
        Ok(profiles.iter().map(profile_state).collect())
    }

    pub async fn account(&self) -> Result<ResourceState> {
        let account = self
            .provider
            .client()
            .account_information()
            .await
            .map_err(lookup_error("account", "*"))?;
        Ok(account_state(&account))
    }
}

impl<C> DataSources<'_, C>
where
    C: PublicKeyApi + EventLog + 'static,
{
    pub async fn public_keys(&self) -> Result<Vec<ResourceState>> {
        let keys = self
            .provider
            .client()
            .list_public_keys()
            .await
            .map_err(lookup_error("public keys", "*"))?;
        Ok(keys.iter().map(public_key_state).collect())
    }
}

impl<C> DataSources<'_, C>
where
    C: ShellUserApi + EventLog + 'static,
{
    pub async fn shell_users(&self, server_slug: &str) -> Result<Vec<ResourceState>> {
        let users = self
            .provider
            .client()
            .list_shell_users(server_slug)
            .await
            .map_err(lookup_error("shell users", server_slug))?;
        Ok(users
            .iter()
            .map(|u| shell_user_state(server_slug, u))
            .collect())
    }
}
