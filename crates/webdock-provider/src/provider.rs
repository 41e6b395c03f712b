//! Provider context shared by every resource operation

use crate::data::DataSources;
use crate::error::Result;
use crate::resources::{PublicKeyResource, ServerResource, ShellUserResource};
use crate::state::ResourceState;
use crate::throttle::{CreateBackoff, CreationThrottle};
use crate::wait::{ActionPoller, ReachabilityProbe, TcpProbe, WaitConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use webdock_api::{
    ClientConfig, EventLog, PublicKeyApi, ServerApi, ShellUserApi, WebdockClient,
};
use webdock_config::ProviderConfig;

/// Create/read/update/delete of one resource kind
///
/// `update` receives the previously applied spec and the desired one; the
/// host decides when to call it.
#[async_trait]
pub trait Resource: Send + Sync {
    type Spec: Send + Sync;

    /// Resource type name used in state and error messages
    fn resource_type(&self) -> &'static str;

    async fn create(&self, spec: &Self::Spec) -> Result<ResourceState>;

    /// `None` when the resource no longer exists
    async fn read(&self, id: &str) -> Result<Option<ResourceState>>;

    async fn update(
        &self,
        id: &str,
        current: &Self::Spec,
        desired: &Self::Spec,
    ) -> Result<ResourceState>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Operational settings of a provider instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub wait: WaitConfig,
    /// Port that must accept connections before a new server counts as up
    pub server_up_port: u16,
    /// Deadline for server create/resize/reinstall/delete
    pub server_timeout: Duration,
    /// Deadline for shell user create/update/delete
    pub shell_user_timeout: Duration,
    pub backoff: CreateBackoff,
    /// Extra delay per server already created by this instance
    pub stagger: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            wait: WaitConfig::default(),
            server_up_port: 22,
            server_timeout: Duration::from_secs(60 * 60),
            shell_user_timeout: Duration::from_secs(10 * 60),
            backoff: CreateBackoff::default(),
            stagger: Duration::from_secs(10),
        }
    }
}

impl From<&ProviderConfig> for ProviderSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            wait: WaitConfig::from(&config.poll),
            server_up_port: config.server_up_port,
            server_timeout: config.timeouts.server(),
            shell_user_timeout: config.timeouts.shell_user(),
            backoff: CreateBackoff::from(&config.create),
            stagger: config.create.stagger(),
        }
    }
}

/// Webdock provider
///
/// Owns the API client, the creation throttle and the cancellation token
/// that every wait started through it observes.
pub struct Provider<C> {
    client: Arc<C>,
    settings: ProviderSettings,
    throttle: Arc<CreationThrottle>,
    probe: Arc<dyn ReachabilityProbe>,
    cancel: CancellationToken,
}

impl<C> Provider<C>
where
    C: EventLog + 'static,
{
    pub fn new(client: C, settings: ProviderSettings) -> Self {
        let throttle = Arc::new(CreationThrottle::new(settings.stagger));
        Self {
            client: Arc::new(client),
            settings,
            throttle,
            probe: Arc::new(TcpProbe),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn throttle(&self) -> &CreationThrottle {
        &self.throttle
    }

    /// Token that cancels every wait started through this provider
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// A poller bound to this provider's client, probe and cancellation
    pub fn poller(&self) -> ActionPoller {
        let events: Arc<dyn EventLog> = self.client.clone();
        ActionPoller::new(events, self.settings.wait.clone())
            .with_probe(self.probe.clone())
            .with_cancellation(self.cancel.clone())
    }

    pub fn servers(&self) -> ServerResource<'_, C>
    where
        C: ServerApi,
    {
        ServerResource::new(self)
    }

    pub fn shell_users(&self) -> ShellUserResource<'_, C>
    where
        C: ShellUserApi,
    {
        ShellUserResource::new(self)
    }

    pub fn public_keys(&self) -> PublicKeyResource<'_, C>
    where
        C: PublicKeyApi,
    {
        PublicKeyResource::new(self)
    }

    pub fn data(&self) -> DataSources<'_, C> {
        DataSources::new(self)
    }
}

impl Provider<WebdockClient> {
    /// Build a provider talking to the real API
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let client = WebdockClient::new(ClientConfig::new(
            config.api_endpoint.clone(),
            config.token()?,
        ))?;

        Ok(Self::new(client, ProviderSettings::from(config)))
    }
}
