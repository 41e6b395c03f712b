//! Webdock provider
//!
//! Declarative management of Webdock servers, shell users and public keys.
//!
//! Platform mutations are asynchronous: the API accepts an action and hands
//! back a tracking token. Every orchestrator in this crate turns that into
//! a synchronous, bounded operation by waiting on the event log.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Provider<C>                     │
//! │  settings · CreationThrottle · CancellationToken │
//! └──────┬──────────────────┬───────────────────────┘
//!        │                  │
//! ┌──────▼───────┐  ┌───────▼───────┐
//! │  Resources   │  │  DataSources  │
//! │ server/user/ │  │  (read-only)  │
//! │  public key  │  └───────────────┘
//! └──────┬───────┘
//!        │ tracking token
//! ┌──────▼──────────────────────────┐
//! │ ActionPoller                    │
//! │  wait_for_action                │
//! │  wait_for_server_up (TCP gate)  │
//! └──────┬──────────────────────────┘
//!        │
//! ┌──────▼───────┐
//! │ EventLog API │
//! └──────────────┘
//! ```

pub mod data;
pub mod error;
pub mod provider;
pub mod resources;
pub mod state;
pub mod throttle;
pub mod wait;

#[cfg(test)]
mod testing;

// Re-exports
pub use data::DataSources;
pub use error::{ProviderError, Result, WaitError};
pub use provider::{Provider, ProviderSettings, Resource};
pub use resources::{
    PublicKeyResource, PublicKeySpec, ServerResource, ServerSpec, ShellUserResource,
    ShellUserSpec,
};
pub use state::{ConnectionInfo, ResourceState};
pub use throttle::{CreateBackoff, CreationThrottle, TOO_MANY_SERVERS};
pub use wait::{ActionPoller, ReachabilityProbe, TcpProbe, WaitConfig};
