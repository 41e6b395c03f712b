//! Webdock API client
//!
//! Typed access to the parts of the Webdock REST API that the provider
//! manages: servers, shell users, public keys, the event log and the
//! read-only catalog (images, locations, profiles, account).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 WebdockClient                 │
//! │   (reqwest pool, bearer auth, error bodies)   │
//! └──────┬──────────┬──────────┬──────────┬──────┘
//!        │          │          │          │
//!   ┌────▼───┐ ┌────▼────┐ ┌───▼────┐ ┌───▼─────┐
//!   │EventLog│ │ServerApi│ │ShellUser│ │PublicKey│ ...
//!   │ trait  │ │  trait  │ │Api trait│ │Api trait│
//!   └────────┘ └─────────┘ └────────┘ └─────────┘
//! ```
//!
//! Each capability is an async trait so that callers can depend on exactly
//! the slice of the API they use and substitute a test double for it.
//!
//! # Example
//!
//! ```ignore
//! use webdock_api::{ClientConfig, EventLog, EventQuery, WebdockClient};
//!
//! let client = WebdockClient::new(ClientConfig::new("https://api.webdock.io", token))?;
//! let events = client
//!     .list_events(&EventQuery::for_callback("nLVhulfqCy"))
//!     .await?;
//! ```

pub mod action;
pub mod catalog;
pub mod client;
pub mod error;
pub mod events;
pub mod public_keys;
pub mod servers;
pub mod shell_users;

// Re-exports
pub use reqwest::StatusCode;
pub use action::{ActionHandle, Tracked};
pub use catalog::{
    AccountInformation, CatalogApi, Cpu, Price, ServerImage, ServerLocation, ServerProfile,
};
pub use client::{CALLBACK_HEADER, ClientConfig, DEFAULT_API_ENDPOINT, WebdockClient};
pub use error::{ApiError, ErrorBody, Result};
pub use events::{Event, EventLog, EventQuery, EventStatus, StatusClass};
pub use public_keys::{CreatePublicKeyRequest, PublicKey, PublicKeyApi};
pub use servers::{
    ChargeSummary, ChargeSummaryItem, ChargeSummaryTotal, CreateServerRequest,
    PatchServerRequest, ReinstallServerRequest, ResizeServerRequest, Server, ServerApi,
    ServerResize, Warning,
};
pub use shell_users::{CreateShellUserRequest, ShellUser, ShellUserApi};
