//! Resource orchestrators
//!
//! Each orchestrator issues the triggering API call, waits for the action it
//! started and then maps the platform entity onto [`ResourceState`].
//!
//! [`ResourceState`]: crate::state::ResourceState

mod public_key;
mod server;
mod shell_user;

pub use public_key::{PUBLIC_KEY, PublicKeyResource, PublicKeySpec, public_key_state};
pub use server::{SERVER, ServerResource, ServerSpec, server_state};
pub use shell_user::{
    DEFAULT_GROUP, DEFAULT_SHELL, SHELL_USER, ShellUserResource, ShellUserSpec, shell_user_state,
};

/// Names of the fields that differ, in declaration order
pub(crate) fn changed<'a>(fields: &[(&'a str, bool)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, differs)| *differs)
        .map(|(name, _)| *name)
        .collect()
}
