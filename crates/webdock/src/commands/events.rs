use crate::output;
use colored::Colorize;
use std::time::Duration;
use webdock_api::{ActionHandle, EventLog, EventQuery, StatusClass, WebdockClient};
use webdock_provider::Provider;

pub async fn list(provider: &Provider<WebdockClient>, query: &EventQuery) -> anyhow::Result<()> {
    let events = provider.client().list_events(query).await?;

    for event in &events {
        let status = match event.status.class() {
            StatusClass::Target => event.status.as_str().green(),
            StatusClass::Failed => event.status.as_str().red(),
            StatusClass::Pending => event.status.as_str().yellow(),
        };
        eprintln!(
            "{:>8}  {:<10} {:<24} {}",
            event.id,
            status,
            event.action.as_deref().unwrap_or("-"),
            event.callback_id.as_deref().unwrap_or("-").dimmed()
        );
    }

    output::json(&events)
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

/// Wait for a tracking token, probing `target` once the action has finished
pub async fn wait(
    provider: &Provider<WebdockClient>,
    callback_id: &str,
    target: Option<(String, u16)>,
    timeout_minutes: Option<u64>,
) -> anyhow::Result<()> {
    let handle = ActionHandle::new(callback_id);
    let timeout = timeout_minutes
        .map(minutes)
        .unwrap_or(provider.settings().server_timeout);
    let poller = provider.poller();

    output::status(&format!("Waiting for {} (timeout {:?})", handle, timeout));
    let event = match &target {
        Some((address, port)) => {
            poller
                .wait_for_server_up(&handle, address, *port, timeout)
                .await?
        }
        None => poller.wait_for_action(&handle, timeout).await?,
    };

    match target {
        Some((address, port)) => {
            output::success(&format!("{} finished, {}:{} is reachable", handle, address, port))
        }
        None => output::success(&format!("{} finished", handle)),
    }
    output::json(&event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_saturate() {
        assert_eq!(minutes(2), Duration::from_secs(120));
        assert_eq!(minutes(u64::MAX), Duration::from_secs(u64::MAX));
    }
}
