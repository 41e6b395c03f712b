//! In-process doubles for the event log and the reachability probe

use crate::wait::ReachabilityProbe;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use webdock_api::{ApiError, Event, EventLog, EventQuery, EventStatus, Result};

pub fn event(id: i64, token: &str, status: &str) -> Event {
    Event {
        id,
        status: EventStatus::from(status.to_string()),
        callback_id: Some(token.to_string()),
        event_type: Some("provision".to_string()),
        ..Default::default()
    }
}

enum Script {
    /// One response per call; the last one repeats
    Sequence(VecDeque<Vec<Event>>),
    /// Status sequence per token; the last one repeats
    ByToken(HashMap<String, VecDeque<String>>),
    /// Responses indexed by page number
    Pages(Vec<Vec<Event>>),
    /// First call fails
    Failing(Option<ApiError>),
}

struct State {
    script: Script,
    queries: Vec<EventQuery>,
}

pub struct FakeEventLog {
    state: Mutex<State>,
}

impl FakeEventLog {
    fn with(script: Script) -> Self {
        Self {
            state: Mutex::new(State {
                script,
                queries: Vec::new(),
            }),
        }
    }

    pub fn scripted(responses: Vec<Vec<Event>>) -> Self {
        Self::with(Script::Sequence(responses.into()))
    }

    pub fn by_token(statuses: Vec<(&str, Vec<&str>)>) -> Self {
        let map = statuses
            .into_iter()
            .map(|(token, seq)| {
                (
                    token.to_string(),
                    seq.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();
        Self::with(Script::ByToken(map))
    }

    pub fn paged(pages: Vec<Vec<Event>>) -> Self {
        Self::with(Script::Pages(pages))
    }

    pub fn failing(error: ApiError) -> Self {
        Self::with(Script::Failing(Some(error)))
    }

    pub fn queries(&self) -> usize {
        self.state.lock().unwrap().queries.len()
    }

    pub fn queries_for(&self, token: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queries
            .iter()
            .filter(|q| q.callback_id.as_deref() == Some(token))
            .count()
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.state
            .lock()
            .unwrap()
            .queries
            .iter()
            .filter_map(|q| q.page)
            .collect()
    }
}

fn next_repeating<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl EventLog for FakeEventLog {
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());

        match &mut state.script {
            Script::Sequence(responses) => Ok(next_repeating(responses).unwrap_or_default()),
            Script::ByToken(map) => {
                let token = query.callback_id.clone().unwrap_or_default();
                let status = map.get_mut(&token).and_then(next_repeating);
                Ok(status
                    .map(|s| vec![event(1, &token, &s)])
                    .unwrap_or_default())
            }
            Script::Pages(pages) => {
                let index = query.page.unwrap_or(1).saturating_sub(1) as usize;
                Ok(pages.get(index).cloned().unwrap_or_default())
            }
            Script::Failing(error) => match error.take() {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            },
        }
    }
}

/// Probe with scripted outcomes; the last outcome repeats
pub struct FakeProbe {
    outcomes: Mutex<VecDeque<bool>>,
    attempts: Mutex<Vec<(String, u16)>>,
}

impl FakeProbe {
    pub fn scripted(outcomes: Vec<bool>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn last_target(&self) -> Option<(String, u16)> {
        self.attempts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn probe(&self, address: &str, port: u16, _timeout: Duration) -> io::Result<()> {
        self.attempts
            .lock()
            .unwrap()
            .push((address.to_string(), port));

        let reachable = next_repeating(&mut self.outcomes.lock().unwrap()).unwrap_or(false);
        if reachable {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        }
    }
}
