//! Display shell
//!
//! Owns the one piece of visible state, the output text, and the three actions
//! that replace it. Triggering an action swaps in a progress line right away and
//! spawns the request; the request reports back over a channel and the owner of
//! the shell applies it with `poll_completions` or `next_completion`. Requests
//! are never cancelled or serialized, so overlapping actions race and the last
//! one to resolve decides the final text.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::{render_json, ApiError, Backend, Endpoint, ItemNamer};

/// Output shown before any action has run
pub const GREETING: &str = "Click a button to test your full stack!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ping,
    AddItem,
    GetLatestItem,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Ping, Action::AddItem, Action::GetLatestItem];

    /// Button caption
    pub fn label(&self) -> &'static str {
        match self {
            Action::Ping => "1. Ping Backend",
            Action::AddItem => "2. Add Item to DB",
            Action::GetLatestItem => "3. Get Latest Item",
        }
    }

    fn error_prefix(&self) -> &'static str {
        match self {
            Action::Ping => "Error pinging backend",
            Action::AddItem => "Error adding item",
            Action::GetLatestItem => "Error getting item",
        }
    }
}

/// A resolved request, tagged with the token handed out by `Shell::trigger`
#[derive(Debug, Clone)]
pub struct Completion {
    pub seq: u64,
    pub action: Action,
    pub result: Result<Value, ApiError>,
}

impl Completion {
    /// Text this completion puts in the output area
    pub fn render(&self) -> String {
        match &self.result {
            Ok(value) => render_json(value),
            Err(e) => format!("{}: {}", self.action.error_prefix(), e),
        }
    }
}

pub struct Shell {
    output: String,
    revision: u64,

    backend: Arc<dyn Backend>,
    namer: ItemNamer,

    // Drop responses older than the latest trigger instead of letting them race
    discard_stale: bool,

    next_seq: u64,
    latest_seq: u64,
    in_flight: usize,

    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl Shell {
    pub fn new(backend: Arc<dyn Backend>, namer: ItemNamer) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            output: GREETING.to_string(),
            revision: 0,
            backend,
            namer,
            discard_stale: false,
            next_seq: 0,
            latest_seq: 0,
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn with_discard_stale(mut self, discard_stale: bool) -> Self {
        self.discard_stale = discard_stale;
        self
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Replace the output wholesale
    pub fn set_output(&mut self, text: impl Into<String>) {
        self.output = text.into();
        self.revision += 1;
    }

    /// Bumped on every `set_output`, so views can notice a replacement
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Show the progress line for `action` and spawn its request.
    ///
    /// Must be called from within a tokio runtime. Returns the request token.
    pub fn trigger(&mut self, action: Action) -> u64 {
        let endpoint = match action {
            Action::Ping => {
                self.set_output("Pinging backend...");
                Endpoint::ping()
            }
            Action::AddItem => {
                let name = self.namer.next_name();
                self.set_output(format!("Adding item: {}...", name));
                Endpoint::add_item(&name)
            }
            Action::GetLatestItem => {
                self.set_output("Getting latest item from DB...");
                Endpoint::get_latest_item()
            }
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest_seq = seq;
        self.in_flight += 1;

        tracing::debug!(seq, ?action, path = endpoint.path, "request started");

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // A panic in the backend surfaces here as a JoinError
            let call = tokio::spawn(async move { backend.call(&endpoint).await });
            let result = match call.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(seq, "request task failed: {}", e);
                    Err(ApiError::Transport(format!("request task failed: {}", e)))
                }
            };
            // Receiver gone means the shell was dropped; nobody is left to show this
            let _ = tx.send(Completion { seq, action, result });
        });

        seq
    }

    /// Apply a resolved request to the output. Returns false if it was dropped as stale.
    pub fn apply(&mut self, completion: &Completion) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        if self.discard_stale && completion.seq < self.latest_seq {
            tracing::debug!(
                seq = completion.seq,
                latest = self.latest_seq,
                "dropping stale response"
            );
            return false;
        }

        let (seq, action) = (completion.seq, completion.action);
        match &completion.result {
            Ok(_) => tracing::debug!(seq, ?action, "request succeeded"),
            Err(e) => tracing::debug!(seq, ?action, "request failed: {}", e),
        }

        self.set_output(completion.render());
        true
    }

    /// Apply everything that has resolved so far, in resolution order, without waiting
    pub fn poll_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(&completion);
            applied += 1;
        }
        applied
    }

    /// Wait for the next request to resolve and apply it.
    ///
    /// Returns `None` straight away when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        self.apply(&completion);
        Some(completion)
    }
}
