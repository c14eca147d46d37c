//! Request lifecycle shared by every panel.
//!
//! A panel owns one [`Lifecycle`]; it holds at most one outstanding request
//! task and always returns to [`RequestState::Settled`] once that task ends,
//! whatever the task produced. [`Interaction`] runs the submit, poll and
//! wait steps on top of it, so a panel only supplies its request and how a
//! reply lands.

use std::future::Future;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::GatewayError;
use crate::input::TextInput;

pub type Reply = Result<String, GatewayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
    Settled,
}

/// Result of asking a panel to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    Sent,
    /// A request is already outstanding; nothing was sent.
    Busy,
    /// Local validation failed; nothing was sent.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

/// Success or failure display slot. Holding a single `Option<Outcome>`
/// keeps the two mutually exclusive.
#[derive(Debug, Default)]
pub struct ResultView {
    outcome: Option<Outcome>,
    pub scroll: u16,
}

impl ResultView {
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn succeed(&mut self, text: String) {
        self.outcome = Some(Outcome::Success(text));
        self.scroll = 0;
    }

    pub fn fail(&mut self, message: String) {
        self.outcome = Some(Outcome::Failure(message));
        self.scroll = 0;
    }

    pub fn clear(&mut self) {
        self.outcome = None;
        self.scroll = 0;
    }

    pub fn success(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Success(text)) => Some(text),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Failure(message)) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    state: RequestState,
    task: Option<JoinHandle<Reply>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.state == RequestState::InFlight
    }

    /// Spawn `request` unless one is already outstanding.
    pub fn start<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = Reply> + Send + 'static,
    {
        if self.is_in_flight() {
            return false;
        }
        self.task = Some(tokio::spawn(request));
        self.state = RequestState::InFlight;
        true
    }

    /// Settle without waiting: returns `None` while the request is still running.
    pub async fn poll(&mut self) -> Option<Reply> {
        if self.task.as_ref().is_some_and(JoinHandle::is_finished) {
            self.settle().await
        } else {
            None
        }
    }

    /// Wait for the outstanding request, if any, and settle.
    pub async fn settle(&mut self) -> Option<Reply> {
        let task = self.task.take()?;
        let reply = match task.await {
            Ok(reply) => reply,
            Err(e) => Err(GatewayError::Interrupted(e.to_string())),
        };
        self.state = RequestState::Settled;
        info!(ok = reply.is_ok(), "request settled");
        Some(reply)
    }
}

/// Submit orchestration for a panel with one primary text input.
#[async_trait]
pub trait Interaction: Send {
    /// Local validation message for a blank input.
    const EMPTY_INPUT: &'static str;

    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;
    fn input(&self) -> &TextInput;

    /// Record a local validation failure. Nothing is sent.
    fn reject(&mut self, message: &str);

    /// Reset the panel for a new request and build it.
    fn request(&mut self) -> BoxFuture<'static, Reply>;

    fn apply(&mut self, reply: Reply);

    fn is_loading(&self) -> bool {
        self.lifecycle().is_in_flight()
    }

    fn submit(&mut self) -> Submit {
        if self.is_loading() {
            return Submit::Busy;
        }
        if self.input().is_blank() {
            self.reject(Self::EMPTY_INPUT);
            return Submit::Invalid;
        }
        let request = self.request();
        self.lifecycle_mut().start(request);
        Submit::Sent
    }

    /// Apply a finished response, if there is one. Returns true when the
    /// panel changed.
    async fn poll(&mut self) -> bool {
        match self.lifecycle_mut().poll().await {
            Some(reply) => {
                self.apply(reply);
                true
            }
            None => false,
        }
    }

    /// Wait for the outstanding request and apply it.
    async fn wait(&mut self) {
        if let Some(reply) = self.lifecycle_mut().settle().await {
            self.apply(reply);
        }
    }
}
