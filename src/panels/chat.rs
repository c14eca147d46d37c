use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::api::{Backend, ChatRequest};
use crate::input::TextInput;
use crate::lifecycle::{Interaction, Lifecycle, Reply};

pub const EMPTY_PROMPT: &str = "Type a message before sending.";

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
    /// Set on assistant entries that carry an error message
    pub failed: bool,
}

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

pub struct ChatPanel {
    backend: Arc<dyn Backend>,
    lifecycle: Lifecycle,
    pub input: TextInput,
    entries: Vec<ChatEntry>,
    /// Local validation message. The conversation itself is left untouched.
    pub notice: Option<String>,
    pub scroll: u16,
    /// Chat area size from the last render, for scroll calculations
    pub view_height: u16,
    pub view_width: u16,
    /// Keep the newest entry in view until the user scrolls up
    pub follow: bool,
}

impl Interaction for ChatPanel {
    const EMPTY_INPUT: &'static str = EMPTY_PROMPT;

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn input(&self) -> &TextInput {
        &self.input
    }

    fn reject(&mut self, message: &str) {
        self.notice = Some(message.to_string());
    }

    fn request(&mut self) -> BoxFuture<'static, Reply> {
        self.notice = None;

        // Show the user's message right away, independent of the network
        let prompt = self.input.take();
        self.entries.push(ChatEntry {
            role: ChatRole::User,
            content: prompt.clone(),
            failed: false,
        });
        self.follow = true;

        let backend = Arc::clone(&self.backend);
        Box::pin(async move { backend.chat(ChatRequest { user_prompt: prompt }).await })
    }

    fn apply(&mut self, reply: Reply) {
        let (content, failed) = match reply {
            Ok(text) => (text, false),
            Err(e) => (format!("Error: {}", e.user_message()), true),
        };
        self.entries.push(ChatEntry {
            role: ChatRole::Assistant,
            content,
            failed,
        });
        self.follow = true;
    }
}

impl ChatPanel {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            lifecycle: Lifecycle::new(),
            input: TextInput::new(),
            entries: Vec::new(),
            notice: None,
            scroll: 0,
            view_height: 0,
            view_width: 0,
            follow: true,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow = false;
    }
}
