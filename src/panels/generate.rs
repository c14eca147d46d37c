use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::api::{Backend, GenerateRequest};
use crate::input::TextInput;
use crate::lifecycle::{Interaction, Lifecycle, Reply, ResultView};
use crate::tone::Tone;

pub const EMPTY_SUBJECT: &str = "Please provide a subject and writing instructions.";

pub struct GeneratePanel {
    backend: Arc<dyn Backend>,
    lifecycle: Lifecycle,
    pub input: TextInput,
    pub tone: Tone,
    /// Tone of the request that produced the current result
    pub tone_used: Option<Tone>,
    pub result: ResultView,
}

impl GeneratePanel {
    pub fn new(backend: Arc<dyn Backend>, tone: Tone) -> Self {
        Self {
            backend,
            lifecycle: Lifecycle::new(),
            input: TextInput::new(),
            tone,
            tone_used: None,
            result: ResultView::default(),
        }
    }

    pub fn next_tone(&mut self) {
        if !self.is_loading() {
            self.tone = self.tone.next();
        }
    }

    pub fn prev_tone(&mut self) {
        if !self.is_loading() {
            self.tone = self.tone.prev();
        }
    }
}

impl Interaction for GeneratePanel {
    const EMPTY_INPUT: &'static str = EMPTY_SUBJECT;

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
        self.result.fail(message.to_string());
    }

    fn request(&mut self) -> BoxFuture<'static, Reply> {
        self.result.clear();
        self.tone_used = Some(self.tone);

        let request = GenerateRequest {
            subject: self.input.value().to_string(),
            ton: self.tone,
        };
        let backend = Arc::clone(&self.backend);
        Box::pin(async move { backend.generate(request).await })
    }

    fn apply(&mut self, reply: Reply) {
        match reply {
            Ok(content) => self.result.succeed(content),
            Err(e) => self.result.fail(format!("Generation failed: {}", e.user_message())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GENERATE_PATH, GatewayError};
    use crate::lifecycle::Submit;
    use crate::markdown::{self, Block};
    use crate::panels::fake::FakeBackend;
    use serde_json::json;

    #[tokio::test]
    async fn funny_cats_render_a_heading() {
        let backend = Arc::new(FakeBackend::new().reply_ok("# Chats\nLes chats dorment 16h par jour."));
        let mut panel = GeneratePanel::new(backend.clone(), Tone::Drole);
        panel.input.set("chats");

        assert_eq!(panel.submit(), Submit::Sent);
        panel.wait().await;

        assert_eq!(
            backend.calls(),
            vec![("generate", json!({"subject": "chats", "ton": "Drôle"}))]
        );
        let document = markdown::parse(panel.result.success().unwrap());
        assert!(matches!(
            document.blocks.first(),
            Some(Block::Heading { level: 1, .. })
        ));
        assert_eq!(document.blocks[0].plain_text(), "Chats");
        assert_eq!(panel.tone_used, Some(Tone::Drole));
    }

    #[tokio::test]
    async fn blank_subject_fails_locally() {
        let backend = Arc::new(FakeBackend::new());
        let mut panel = GeneratePanel::new(backend.clone(), Tone::default());

        assert_eq!(panel.submit(), Submit::Invalid);
        assert_eq!(panel.result.failure(), Some(EMPTY_SUBJECT));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn tone_is_locked_while_generating() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let backend = Arc::new(FakeBackend::gated(gate.clone()).reply_ok("ok"));
        let mut panel = GeneratePanel::new(backend, Tone::Amical);
        panel.input.set("sujet");
        panel.submit();

        panel.next_tone();
        assert_eq!(panel.tone, Tone::Amical);
        gate.notify_one();
        panel.wait().await;
        panel.next_tone();
        assert_eq!(panel.tone, Tone::Drole);
    }

    #[tokio::test]
    async fn generic_fallback_when_no_detail() {
        let backend = Arc::new(FakeBackend::new().reply_err(GatewayError::Remote {
            endpoint: GENERATE_PATH,
            status: 500,
            detail: None,
        }));
        let mut panel = GeneratePanel::new(backend, Tone::default());
        panel.input.set("sujet");
        panel.submit();
        panel.wait().await;

        let message = panel.result.failure().unwrap();
        assert!(message.starts_with("Generation failed: "));
        assert!(message.contains("HTTP 500"));
    }
}
