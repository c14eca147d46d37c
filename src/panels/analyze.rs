use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::api::{AnalyzeRequest, Backend};
use crate::input::TextInput;
use crate::lifecycle::{Interaction, Lifecycle, Reply, ResultView};

pub const EMPTY_DATA: &str = "Please paste some data to analyze.";

/// Collapse `\r\n` and lone `\r` into `\n` so the server sees one row per line.
pub fn normalize_line_endings(data: &str) -> String {
    data.replace("\r\n", "\n").replace('\r', "\n")
}

pub struct AnalyzePanel {
    backend: Arc<dyn Backend>,
    lifecycle: Lifecycle,
    pub input: TextInput,
    pub result: ResultView,
}

impl AnalyzePanel {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            lifecycle: Lifecycle::new(),
            input: TextInput::new(),
            result: ResultView::default(),
        }
    }
}

impl Interaction for AnalyzePanel {
    const EMPTY_INPUT: &'static str = EMPTY_DATA;

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

        let data_input = normalize_line_endings(self.input.value());
        let backend = Arc::clone(&self.backend);
        Box::pin(async move { backend.analyze(AnalyzeRequest { data_input }).await })
    }

    fn apply(&mut self, reply: Reply) {
        match reply {
            Ok(report) => self.result.succeed(report),
            Err(e) => self.result.fail(format!("Analysis failed: {}", e.user_message())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ANALYZE_PATH, GatewayError};
    use crate::lifecycle::{Outcome, Submit};
    use crate::panels::fake::FakeBackend;
    use serde_json::json;
    use tokio::sync::Notify;

    #[test]
    fn line_endings_are_unified() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_line_endings("plain"), "plain");
    }

    #[tokio::test]
    async fn report_is_stored_on_success() {
        let backend = Arc::new(FakeBackend::new().reply_ok("| Nom | Age |\n|---|---|\n| Alice | 30 |"));
        let mut panel = AnalyzePanel::new(backend.clone());
        panel.input.set("Nom,Age\r\nAlice,30");

        assert_eq!(panel.submit(), Submit::Sent);
        assert!(panel.is_loading());
        panel.wait().await;

        assert!(panel.result.success().unwrap().starts_with("| Nom | Age |"));
        assert_eq!(
            backend.calls(),
            vec![("analyze", json!({"data_input": "Nom,Age\nAlice,30"}))]
        );
    }

    #[tokio::test]
    async fn blank_input_fails_locally() {
        let backend = Arc::new(FakeBackend::new());
        let mut panel = AnalyzePanel::new(backend.clone());
        panel.input.set("\n  \n");

        assert_eq!(panel.submit(), Submit::Invalid);
        assert_eq!(panel.result.failure(), Some(EMPTY_DATA));
        assert!(!panel.is_loading());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn remote_detail_is_shown_verbatim() {
        let backend = Arc::new(FakeBackend::new().reply_err(GatewayError::Remote {
            endpoint: ANALYZE_PATH,
            status: 422,
            detail: Some("X".to_string()),
        }));
        let mut panel = AnalyzePanel::new(backend);
        panel.input.set("a,b");
        panel.submit();
        panel.wait().await;

        let message = panel.result.failure().unwrap();
        assert!(message.contains('X'));
        assert!(message.starts_with("Analysis failed: "));
    }

    #[tokio::test]
    async fn success_and_error_replace_each_other() {
        let backend = Arc::new(
            FakeBackend::new()
                .reply_err(GatewayError::Rejected { endpoint: ANALYZE_PATH, detail: None })
                .reply_ok("# Rapport"),
        );
        let mut panel = AnalyzePanel::new(backend);
        panel.input.set("a,b");

        panel.submit();
        panel.wait().await;
        assert!(matches!(panel.result.outcome(), Some(Outcome::Failure(_))));

        panel.submit();
        assert!(panel.result.outcome().is_none());
        panel.wait().await;
        assert_eq!(panel.result.outcome(), Some(&Outcome::Success("# Rapport".to_string())));
    }

    #[tokio::test]
    async fn submit_while_in_flight_is_dropped() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend::gated(gate.clone()).reply_ok("ok"));
        let mut panel = AnalyzePanel::new(backend.clone());
        panel.input.set("a,b");

        assert_eq!(panel.submit(), Submit::Sent);
        assert_eq!(panel.submit(), Submit::Busy);
        gate.notify_one();
        panel.wait().await;
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(panel.result.success(), Some("ok"));
    }
}
