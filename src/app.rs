use std::sync::Arc;

use ratatui::layout::Rect;

use crate::api::Backend;
use crate::input::TextInput;
use crate::lifecycle::{Interaction, ResultView, Submit};
use crate::panels::{AnalyzePanel, ChatPanel, GeneratePanel};
use crate::tone::Tone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    Analyze,
    Generate,
}

impl Tab {
    pub fn all() -> [Tab; 3] {
        [Tab::Chat, Tab::Analyze, Tab::Generate]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Chat => "Chat",
            Tab::Analyze => "Analyze",
            Tab::Generate => "Generate",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Chat => 0,
            Tab::Analyze => 1,
            Tab::Generate => 2,
        }
    }

    pub fn next(&self) -> Tab {
        match self {
            Tab::Chat => Tab::Analyze,
            Tab::Analyze => Tab::Generate,
            Tab::Generate => Tab::Chat,
        }
    }

    pub fn prev(&self) -> Tab {
        match self {
            Tab::Chat => Tab::Generate,
            Tab::Analyze => Tab::Chat,
            Tab::Generate => Tab::Analyze,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub tab: Tab,
    pub input_mode: InputMode,

    pub chat: ChatPanel,
    pub analyze: AnalyzePanel,
    pub generate: GeneratePanel,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub api_url: String,

    // Areas from the last render, for mouse hit-testing
    pub tabs_area: Option<Rect>,
    pub output_area: Option<Rect>,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, api_url: &str, tone: Tone) -> Self {
        Self {
            should_quit: false,
            tab: Tab::Chat,
            input_mode: InputMode::Editing,
            chat: ChatPanel::new(Arc::clone(&backend)),
            analyze: AnalyzePanel::new(Arc::clone(&backend)),
            generate: GeneratePanel::new(backend, tone),
            animation_frame: 0,
            api_url: api_url.to_string(),
            tabs_area: None,
            output_area: None,
        }
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn is_loading(&self, tab: Tab) -> bool {
        match tab {
            Tab::Chat => self.chat.is_loading(),
            Tab::Analyze => self.analyze.is_loading(),
            Tab::Generate => self.generate.is_loading(),
        }
    }

    pub fn any_loading(&self) -> bool {
        Tab::all().into_iter().any(|tab| self.is_loading(tab))
    }

    /// Input of the visible panel, unless it is locked by an outstanding request.
    pub fn active_input(&mut self) -> Option<&mut TextInput> {
        if self.is_loading(self.tab) {
            return None;
        }
        Some(match self.tab {
            Tab::Chat => &mut self.chat.input,
            Tab::Analyze => &mut self.analyze.input,
            Tab::Generate => &mut self.generate.input,
        })
    }

    pub fn active_result(&mut self) -> Option<&mut ResultView> {
        match self.tab {
            Tab::Chat => None,
            Tab::Analyze => Some(&mut self.analyze.result),
            Tab::Generate => Some(&mut self.generate.result),
        }
    }

    pub fn submit_active(&mut self) -> Submit {
        match self.tab {
            Tab::Chat => self.chat.submit(),
            Tab::Analyze => self.analyze.submit(),
            Tab::Generate => self.generate.submit(),
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        match self.active_result() {
            Some(result) => result.scroll = result.scroll.saturating_add(lines),
            None => self.chat.scroll_down(lines),
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.active_result() {
            Some(result) => result.scroll = result.scroll.saturating_sub(lines),
            None => self.chat.scroll_up(lines),
        }
    }

    pub fn scroll_top(&mut self) {
        match self.active_result() {
            Some(result) => result.scroll = 0,
            None => {
                self.chat.scroll = 0;
                self.chat.follow = false;
            }
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.active_result() {
            Some(result) => result.scroll = u16::MAX,
            None => self.chat.follow = true,
        }
    }

    /// Advance the loading animation (called by Tick event)
    pub fn tick(&mut self) {
        if self.any_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Apply any responses that arrived since the last tick. Panels are
    /// independent; each settles on its own.
    pub async fn poll_requests(&mut self) {
        self.chat.poll().await;
        self.analyze.poll().await;
        self.generate.poll().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::fake::FakeBackend;

    fn app() -> App {
        App::new(Arc::new(FakeBackend::new().reply_ok("réponse")), "http://localhost:8000", Tone::default())
    }

    #[test]
    fn tab_cycle_round_trips() {
        for tab in Tab::all() {
            assert_eq!(tab.next().prev(), tab);
            assert_eq!(Tab::all()[tab.index()], tab);
        }
    }

    #[tokio::test]
    async fn switching_tabs_keeps_panel_state() {
        let mut app = app();
        app.select_tab(Tab::Analyze);
        app.active_input().unwrap().set("Nom,Age");
        app.select_tab(Tab::Generate);
        app.generate.next_tone();
        app.select_tab(Tab::Chat);
        app.select_tab(Tab::Analyze);

        assert_eq!(app.analyze.input.value(), "Nom,Age");
        assert_eq!(app.generate.tone, Tone::Amical);
    }

    #[tokio::test]
    async fn input_is_locked_while_request_is_outstanding() {
        let mut app = app();
        app.chat.input.set("Bonjour");
        assert_eq!(app.submit_active(), Submit::Sent);
        assert!(app.active_input().is_none());

        app.chat.wait().await;
        assert!(app.active_input().is_some());
        assert_eq!(app.chat.entries().len(), 2);
    }

    #[tokio::test]
    async fn request_survives_tab_switch() {
        let mut app = app();
        app.chat.input.set("Bonjour");
        app.submit_active();
        app.select_tab(Tab::Generate);
        assert!(app.is_loading(Tab::Chat));
        assert!(!app.is_loading(Tab::Generate));

        app.chat.wait().await;
        app.poll_requests().await;
        assert_eq!(app.chat.entries()[1].content, "réponse");
    }
}
