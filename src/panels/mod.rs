pub mod analyze;
pub mod chat;
pub mod generate;

pub use analyze::AnalyzePanel;
pub use chat::{ChatEntry, ChatPanel, ChatRole};
pub use generate::GeneratePanel;
