//! Terminal client for the FREY assistant API: chat, data analysis and
//! tone-controlled content generation.

pub mod api;
pub mod app;
pub mod config;
pub mod handler;
pub mod input;
pub mod lifecycle;
pub mod logging;
pub mod markdown;
pub mod panels;
pub mod tone;
pub mod tui;
pub mod ui;
