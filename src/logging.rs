use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_ENV: &str = "FREY_LOG";

/// `<cache dir>/frey/frey.log`, or `frey.log` in the working directory when
/// the platform has no cache dir.
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("frey"))
        .unwrap_or_default()
        .join("frey.log")
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "frey=debug" } else { "frey=info" }
}

fn build_filter(from_env: Option<String>, verbose: bool) -> EnvFilter {
    from_env
        .filter(|directive| !directive.trim().is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)))
}

/// Send tracing output to a log file. The terminal belongs to the UI, so
/// nothing is written to stdout or stderr.
pub fn init(path: Option<&Path>, verbose: bool) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_log_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let fmt_layer = fmt::Layer::new()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    Registry::default()
        .with(build_filter(std::env::var(LOG_ENV).ok(), verbose))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_default_level() {
        assert_eq!(build_filter(None, false).to_string().to_lowercase(), "frey=info");
        assert_eq!(build_filter(None, true).to_string().to_lowercase(), "frey=debug");
    }

    #[test]
    fn env_directive_wins_unless_blank() {
        let filter = build_filter(Some("frey=trace,reqwest=debug".into()), false);
        assert!(filter.to_string().to_lowercase().contains("frey=trace"));
        assert_eq!(
            build_filter(Some("  ".into()), true).to_string().to_lowercase(),
            "frey=debug"
        );
    }

    #[test]
    fn default_path_ends_in_frey_log() {
        assert!(default_log_path().ends_with("frey.log"));
    }
}
