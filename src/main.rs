use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;

use frey::api::{ApiClient, Backend};
use frey::app::App;
use frey::config::Config;
use frey::lifecycle::{Interaction, Outcome, ResultView, Submit};
use frey::panels::{AnalyzePanel, ChatPanel, GeneratePanel};
use frey::tone::Tone;
use frey::tui::{self, EventHandler};
use frey::{handler, logging, ui};

#[derive(Parser)]
#[command(name = "frey")]
#[command(version, about = "Terminal client for the FREY assistant: chat, data analysis and content generation")]
struct Cli {
    /// Base URL of the FREY API (overrides FREY_API_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Write logs to this file instead of the default cache location
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message to the assistant and print the reply
    Chat {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Analyze CSV, JSON or plain text data and print the report
    Analyze {
        /// Read data from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Generate content about a subject
    Generate {
        /// Subject and writing instructions
        #[arg(required = true, num_args = 1..)]
        subject: Vec<String>,
        /// Writing tone (Professionnel, Amical, Drôle, Inspirant)
        #[arg(short, long)]
        tone: Option<Tone>,
    },
    /// Show the resolved configuration. With --api-url, save it to the config file.
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(matches!(cli.command, Some(Commands::Config)))?;

    let log_file = cli.log_file.clone().or_else(|| config.log_file.clone());
    let log_path = logging::init(log_file.as_deref(), cli.verbose)?;

    // Read once; every request of this session uses the same base URL.
    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    info!(%api_url, log = %log_path.display(), "starting frey");

    let backend: Arc<dyn Backend> = Arc::new(ApiClient::new(&api_url));

    match cli.command {
        None => {
            let mut app = App::new(backend, &api_url, config.initial_tone());
            run_tui(&mut app).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Chat { message }) => chat_once(backend, message.join(" ")).await,
        Some(Commands::Analyze { file }) => {
            let data = read_data(file)?;
            analyze_once(backend, data).await
        }
        Some(Commands::Generate { subject, tone }) => {
            let tone = tone.unwrap_or_else(|| config.initial_tone());
            generate_once(backend, subject.join(" "), tone).await
        }
        Some(Commands::Config) => show_or_save_config(config, cli.api_url, &api_url),
    }
}

/// The `config` subcommand must still work on a broken file, since it is how
/// the file gets rewritten.
fn load_config(lenient: bool) -> Result<Config> {
    if !lenient {
        return Config::load();
    }
    let (config, warning) = Config::load_lenient_from(&Config::get_config_path()?);
    if let Some(warning) = warning {
        eprintln!("{} {}", "Ignoring unreadable config:".yellow(), warning);
    }
    Ok(config)
}

async fn run_tui(app: &mut App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(app, event).await?,
                None => break,
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!("frey closed");
    result
}

fn read_data(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                bail!("No data to analyze: pass --file PATH or pipe data on stdin");
            }
            let mut data = String::new();
            stdin.read_to_string(&mut data).context("Failed to read stdin")?;
            Ok(data)
        }
    }
}

fn print_failure(message: &str) -> ExitCode {
    eprintln!("{}", message.red());
    ExitCode::FAILURE
}

fn print_result(result: &ResultView) -> ExitCode {
    match result.outcome() {
        Some(Outcome::Success(text)) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Some(Outcome::Failure(message)) => print_failure(message),
        None => ExitCode::SUCCESS,
    }
}

async fn chat_once(backend: Arc<dyn Backend>, message: String) -> Result<ExitCode> {
    let mut panel = ChatPanel::new(backend);
    panel.input.set(message);

    if panel.submit() == Submit::Invalid {
        return Ok(print_failure(panel.notice.as_deref().unwrap_or_default()));
    }
    panel.wait().await;

    Ok(match panel.entries().last() {
        Some(entry) if entry.failed => print_failure(&entry.content),
        Some(entry) => {
            println!("{}", entry.content);
            ExitCode::SUCCESS
        }
        None => ExitCode::SUCCESS,
    })
}

async fn analyze_once(backend: Arc<dyn Backend>, data: String) -> Result<ExitCode> {
    let mut panel = AnalyzePanel::new(backend);
    panel.input.set(data);
    if panel.submit() == Submit::Sent {
        eprintln!("{}", "Analyzing...".dimmed());
        panel.wait().await;
    }
    Ok(print_result(&panel.result))
}

async fn generate_once(backend: Arc<dyn Backend>, subject: String, tone: Tone) -> Result<ExitCode> {
    let mut panel = GeneratePanel::new(backend, tone);
    panel.input.set(subject);
    if panel.submit() == Submit::Sent {
        eprintln!("{}", format!("Generating ({})...", tone).dimmed());
        panel.wait().await;
    }
    Ok(print_result(&panel.result))
}

fn show_or_save_config(mut config: Config, new_url: Option<String>, resolved: &str) -> Result<ExitCode> {
    let path = Config::get_config_path()?;

    if let Some(url) = new_url {
        let url = url.trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            bail!("The API URL cannot be empty");
        }
        config.api_base_url = Some(url.clone());
        config.save()?;
        println!("{} {}", "Saved API URL:".green(), url);
        println!("{} {}", "Config file:".dimmed(), path.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "FREY configuration".bold().cyan());
    println!("  {:<12} {}", "config file".dimmed(), path.display());
    println!("  {:<12} {}", "api url".dimmed(), resolved);
    println!("  {:<12} {}", "tone".dimmed(), config.initial_tone());
    let log_file = config.log_file.unwrap_or_else(logging::default_log_path);
    println!("  {:<12} {}", "log file".dimmed(), log_file.display());
    Ok(ExitCode::SUCCESS)
}
