use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, WrapErr, eyre};
use log::{debug, info, warn};

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytsum::config::{Config, Credentials, Settings};
use ytsum::server::AppState;
use ytsum::summarize::{LlmSummarizer, Summarizer};
use ytsum::youtube::{CaptionFetcher, TranscriptFetcher};

const SUPPORTED_FORMATS: &str = "Supported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>";

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytsum.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytsum")
        .join("logs")
}

fn key_line(var: &str, models: &str) -> String {
    if std::env::var_os(var).is_some_and(|v| !v.is_empty()) {
        format!("  \x1b[32m✅\x1b[0m {var}")
    } else {
        format!("  \x1b[31m❌\x1b[0m {var} (not set, needed to summarize with {models})")
    }
}

fn build_after_help() -> String {
    let openai = key_line("OPENAI_API_KEY", "gpt-* models");
    let anthropic = key_line("ANTHROPIC_API_KEY", "claude-* models");

    format!(
        "\nCREDENTIALS:\n{openai}\n{anthropic}\n\nConfig is read from: {}\nLogs are written to: {}",
        ytsum::config::config_path().display(),
        log_dir().join("ytsum.log").display()
    )
}

fn resolve_video_id(input: &str) -> Result<String> {
    ytsum::extract_video_id(input).ok_or_else(|| eyre!("could not extract video ID from: {input}\n\n{SUPPORTED_FORMATS}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Config file problems are not fatal
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring config file: {e}");
        Config::default()
    });

    let credentials = Credentials::new(cli.openai_api_key.clone(), cli.anthropic_api_key.clone());
    let settings = Settings::resolve(config, cli.overrides(), credentials);
    debug!("Resolved settings: {settings:?}");

    if cli.verbose {
        let config_path = ytsum::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!(
            "Model: {} (max_tokens={}, prompt={:?})\nLanguage: {}",
            settings.model, settings.max_tokens, settings.prompt_style, settings.lang
        );
    }

    let client = reqwest::Client::new();
    let fetcher = CaptionFetcher::new(client.clone(), settings.lang.clone());
    let summarizer = LlmSummarizer::new(
        client,
        settings.model.clone(),
        settings.max_tokens,
        settings.prompt_style,
        settings.credentials.clone(),
    );

    match cli.command {
        Command::Serve { .. } => {
            if let Some(var) = settings.missing_api_key() {
                warn!("{var} is not set; summarize requests with {} will fail", settings.model);
                eprintln!("warning: {var} is not set; summarize requests with {} will fail", settings.model);
            }
            let state = AppState {
                fetcher: Arc::new(fetcher),
                summarizer: Arc::new(summarizer),
            };
            ytsum::server::serve(&settings.host, settings.port, state).await?;
        }
        Command::Transcript { ref url, format } => {
            let video_id = resolve_video_id(url)?;
            let transcript = fetcher.fetch(&video_id).await?;

            if cli.verbose {
                eprintln!(
                    "Video: {} ({})\nLanguage: {}\nSegments: {}",
                    transcript.title,
                    transcript.video_id,
                    transcript.language,
                    transcript.segments.len(),
                );
            }

            let rendered = match format {
                OutputFormat::Text => ytsum::output::render_text(&transcript),
                OutputFormat::Json => ytsum::output::render_json(&transcript)?,
            };
            println!("{rendered}");
        }
        Command::Summarize { ref url, html, .. } => {
            let video_id = resolve_video_id(url)?;
            let transcript = fetcher.fetch(&video_id).await?;
            if cli.verbose {
                eprintln!("Fetched {} segments, summarizing...", transcript.segments.len());
            }

            let summary = summarizer
                .summarize(&transcript.text())
                .await
                .wrap_err("failed to summarize transcript")?;

            if html {
                println!("{}", ytsum::render::render_summary(&summary));
            } else {
                println!("{summary}");
            }
        }
    }

    Ok(())
}
