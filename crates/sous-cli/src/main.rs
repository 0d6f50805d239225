//! sous CLI — voice-guided recipe walker.
//!
//! ```text
//! sous cook [--dish omelette] [--mute]
//! sous serve [--port 2004] [--host 127.0.0.1]
//! sous make "omelette" [--server http://localhost:2004]
//! sous next / previous / repeat / start-over / dismiss / view [--server ...]
//! ```
//!
//! The API key is read from `GEMINI_API_KEY` (or `API_KEY`).

mod render;

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sous_lib::app::RecipeApp;
use sous_lib::gemini::{GeminiClient, api_key_from_env};
use sous_lib::kokoro::KokoroBackend;
use sous_lib::narrator::{LogBackend, Narrator, SpeechBackend};
use sous_lib::source::{RecipeSource, Unconfigured};
use sous_lib::sous_core::types::{
    DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL, DEFAULT_LANGUAGE, GeneratorConfig, SpeechConfig,
    ViewState,
};

use crate::render::{RecipeKey, parse_recipe_key, render};

const DEFAULT_SERVER: &str = "http://localhost:2004";

/// sous — a recipe, one spoken step at a time
#[derive(Parser)]
#[command(name = "sous", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk through a recipe in the terminal
    Cook {
        /// Dish to start with instead of prompting
        #[arg(long)]
        dish: Option<String>,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Start the HTTP API
    Serve {
        /// Listen port
        #[arg(long, default_value = "2004")]
        port: u16,
        /// Listen host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Ask the running server for a recipe
    Make {
        /// Dish name
        dish: String,
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Go to the next step
    Next {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Go to the previous step
    Previous {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Read the current step again
    Repeat {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Drop the recipe and return to the dish prompt
    StartOver {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Clear an error
    Dismiss {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Show the current view
    View {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
}

/// Generation and speech settings shared by `cook` and `serve`.
#[derive(Args)]
struct EngineArgs {
    /// Gemini model
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    model: String,
    /// Gemini API base URL
    #[arg(long, default_value = DEFAULT_GEMINI_URL)]
    api_url: String,
    /// Request timeout for recipe generation (none by default)
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Kokoro TTS server URL
    #[arg(long, default_value = "http://localhost:8880")]
    kokoro_url: String,
    /// TTS voice
    #[arg(long, default_value = "af_heart")]
    voice: String,
    /// TTS playback speed
    #[arg(long, default_value = "1.0")]
    speed: f32,
    /// Spoken-language tag
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    language: String,
    /// Log steps instead of speaking them
    #[arg(long)]
    mute: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Cook { dish, engine } => cook(build_app(engine), dish).await,

        Command::Serve { port, host, engine } => {
            let app = build_app(engine);
            let router = sous_lib::server::router(app);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!("sous listening on {addr}");

            axum::serve(listener, router).await.context("server error")
        }

        Command::Make { dish, server } => {
            let resp = reqwest::Client::new()
                .post(format!("{server}/recipe"))
                .json(&serde_json::json!({ "dish": dish }))
                .send()
                .await
                .context("request failed")?;
            println!("{}", response_body(resp).await?);
            Ok(())
        }

        Command::Next { server } => post_simple(&server, "next").await,
        Command::Previous { server } => post_simple(&server, "previous").await,
        Command::Repeat { server } => post_simple(&server, "repeat").await,
        Command::StartOver { server } => post_simple(&server, "start-over").await,
        Command::Dismiss { server } => post_simple(&server, "dismiss").await,

        Command::View { server } => {
            let resp = reqwest::Client::new()
                .get(format!("{server}/view"))
                .send()
                .await
                .context("request failed")?;
            println!("{}", response_body(resp).await?);
            Ok(())
        }
    }
}

/// Wire up generator and narrator. Configuration problems never abort:
/// a missing key becomes the first thing the user sees in the Error view.
fn build_app(args: EngineArgs) -> RecipeApp {
    let speech = SpeechConfig {
        kokoro_url: args.kokoro_url,
        voice: args.voice,
        speed: args.speed,
        language: args.language,
    };

    let backend: Arc<dyn SpeechBackend> = if args.mute {
        Arc::new(LogBackend)
    } else {
        match KokoroBackend::new(&speech) {
            Ok(kokoro) => Arc::new(kokoro),
            Err(e) => {
                warn!("speech unavailable, logging steps instead: {e}");
                Arc::new(LogBackend)
            }
        }
    };
    let narrator = Narrator::new(backend, speech.language);

    let config = GeneratorConfig {
        api_key: api_key_from_env().unwrap_or_default(),
        model: args.model,
        base_url: args.api_url,
        timeout_secs: args.timeout_secs,
    };

    match GeminiClient::new(config) {
        Ok(client) => RecipeApp::new(Arc::new(client), narrator),
        Err(e) => {
            warn!("recipe generation unavailable: {e}");
            let source: Arc<dyn RecipeSource> = Arc::new(Unconfigured(e.clone()));
            let app = RecipeApp::new(source, narrator);
            app.report_error(&e);
            app
        }
    }
}

async fn cook(app: RecipeApp, dish: Option<String>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(dish) = dish {
        if app.snapshot().view == ViewState::Input {
            submit(&app, &dish).await;
        }
    }

    loop {
        let snap = app.snapshot();
        println!("\n{}", render(&snap));

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        match snap.view {
            ViewState::Input => {
                if line.trim().is_empty() {
                    break;
                }
                submit(&app, &line).await;
            }
            ViewState::Recipe => match parse_recipe_key(&line) {
                Some(RecipeKey::Next) => {
                    app.next();
                }
                Some(RecipeKey::Previous) => {
                    app.previous();
                }
                Some(RecipeKey::Repeat) => {
                    app.repeat();
                }
                Some(RecipeKey::StartOver) => {
                    app.start_over();
                }
                Some(RecipeKey::Quit) => break,
                None => println!("unknown command {:?}", line.trim()),
            },
            ViewState::Error => {
                if matches!(line.trim(), "q" | "quit") {
                    break;
                }
                app.dismiss_error();
            }
            // Submissions are awaited inline, so this is never read.
            ViewState::Loading => {}
        }
    }
    Ok(())
}

/// Submit and show the Loading view once the fetch is underway.
async fn submit(app: &RecipeApp, dish: &str) {
    let submission = app.submit(dish);
    tokio::pin!(submission);

    let result = tokio::select! {
        biased;
        done = &mut submission => done,
        _ = std::future::ready(()) => {
            println!("{}", render(&app.snapshot()));
            submission.await
        }
    };
    if let Err(e) = result {
        println!("{e}");
    }
}

async fn post_simple(server: &str, endpoint: &str) -> anyhow::Result<()> {
    let resp = reqwest::Client::new()
        .post(format!("{server}/{endpoint}"))
        .send()
        .await
        .context("request failed")?;
    println!("{}", response_body(resp).await?);
    Ok(())
}

async fn response_body(resp: reqwest::Response) -> anyhow::Result<String> {
    resp.text().await.context("failed to read response")
}
