//! Interactive chat against GitHub Models or any OpenAI-compatible endpoint.
//!
//! # Usage
//!
//! ```bash
//! # Prompts for the token and the model
//! modelchat
//!
//! # Pick the model up front
//! modelchat --model openai/gpt-4.1
//!
//! # Talk to a local server with a short history
//! modelchat --endpoint http://localhost:8080/v1 --max-history 4
//!
//! # Sampling settings
//! modelchat --temperature 0.2 --max-tokens 512
//!
//! # Disable colors (useful for piping output)
//! modelchat --no-color
//! ```
//!
//! Log output goes to stderr and is controlled by `MODELCHAT_LOG`
//! (an `EnvFilter` directive, default `warn`).
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/stats` - Show session statistics
//! - `/exit` - Exit the application

use arrrg::CommandLine;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use modelchat::cancel::install_interrupt_handler;
use modelchat::chat::orchestrator::CANCELLED_MESSAGE;
use modelchat::chat::{
    ChatArgs, ChatConfig, ChatSession, LoopExit, PlainTextRenderer, Renderer, run_chat_loop,
};
use modelchat::input::{
    DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH, ReadlineInput, read_secret, read_validated,
};
use modelchat::{InferenceClient, Result};

const LOG_ENV: &str = "MODELCHAT_LOG";

/// Main entry point for the modelchat application.
#[tokio::main]
async fn main() {
    let (args, _) = ChatArgs::from_command_line_relaxed("modelchat [OPTIONS]");
    init_tracing();

    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    match run(config, &mut renderer).await {
        Ok(LoopExit::Cancelled) => {}
        Ok(exit) => {
            tracing::debug!(?exit, "session ended");
            renderer.print_info("Goodbye!");
        }
        Err(err) if err.is_cancelled() => renderer.display_error(CANCELLED_MESSAGE),
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            renderer.display_error(&format!("Fatal error: {err}"));
            std::process::exit(1);
        }
    }
}

async fn run(config: ChatConfig, renderer: &mut PlainTextRenderer) -> Result<LoopExit> {
    renderer.write_header(true);

    let credential = read_secret(renderer, "Enter your GitHub token")?;
    let mut input = ReadlineInput::new()?;
    let model = match config.model.clone() {
        Some(model) => model,
        None => read_validated(
            &mut input,
            renderer,
            "Enter the model name: ",
            DEFAULT_MIN_LENGTH,
            DEFAULT_MAX_LENGTH,
        )?,
    };
    let config = config.with_model(model.as_str());

    let client =
        InferenceClient::with_timeout(&config.endpoint, &credential, &model, config.timeout)?
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);
    tracing::info!(url = %client.completions_url(), model = %model, "client ready");

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone())?;

    renderer.write_header(true);
    renderer.print_info(&format!("Chatting with {model}. Type /help for commands, /exit to quit.\n"));

    let mut session = ChatSession::new(client, config);
    run_chat_loop(&mut session, &mut input, renderer, &cancel).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
