use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use teachbot::chat::{self, ChatBackend, ChatClient};
use teachbot::constants;
use teachbot::web_server::{self, ServerConfig};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the chat server and web widget.
    Start {
        #[arg(long, env = "TEACHBOT_PORT", default_value_t = *constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, env = "TEACHBOT_KB_PATH", default_value_t = constants::KNOWLEDGE_BASE_PATH.clone(), help = "Knowledge base JSON file.")]
        knowledge_base: String,
        #[arg(long, env = "TEACHBOT_STATIC_DIR", default_value_t = constants::STATIC_DIR.clone(), help = "Directory served under /static.")]
        static_dir: String,
    },
    /// Chat with a running server from the terminal.
    Chat {
        #[arg(long, env = "TEACHBOT_URL", default_value_t = constants::SERVER_URL.clone(), help = "Base URL of the chat server.")]
        url: String,
    },
    /// Teach a running server one answer without chatting.
    Teach {
        #[arg(long, help = "The question to answer.")]
        question: String,
        #[arg(long, help = "The answer to learn.")]
        answer: String,
        #[arg(long, env = "TEACHBOT_URL", default_value_t = constants::SERVER_URL.clone(), help = "Base URL of the chat server.")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for TEACHBOT_* overrides)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,teachbot=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    info!("Teachbot starting with command: {:?}", cli.command);

    match cli.command {
        Commands::Start { port, knowledge_base, static_dir } => {
            let config = ServerConfig {
                port,
                knowledge_base_path: PathBuf::from(knowledge_base),
                static_dir: PathBuf::from(static_dir),
                ..ServerConfig::default()
            };
            info!("Starting Teachbot on port {}...", port);

            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(config).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            // Pin the ctrl_c future to the stack so its address is stable
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, initiating shutdown...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed unexpectedly."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Chat { url } => {
            info!("Starting interactive chat session with {}...", url);
            chat::run_terminal_chat(&url).await;
            info!("Chat session finished.");
        }
        Commands::Teach { question, answer, url } => {
            let client = ChatClient::new(url);
            let reply = client
                .learn(&question, &answer)
                .await
                .context("Failed to teach the server")?;
            println!("{}", reply);
        }
    }

    Ok(())
}
