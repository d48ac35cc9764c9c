use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use multi_agent_chat::app::App;
use multi_agent_chat::config::{AppConfig, ConversationConfig, DEFAULT_SECRETS_PATH};
use multi_agent_chat::credentials::CredentialLoader;
use multi_agent_chat::error::{ConfigError, Error};
use multi_agent_chat::router::{DEFAULT_ENDPOINT, RemoteRouterConfig};
use multi_agent_chat::terminal::TerminalChat;

#[derive(Parser)]
#[command(name = "multi-agent-chat", version, about = "Chat front end for a multi-agent router")]
struct Cli {
    /// Address the HTTP server binds to
    #[arg(long, env = "CHAT_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// HTTP port
    #[arg(long, env = "CHAT_PORT", default_value_t = 8080)]
    port: u16,

    /// TOML secrets file, consulted before the environment
    #[arg(long, env = "CHAT_SECRETS_PATH", default_value = DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,

    /// Agent router endpoint
    #[arg(long, env = "MASTER_AGENT_URL", default_value = DEFAULT_ENDPOINT)]
    router_url: String,

    /// Seconds to wait for the router (0 waits forever)
    #[arg(long, env = "CHAT_ROUTE_TIMEOUT_SECS", default_value_t = 120)]
    route_timeout_secs: u64,

    /// Seconds before an idle HTTP session is dropped
    #[arg(long, env = "CHAT_SESSION_IDLE_SECS", default_value_t = 3600)]
    session_idle_secs: u64,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy)]
enum Mode {
    /// Serve the HTTP and WebSocket chat (default)
    Serve,
    /// Chat in the terminal
    Chat,
}

impl Cli {
    fn config(&self) -> AppConfig {
        AppConfig {
            bind: self.bind,
            port: self.port,
            secrets_path: self.secrets.clone(),
            router: RemoteRouterConfig {
                endpoint: self.router_url.clone(),
            },
            conversation: ConversationConfig::from_timeout_secs(self.route_timeout_secs),
            session_idle_timeout: Duration::from_secs(self.session_idle_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    eprintln!("🤖 Multi-Agent Chat v{}", env!("CARGO_PKG_VERSION"));

    let loader = CredentialLoader::standard(&config.secrets_path);
    let app = match App::initialize(&config, &loader) {
        Ok(app) => app,
        Err(Error::Config(e @ ConfigError::MissingCredentials { .. })) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "  Please add them to `{}` or set as environment variables.",
                config.secrets_path.display()
            );
            std::process::exit(1);
        }
        Err(Error::Router(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("startup failed"),
    };

    for row in &app.status {
        eprintln!("   {}", row.render());
    }

    match cli.mode.unwrap_or(Mode::Serve) {
        Mode::Serve => {
            eprintln!("   Router: {}", config.router.endpoint);
            eprintln!("   Chat WS: ws://{}:{}/ws/chat", config.bind, config.port);
            eprintln!("   Chat API: http://{}:{}/api/sessions\n", config.bind, config.port);
            app.serve(&config).await.context("chat server failed")?;
        }
        Mode::Chat => {
            TerminalChat::new(app.controller, app.status)
                .run()
                .await
                .context("terminal chat failed")?;
        }
    }

    Ok(())
}
