use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskman::api;
use taskman::config::Config;
use taskman::models::CreateUserInput;

#[derive(Parser)]
#[command(name = "taskman")]
#[command(about = "Task tracker with projects, sprints and hierarchical statuses")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "TASKMAN_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config)
    #[arg(long, global = true, env = "TASKMAN_DATABASE")]
    database: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long, global = true, env = "TASKMAN_BIND")]
    bind: Option<String>,

    /// Port for the HTTP server
    #[arg(short, long, global = true, env = "TASKMAN_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Check whether a server is answering
    Status,
    /// Create a user. The password is read from TASKMAN_PASSWORD.
    CreateUser {
        username: String,

        #[arg(long)]
        email: Option<String>,
    },
    /// Create or upgrade the database schema
    Migrate,
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "taskman=debug,taskman_core=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await?,
        Commands::Status => {
            let url = format!("http://{}/api/health", config.address());
            match reqwest::get(&url).await {
                Ok(resp) if resp.status().is_success() => {
                    let body: serde_json::Value = resp.json().await?;
                    println!(
                        "taskman is running at {} (version {})",
                        config.address(),
                        body["version"].as_str().unwrap_or("unknown")
                    );
                }
                Ok(resp) => {
                    anyhow::bail!("server at {} answered {}", config.address(), resp.status())
                }
                Err(err) => anyhow::bail!("server at {} is not reachable: {}", config.address(), err),
            }
        }
        Commands::CreateUser { username, email } => {
            let password = std::env::var("TASKMAN_PASSWORD")
                .context("TASKMAN_PASSWORD must hold the new user's password")?;
            let db = config.open_database()?;
            let user = db.create_user(CreateUserInput {
                username,
                email,
                password: password.clone(),
                password_confirm: password,
            })?;
            println!("Created user {} (id {})", user.username, user.id);
        }
        Commands::Migrate => {
            config.open_database()?;
            println!("Database schema is up to date");
        }
    }

    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let address = config.address();
    let app = api::create_router(api::AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!("taskman server listening on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
