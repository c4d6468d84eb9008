use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stowage::auth::{TokenOwner, issue_token};
use stowage::config::ServerConfig;
use stowage::server::{AppState, create_router};
use stowage::store::{SqliteStore, Store};
use stowage::types::{Capabilities, User};
use stowage::validation::validate_username;

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "A self-hosted file storage server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags given here override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and stored files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database and stored files
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print a token for it
    Create {
        /// Data directory for the database and stored files
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        #[arg(long)]
        username: String,

        /// Comma-separated capabilities, e.g. upload:files,namespace:read-foreign
        #[arg(long, value_delimiter = ',')]
        capabilities: Option<Vec<String>>,
    },
}

fn open_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok(store)
}

fn print_token(title: &str, raw_token: &str) {
    println!();
    println!("========================================");
    println!("{title}");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();
}

fn run_init(data_dir: &Path, non_interactive: bool) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)?;
    let store = open_store(data_dir)?;

    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    let token_file = config.admin_token_path();

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (raw_token, _) = issue_token(&store, TokenOwner::Admin, None)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    print_token(
        "Admin token (save this, it won't be shown again):",
        &raw_token,
    );
    println!("Token also written to: {}", token_file.display());

    if !non_interactive {
        create_default_user_prompt(&store)?;
    }

    Ok(())
}

fn create_user(
    store: &SqliteStore,
    username: &str,
    capabilities: Capabilities,
) -> anyhow::Result<(User, String)> {
    validate_username(username)?;
    if store.get_user_by_username(username)?.is_some() {
        bail!("User '{username}' already exists");
    }

    let now = Utc::now();
    let mut user = User {
        id: 0,
        username: username.to_string(),
        capabilities,
        created_at: now,
        updated_at: now,
    };
    user.id = store.create_user(&user)?;

    let (raw_token, _) = issue_token(store, TokenOwner::User(user.id), None)?;
    Ok((user, raw_token))
}

fn run_user_create(
    data_dir: &Path,
    username: &str,
    capabilities: Option<Vec<String>>,
) -> anyhow::Result<()> {
    let capabilities = match capabilities {
        Some(names) => Capabilities::parse_many(names.as_slice())
            .with_context(|| format!("Invalid capability in {names:?}"))?,
        None => Capabilities::default_user(),
    };

    let store = open_store(data_dir)?;
    let (user, raw_token) = create_user(&store, username, capabilities)?;

    print_token(
        &format!(
            "Created user '{}' ({}) with token:",
            user.username, user.capabilities
        ),
        &raw_token,
    );
    Ok(())
}

fn create_default_user_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let wanted = inquire::Confirm::new("Would you like to create a default user?")
        .with_default(false)
        .prompt()?;

    if !wanted {
        return Ok(());
    }

    let username = inquire::Text::new("Username:")
        .with_validator(|input: &str| match validate_username(input.trim()) {
            Ok(()) => Ok(inquire::validator::Validation::Valid),
            Err(e) => Ok(inquire::validator::Validation::Invalid(e.to_string().into())),
        })
        .prompt()?;

    let (user, raw_token) = create_user(store, username.trim(), Capabilities::default_user())?;
    print_token(&format!("Created user '{}' with token:", user.username), &raw_token);

    Ok(())
}

fn load_config(
    path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    Ok(config)
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let token_file = config.admin_token_path();
    let not_initialized =
        "Server not initialized. Run 'stowage admin init' first to create the database and admin token.";

    if !token_file.exists() {
        bail!(not_initialized);
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(not_initialized);
    }

    info!("Admin token available at {}", token_file.display());

    let state = Arc::new(AppState::new(Arc::new(store), &config)?);
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stowage=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(&data_dir, non_interactive)?,
            AdminCommands::User {
                command:
                    UserCommands::Create {
                        data_dir,
                        username,
                        capabilities,
                    },
            } => run_user_create(&data_dir, &username, capabilities)?,
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => {
            let config = load_config(config.as_deref(), host, port, data_dir)?;
            run_serve(config).await?;
        }
    }

    Ok(())
}
