//! society-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and serves the Society Connect API over HTTP.
//!
//! # Bootstrapping
//!
//! Accounts are created from the command line. Those added with `--pending`
//! cannot log in until a committee member or admin approves them through
//! `PUT /api/users/{id}`. The first committee account:
//!
//! ```text
//! cargo run -p society-server -- add-user --email chair@example.com \
//!   --first-name Asha --last-name Rao --role committee
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use society_core::{role::Role, store::SocietyStore, user::NewUser};
use society_server::{AppState, ServerConfig, auth};
use society_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Society Connect visitor management server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run the HTTP server (the default).
  Serve,
  /// Create an account. The password is read from stdin.
  AddUser {
    #[arg(long)]
    email:      String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name:  String,
    /// owner, tenant, committee, admin or security.
    #[arg(long)]
    role:       Role,
    /// Flat number; required for owners and tenants.
    #[arg(long)]
    flat:       Option<String>,
    /// Leave the account awaiting committee approval.
    #[arg(long)]
    pending:    bool,
  },
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Some(Command::HashPassword) = cli.command {
    let password = read_password()?;
    println!("{}", auth::hash_password(&password)?);
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SOCIETY"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Some(Command::AddUser {
      email,
      first_name,
      last_name,
      role,
      flat,
      pending,
    }) => {
      if role.is_resident() && flat.is_none() {
        anyhow::bail!("--flat is required for {role} accounts");
      }
      let password = read_password()?;
      if password.is_empty() {
        anyhow::bail!("password must not be empty");
      }
      let user = store
        .add_user(NewUser {
          first_name,
          last_name,
          email,
          role,
          flat_number: flat,
          is_active: true,
          is_approved: !pending,
          password_hash: auth::hash_password(&password)?,
        })
        .await
        .context("failed to create user")?;
      println!("{}", user.id);
      Ok(())
    }
    Some(Command::HashPassword) | Some(Command::Serve) | None => {
      serve(store, server_cfg).await
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let purged = store
    .purge_expired_sessions(Utc::now())
    .await
    .context("failed to purge expired sessions")?;
  if purged > 0 {
    tracing::info!(purged, "dropped expired sessions");
  }

  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg.clone()),
  };

  let app = society_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from a single line of stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
