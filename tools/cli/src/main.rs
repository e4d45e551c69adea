//! filebox CLI - Command line front end for the filebox storage API.
//!
//! Signs in with one-time login links and browses, uploads and
//! downloads files in the signed-in user's space.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use filebox_client::config::default_config_file;
use filebox_client::{
    ClientConfig, FileEntry, FileId, Filebox, Navigator, Outcome, UploadFile, LOGIN_ROUTE,
};

#[derive(Parser)]
#[command(name = "filebox")]
#[command(about = "filebox - Browse and transfer files on a filebox server")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server base URL, overriding the configuration file.
    #[arg(short, long)]
    server: Option<String>,

    /// Where the session is stored, overriding the configuration file.
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which listing a command works in.
#[derive(Args)]
struct ScopeArgs {
    /// Parent folder id (default: top level).
    #[arg(short, long)]
    parent: Option<String>,

    /// Shared drive to browse.
    #[arg(long)]
    shared_drive: Option<String>,

    /// Browse the trash.
    #[arg(long)]
    deleted: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Email a one-time login link.
    LoginLink {
        /// Account email.
        #[arg(short, long)]
        email: String,
    },

    /// Sign in with the token from a login link.
    Login {
        /// One-time token.
        #[arg(short, long)]
        token: String,
    },

    /// Create an account.
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        organisation: String,
    },

    /// Sign out and forget the stored session.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Check the server and the local session.
    Status,

    /// List files.
    Ls {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Create an "Untitled Folder".
    Mkdir {
        /// Parent folder id (default: top level).
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Delete a file or folder.
    Rm {
        /// File id.
        id: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Rename a file or folder.
    Rename {
        /// File id.
        id: String,

        /// New name.
        name: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Upload local files.
    Upload {
        /// Files to upload, in order.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Destination folder id (default: top level).
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Download a file.
    Download {
        /// File id.
        id: String,

        /// Target directory.
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Print a preview URL for a file.
    Preview {
        /// File id.
        id: String,

        /// Open the URL in the default browser.
        #[arg(long)]
        open: bool,
    },
}

/// Tells the user to sign in again when the server rejects the session.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn navigate(&self, route: &str) {
        if route == LOGIN_ROUTE {
            eprintln!("Session expired. Run `filebox login-link --email <EMAIL>` to sign in again.");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = load_config(&cli)?;
    let app = Filebox::open(&config, Arc::new(CliNavigator))
        .await
        .context("Failed to open session")?;

    match cli.command {
        Commands::LoginLink { email } => cmd_login_link(&app, &email).await,

        Commands::Login { token } => cmd_login(&app, &token).await,

        Commands::Register {
            first_name,
            last_name,
            email,
            organisation,
        } => cmd_register(&app, &first_name, &last_name, &email, &organisation).await,

        Commands::Logout => cmd_logout(&app).await,

        Commands::Whoami => cmd_whoami(&app).await,

        Commands::Status => cmd_status(&app, &config).await,

        Commands::Ls { scope } => cmd_ls(&app, &scope).await,

        Commands::Mkdir { parent } => cmd_mkdir(&app, parent).await,

        Commands::Rm { id, scope } => cmd_rm(&app, &id, &scope).await,

        Commands::Rename { id, name, scope } => cmd_rename(&app, &id, &name, &scope).await,

        Commands::Upload { paths, parent } => cmd_upload(&app, &paths, parent).await,

        Commands::Download { id, dest, scope } => cmd_download(&app, &id, &dest, &scope).await,

        Commands::Preview { id, open } => cmd_preview(&app, &id, open).await,
    }
}

/// Configuration file, then command line overrides.
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let path = cli.config.clone().or_else(default_config_file);
    let mut config = match path {
        Some(path) => ClientConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(server) = &cli.server {
        config = config.with_base_url(server.clone());
    }
    if let Some(session_file) = &cli.session_file {
        config = config.with_session_file(session_file.clone());
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn parse_id(id: &str) -> Result<FileId> {
    FileId::new(id).context("Invalid file id")
}

/// Switch the listing to `scope` and make sure it is fresh.
async fn open_scope(app: &Filebox, scope: &ScopeArgs) -> Result<Vec<FileEntry>> {
    let changed = app
        .files
        .update_context(|ctx| {
            ctx.parent_id = scope.parent.clone();
            ctx.shared_drive = scope.shared_drive.clone();
            ctx.show_deleted = scope.deleted;
        })
        .await
        .context("Failed to list files")?;

    if !changed {
        app.files
            .fetch_listing()
            .await
            .context("Failed to list files")?;
    }
    Ok(app.files.files())
}

/// Look up `id` in the listing for `scope`.
async fn find_entry(app: &Filebox, id: &str, scope: &ScopeArgs) -> Result<FileEntry> {
    let id = parse_id(id)?;
    open_scope(app, scope)
        .await?
        .into_iter()
        .find(|f| f.id == id)
        .with_context(|| format!("No file {} in this folder (try --parent)", id))
}

fn print_outcome(outcome: Outcome<Value>, done: &str) -> Result<()> {
    match outcome {
        Outcome::Ok(body) => {
            println!("{}", done);
            if let Some(message) = body.get("message").and_then(Value::as_str) {
                println!("  Server: {}", message);
            }
            Ok(())
        }
        Outcome::Empty => {
            println!("{}", done);
            Ok(())
        }
        Outcome::Invalid(invalid) => anyhow::bail!("Rejected by server: {}", invalid.error),
    }
}

/// Request a login link.
async fn cmd_login_link(app: &Filebox, email: &str) -> Result<()> {
    info!("Requesting login link for {}", email);

    let outcome = app
        .auth
        .request_login_link(email)
        .await
        .context("Failed to request login link")?;

    print_outcome(outcome, "Login link sent. Check your inbox.")
}

/// Exchange a one-time token for a session.
async fn cmd_login(app: &Filebox, token: &str) -> Result<()> {
    match app
        .auth
        .exchange_token(token)
        .await
        .context("Failed to sign in")?
    {
        Outcome::Ok(payload) => {
            let who = payload
                .user
                .display_name()
                .unwrap_or_else(|| "unknown user".to_string());
            println!("Signed in as {}", who);
            Ok(())
        }
        Outcome::Empty => anyhow::bail!("Server returned no session"),
        Outcome::Invalid(invalid) => anyhow::bail!("Rejected by server: {}", invalid.error),
    }
}

/// Create an account.
async fn cmd_register(
    app: &Filebox,
    first_name: &str,
    last_name: &str,
    email: &str,
    organisation: &str,
) -> Result<()> {
    info!("Registering {}", email);

    let outcome = app
        .auth
        .register(first_name, last_name, email, organisation)
        .await
        .context("Failed to register")?;

    print_outcome(outcome, "Account created. Check your inbox for a login link.")
}

async fn cmd_logout(app: &Filebox) -> Result<()> {
    app.auth.logout().await.context("Failed to sign out")?;
    println!("Signed out.");
    Ok(())
}

async fn cmd_whoami(app: &Filebox) -> Result<()> {
    match app.auth.user().await {
        Some(user) if app.auth.is_authenticated().await => {
            println!(
                "{}",
                user.display_name()
                    .unwrap_or_else(|| "unknown user".to_string())
            );
            if let Some(email) = user.field("email") {
                println!("  Email: {}", email);
            }
            Ok(())
        }
        _ => anyhow::bail!("Not signed in"),
    }
}

async fn cmd_status(app: &Filebox, config: &ClientConfig) -> Result<()> {
    println!("Server: {}", config.base_url);
    match app.api.health().await {
        Ok(body) => println!("  Health: {}", body.trim()),
        Err(e) => println!("  Health: unreachable ({})", e),
    }
    println!("Session file: {}", config.session_file.display());
    println!(
        "  Signed in: {}",
        if app.auth.is_authenticated().await {
            "yes"
        } else {
            "no"
        }
    );
    Ok(())
}

async fn cmd_ls(app: &Filebox, scope: &ScopeArgs) -> Result<()> {
    let files = open_scope(app, scope).await?;

    if files.is_empty() {
        println!("Folder is empty.");
        return Ok(());
    }

    for file in files {
        if file.is_folder {
            println!("  [DIR]  {}  {}/", file.id, file.name);
        } else {
            let size = file
                .file_size
                .map(|s| format!(" ({} bytes)", s))
                .unwrap_or_default();
            println!("  [FILE] {}  {}{}", file.id, file.name, size);
        }
    }
    Ok(())
}

async fn cmd_mkdir(app: &Filebox, parent: Option<String>) -> Result<()> {
    app.files
        .create_folder(parent.as_deref())
        .await
        .context("Failed to create folder")?;
    println!("Folder created.");
    Ok(())
}

async fn cmd_rm(app: &Filebox, id: &str, scope: &ScopeArgs) -> Result<()> {
    let entry = find_entry(app, id, scope).await?;
    app.files
        .delete_file(&entry.id)
        .await
        .context("Failed to delete file")?;
    println!("Deleted: {}", entry.name);
    Ok(())
}

async fn cmd_rename(app: &Filebox, id: &str, name: &str, scope: &ScopeArgs) -> Result<()> {
    let entry = find_entry(app, id, scope).await?;
    app.files
        .rename_file(&entry.renamed(name))
        .await
        .context("Failed to rename file")?;
    println!("Renamed {} to {}", entry.name, name);
    Ok(())
}

async fn cmd_upload(app: &Filebox, paths: &[PathBuf], parent: Option<String>) -> Result<()> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let file = UploadFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        uploads.push(file);
    }

    app.files
        .set_parent(parent)
        .await
        .context("Failed to open folder")?;
    app.files
        .upload_files(&uploads)
        .await
        .context("Upload stopped")?;

    println!("Uploaded {} file(s).", uploads.len());
    Ok(())
}

async fn cmd_download(app: &Filebox, id: &str, dest: &Path, scope: &ScopeArgs) -> Result<()> {
    let entry = find_entry(app, id, scope).await?;
    if entry.is_folder {
        anyhow::bail!("{} is a folder", entry.name);
    }

    let saved = app
        .files
        .download_file(&entry, dest)
        .await
        .context("Failed to download file")?;
    println!("Saved {}", saved.display());
    Ok(())
}

async fn cmd_preview(app: &Filebox, id: &str, open_browser: bool) -> Result<()> {
    let url = app
        .files
        .preview_url(&parse_id(id)?)
        .await
        .context("Failed to get preview URL")?;
    println!("{}", url);

    if open_browser {
        open::that(&url).context("Failed to open browser")?;
    }
    Ok(())
}
