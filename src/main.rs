//! # medidoc CLI
//!
//! The `medidoc` binary runs the document server and acts as a client
//! workspace: upload, list, download and delete documents, and render or
//! submit patient-intake forms.
//!
//! ## Usage
//!
//! ```bash
//! medidoc --config ./config/medidoc.toml <command>
//! medidoc --config ./config/medidoc.toml --remote --url http://127.0.0.1:5000 <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medidoc init` | Create the SQLite database and upload directory |
//! | `medidoc serve` | Start the HTTP server |
//! | `medidoc upload <file>` | Upload a PDF |
//! | `medidoc list` | List documents, newest first |
//! | `medidoc download <id>` | Save a document to disk |
//! | `medidoc delete <id>` | Delete a document |
//! | `medidoc intake render <form.toml>` | Render an intake form to PDF |
//! | `medidoc intake submit <form.toml>` | Render and upload an intake form |
//! | `medidoc check` | Report uploads and records that disagree |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medidoc::client::DocumentClient;
use medidoc::config::{self, Config};
use medidoc::workspace::{self, Workspace};
use medidoc::{app, migrate, server};

/// medidoc: upload, store and retrieve medical PDFs.
#[derive(Parser)]
#[command(
    name = "medidoc",
    about = "medidoc: a medical document upload and retrieval portal",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/medidoc.toml")]
    config: PathBuf,

    /// Send document commands to a running server instead of the local
    /// database and upload directory.
    #[arg(long, global = true)]
    remote: bool,

    /// Server URL for `--remote`. Defaults to `[client].base_url`, then to
    /// `http://` + `[server].bind`.
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and upload directory.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Start the HTTP server.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Upload a file.
    Upload {
        /// File to upload.
        path: PathBuf,

        /// Media type to send. Defaults to `application/pdf` for `.pdf` files.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// List documents, newest first.
    List {
        /// Print `{ "documents": [...] }` JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Download a document by id.
    Download {
        id: i64,

        /// Output file or directory. Defaults to the original file name.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Delete a document by id.
    Delete { id: i64 },

    /// Patient-intake forms.
    Intake {
        #[command(subcommand)]
        action: IntakeAction,
    },

    /// Report blobs without records and records without blobs.
    ///
    /// Read-only; always runs against the local database and upload directory.
    Check,
}

#[derive(Subcommand)]
enum IntakeAction {
    /// Render a TOML intake form to a PDF file without uploading.
    Render {
        form: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate, render and upload a TOML intake form.
    Submit { form: PathBuf },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medidoc=info,medidoc_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_workspace(cfg: &Config, remote: bool, url: Option<&str>) -> anyhow::Result<Workspace> {
    if !remote {
        return Ok(Workspace::Local(app::open_service(cfg).await?));
    }
    let url = url
        .map(str::to_string)
        .or_else(|| cfg.client.base_url.clone())
        .unwrap_or_else(|| format!("http://{}", cfg.server.bind));
    Ok(Workspace::Remote(DocumentClient::new(url)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Rendering needs no config
    if let Commands::Intake {
        action: IntakeAction::Render { form, out },
    } = &cli.command
    {
        workspace::run_intake_render(form, out.clone())?;
        return Ok(());
    }

    let mut cfg = config::load_config(&cli.config)?;
    let (remote, url) = (cli.remote, cli.url.as_deref());

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Upload { path, content_type } => {
            let ws = open_workspace(&cfg, remote, url).await?;
            workspace::run_upload(&ws, &path, content_type.as_deref()).await?;
        }
        Commands::List { json } => {
            let ws = open_workspace(&cfg, remote, url).await?;
            workspace::run_list(&ws, json).await?;
        }
        Commands::Download { id, out } => {
            let ws = open_workspace(&cfg, remote, url).await?;
            workspace::run_download(&ws, id, out).await?;
        }
        Commands::Delete { id } => {
            let ws = open_workspace(&cfg, remote, url).await?;
            workspace::run_delete(&ws, id).await?;
        }
        Commands::Intake { action } => match action {
            IntakeAction::Submit { form } => {
                let ws = open_workspace(&cfg, remote, url).await?;
                workspace::run_intake_submit(&ws, &form).await?;
            }
            IntakeAction::Render { form, out } => {
                workspace::run_intake_render(&form, out)?;
            }
        },
        Commands::Check => {
            let svc = app::open_service(&cfg).await?;
            workspace::run_check(&svc).await?;
        }
    }

    Ok(())
}
