//! Hostlink CLI
//!
//! Command-line client for a hosted backend.
//!
//! # Commands
//!
//! - `sign-up`, `sign-in`, `sign-out`, `whoami` - manage the saved session
//! - `select`, `insert`, `update`, `delete` - table access
//! - `upload`, `download`, `public-url` - blob storage
//! - `tag-snippet` - print the analytics tag manager markup

mod commands;

use clap::{Parser, Subcommand};
use commands::{Connection, Format};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Hostlink command-line backend client.
#[derive(Parser, Debug)]
#[command(name = "hostlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend base URL (defaults to $HOSTLINK_URL)
    #[arg(global = true, long)]
    url: Option<String>,

    /// Public API key (defaults to $HOSTLINK_PUBLIC_KEY)
    #[arg(global = true, long)]
    key: Option<String>,

    /// Session file (defaults to $HOSTLINK_SESSION_FILE, then ~/.hostlink/session.json)
    #[arg(global = true, long)]
    session_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new account and save its session
    SignUp {
        /// Account email
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Metadata entry as key=value (repeatable)
        #[arg(short, long = "meta")]
        meta: Vec<String>,
    },

    /// Sign in and save the session
    SignIn {
        /// Account email
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// End the saved session
    SignOut,

    /// Show the signed-in user
    Whoami,

    /// Read rows from a table
    Select {
        /// Table name
        table: String,

        /// Comma-separated columns
        #[arg(short, long, default_value = "*")]
        columns: String,

        /// Equality filter as column=value (repeatable)
        #[arg(long = "eq")]
        filters: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Insert a JSON object, or an array of objects, into a table
    Insert {
        /// Table name
        table: String,

        /// Row(s) as JSON
        json: String,
    },

    /// Apply a JSON patch to matching rows
    Update {
        /// Table name
        table: String,

        /// Patch as a JSON object
        json: String,

        /// Equality filter as column=value (repeatable)
        #[arg(long = "eq")]
        filters: Vec<String>,
    },

    /// Delete matching rows
    Delete {
        /// Table name
        table: String,

        /// Equality filter as column=value (repeatable)
        #[arg(long = "eq")]
        filters: Vec<String>,
    },

    /// Upload a file to a bucket
    Upload {
        /// Bucket name
        bucket: String,

        /// Object path inside the bucket
        path: String,

        /// Local file to upload
        file: PathBuf,

        /// Overwrite an existing object
        #[arg(long)]
        upsert: bool,

        /// MIME type of the file
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Download an object
    Download {
        /// Bucket name
        bucket: String,

        /// Object path inside the bucket
        path: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the public URL of an object (no request is made)
    PublicUrl {
        /// Bucket name
        bucket: String,

        /// Object path inside the bucket
        path: String,
    },

    /// Print the analytics tag manager snippet
    TagSnippet {
        /// Container id (defaults to $HOSTLINK_TAG_ID)
        #[arg(long)]
        tag_id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let connection = Connection {
        url: cli.url,
        key: cli.key,
        session_file: cli.session_file,
    };
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::SignUp {
            email,
            password,
            meta,
        } => {
            let facade = connection.facade()?;
            commands::auth::sign_up(&facade, &email, &password, &meta, &mut out).await?;
        }
        Commands::SignIn { email, password } => {
            let facade = connection.facade()?;
            commands::auth::sign_in(&facade, &email, &password, &mut out).await?;
        }
        Commands::SignOut => {
            let facade = connection.facade()?;
            commands::auth::sign_out(&facade, &mut out).await?;
        }
        Commands::Whoami => {
            let facade = connection.facade()?;
            commands::auth::whoami(&facade, &mut out).await?;
        }
        Commands::Select {
            table,
            columns,
            filters,
            format,
        } => {
            let facade = connection.facade()?;
            commands::tables::select(&facade, &table, &columns, &filters, format, &mut out)
                .await?;
        }
        Commands::Insert { table, json } => {
            let facade = connection.facade()?;
            commands::tables::insert(&facade, &table, &json, &mut out).await?;
        }
        Commands::Update {
            table,
            json,
            filters,
        } => {
            let facade = connection.facade()?;
            commands::tables::update(&facade, &table, &json, &filters, &mut out).await?;
        }
        Commands::Delete { table, filters } => {
            let facade = connection.facade()?;
            commands::tables::delete(&facade, &table, &filters, &mut out).await?;
        }
        Commands::Upload {
            bucket,
            path,
            file,
            upsert,
            content_type,
        } => {
            let facade = connection.facade()?;
            commands::storage::upload(
                &facade,
                &bucket,
                &path,
                &file,
                upsert,
                content_type,
                &mut out,
            )
            .await?;
        }
        Commands::Download {
            bucket,
            path,
            output,
        } => {
            let facade = connection.facade()?;
            commands::storage::download(&facade, &bucket, &path, output.as_deref(), &mut out)
                .await?;
        }
        Commands::PublicUrl { bucket, path } => {
            let config = connection.config()?;
            commands::storage::public_url(&config, &bucket, &path, &mut out)?;
        }
        Commands::TagSnippet { tag_id, format } => {
            commands::tags::snippet(tag_id, format, &mut out)?;
        }
        Commands::Version => {
            println!("Hostlink CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
