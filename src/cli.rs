use clap::{Parser, Subcommand};

/// passgate: user registration and bearer-token authentication service
#[derive(Parser)]
#[command(name = "passgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to PASSGATE_PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply database migrations and exit
    Migrate,

    /// Manage users directly in the store
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: Option<String>,
        /// Plaintext access key; read from PASSGATE_ACCESS_KEY if omitted
        #[arg(long, env = "PASSGATE_ACCESS_KEY", hide_env_values = true)]
        access_key: String,
    },
    /// List registered users
    List {
        #[arg(long, default_value = "100")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
    },
}
