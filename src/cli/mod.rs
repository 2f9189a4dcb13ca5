//! Command-line interface for crm-users.
//!
//! Every command builds the same `SharedState` the HTTP server uses, so forms
//! and providers behave identically in both places.

mod commands;

use clap::{Parser, Subcommand};

/// crm-users - CRM user management service
#[derive(Parser)]
#[command(name = "crm-users")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "web")]
    Serve,

    /// Create or edit users through the profile form
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show recent login attempts for an e-mail
    #[command(alias = "attempts")]
    LoginAttempts {
        /// E-mail as typed at login
        email: String,
        /// Number of entries to show
        #[arg(long, default_value_t = crate::constants::limits::DEFAULT_LOGIN_ATTEMPTS_LIMIT)]
        limit: u64,
    },

    /// Request a password reset token
    PasswordReset {
        email: String,
    },

    /// GDPR export and erasure
    Gdpr {
        #[command(subcommand)]
        command: GdprCommands,
    },

    /// Create default config file
    Init,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Update an existing user; omitted options keep their current value
    Update {
        /// User ID
        id: i32,
        #[arg(long)]
        email: Option<String>,
        /// New password; omit to keep the current one
        #[arg(long)]
        password: Option<String>,
        #[command(flatten)]
        profile: ProfileArgs,
    },
}

#[derive(clap::Args, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    /// `user` or `admin`
    #[arg(long)]
    pub role: Option<String>,
    #[arg(long)]
    pub active: Option<bool>,
    #[arg(long)]
    pub is_institution: Option<bool>,
    #[arg(long)]
    pub institution_name: Option<String>,
    #[arg(long)]
    pub ext_id: Option<String>,
}

#[derive(Subcommand)]
pub enum GdprCommands {
    /// Print everything stored about a user as JSON
    Download {
        user_id: i32,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<std::path::PathBuf>,
    },

    /// Erase a user's personal data
    Delete {
        user_id: i32,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

pub use commands::*;
