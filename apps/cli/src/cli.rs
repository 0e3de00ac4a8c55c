use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hupload_transfer::DestinationLayout;

#[derive(Parser, Debug)]
#[command(author, version, about = "Upload files to a hupload share")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings; each one overrides the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Server base URL, e.g. http://localhost:8080
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// User for HTTP Basic authentication
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Password for HTTP Basic authentication
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Whole-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Read settings from this file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload files into a share
    Upload(UploadArgs),

    /// List the items stored in a share
    Items {
        /// Share name
        #[arg(long, short)]
        share: String,
    },
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Share name
    #[arg(long, short)]
    pub share: String,

    /// How item names are appended to the share path (items or root)
    #[arg(long)]
    pub layout: Option<DestinationLayout>,

    /// Progress refresh interval in milliseconds
    #[arg(long, default_value_t = 250)]
    pub refresh_ms: u64,

    /// Files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
