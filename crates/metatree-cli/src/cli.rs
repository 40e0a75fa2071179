use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mdt",
    about = "Browse and edit metadata packets as namespace trees",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty packet document
    Init(InitArgs),
    /// List the namespaces of a packet
    Namespaces(NamespacesArgs),
    /// Print namespace trees
    Show(ShowArgs),
    /// Print the node at a path
    Get(GetArgs),
    /// Write a value at a path, creating missing nodes
    Set(SetArgs),
    /// Delete the node at a path with everything below it
    Delete(DeleteArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub packet: PathBuf,
    /// Register the annotation namespace
    #[arg(long)]
    pub annotations: bool,
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct NamespacesArgs {
    pub packet: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    pub packet: PathBuf,
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub packet: PathBuf,
    pub path: String,
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    pub packet: PathBuf,
    pub path: String,
    /// JSON value; anything that is not JSON is written as text
    #[arg(allow_hyphen_values = true)]
    pub value: String,
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Create a JSON array as an unordered set
    #[arg(long)]
    pub unordered: bool,
    /// Save the packet after the change
    #[arg(short, long)]
    pub write: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub packet: PathBuf,
    pub path: String,
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Save the packet after the change
    #[arg(short, long)]
    pub write: bool,
}
