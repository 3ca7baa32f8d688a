//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "mimesniff")]
#[command(author, version, about = "Detect MIME types from file names and content", long_about = None)]
pub struct Cli {
    /// Files or directories to classify (`-` reads standard input)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Match file names only; do not read any content
    #[arg(long)]
    pub name_only: bool,

    /// Name matched against glob rules for standard input
    #[arg(long, value_name = "NAME")]
    pub as_name: Option<String>,

    /// Descend into directories
    #[arg(short, long)]
    pub recursive: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show every glob match and magic candidate, not only the winner
    #[arg(long)]
    pub explain: bool,

    /// Config file (defaults to $MIMESNIFF_CONFIG, then the user config dir)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
