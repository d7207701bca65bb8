//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// msikit - Author installer packages from the command line
#[derive(Parser, Debug)]
#[command(name = "msikit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Author a package from a source directory
    Build(BuildArgs),

    /// Inspect the tables of an existing package
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Output package path
    #[arg(short, long, default_value = "product.msi")]
    pub output: PathBuf,

    /// Product name
    #[arg(long, default_value = "Example Product")]
    pub product_name: String,

    /// Product version (major.minor.patch)
    #[arg(long, default_value = "1.0.0")]
    pub product_version: String,

    /// Manufacturer recorded in the package properties
    #[arg(long, default_value = "example")]
    pub manufacturer: String,

    /// Upgrade code shared by all versions of the product; generated when
    /// omitted (a stable one is needed for upgrade detection to work)
    #[arg(long)]
    pub upgrade_code: Option<String>,

    /// Directory holding the payload files
    #[arg(long, default_value = "resource")]
    pub source_dir: PathBuf,

    /// Key-path file inside the source directory
    #[arg(long, default_value = "service.exe")]
    pub key_file: String,

    /// Windows service name to register for the key file
    #[arg(long)]
    pub service_name: Option<String>,

    /// Embedded script driving shortcut creation and post-install launch
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Icon file for the generated shortcuts
    #[arg(long)]
    pub icon: Option<PathBuf>,

    /// Target architecture recorded in the summary stream
    #[arg(long, default_value = "x86")]
    pub arch: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Package path to open read-only
    pub package: PathBuf,

    /// Print the rows of one table instead of the per-table counts
    #[arg(long)]
    pub table: Option<String>,
}
