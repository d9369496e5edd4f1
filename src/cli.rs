use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "barkeep")]
#[command(about = "Plugin-driven status line generator for i3bar-compatible bars", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print version information and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,
}
