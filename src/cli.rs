use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "deskhost",
    version,
    about = "Desktop application controller: spawns the backend worker, waits for readiness, presents the surface"
)]
pub struct Cli {
    /// Path to the configuration file (default: ./deskhost.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hide the surface shortly after startup and show a one-shot notification
    #[arg(long)]
    pub autohide: bool,

    /// Ignore the persisted exit state; never offer session restore
    #[arg(long = "no-session-restore")]
    pub no_session_restore: bool,

    /// Development mode: load content from the dev server, open devtools
    #[arg(long)]
    pub dev: bool,

    /// Override the state file location
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}
