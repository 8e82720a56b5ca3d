use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ytbrief",
    about = "Telegram bot that summarizes YouTube videos and answers questions about them",
    version
)]
pub struct Cli {
    /// Config file (default: ~/.config/ytbrief/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model name passed to the generation endpoint
    #[arg(short, long)]
    pub model: Option<String>,

    /// Generation endpoint URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Print resolved settings on startup
    #[arg(short, long)]
    pub verbose: bool,
}
