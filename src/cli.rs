use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tunnel")]
#[command(author, version, about = "Forward uploaded files to a Telegram group", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the upload server
    Run {
        /// Override HOST
        #[arg(long)]
        host: Option<String>,

        /// Override PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration and exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
