use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sentiscope-service")]
#[command(author, version, about = "Sentiment model service", long_about = None)]
pub struct Cli {
    /// Configuration file path (optional, YAML)
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Listen address, overrides HOST
    #[arg(short = 'l', long)]
    pub host: Option<String>,

    /// Listen port, overrides PORT
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
