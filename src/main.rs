use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "reel-tui", version)]
#[command(
    about = "Reel: scroll recommended short videos from the terminal",
    long_about = None
)]
struct Cli {
    /// Recommendation service base URL (default http://localhost:5000)
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Read configuration from PATH instead of ~/.config/reel-tui/config.yaml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl From<Cli> for reel_tui::RunOptions {
    fn from(cli: Cli) -> Self {
        Self {
            config_file: cli.config,
            endpoint: cli.endpoint,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = reel_tui::run(cli.into()) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
