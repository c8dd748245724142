use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config;
use crate::data::{HttpRecommendationSource, RecommendationSource};
use crate::logging;
use crate::recommend;
use crate::session::Session;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub endpoint: Option<String>,
}

pub fn run(options: RunOptions) -> Result<()> {
    let mut cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if let Some(endpoint) = options.endpoint {
        cfg.source.base_url = endpoint;
    }

    let log_path = match logging::init(&cfg.logging) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let config_path = options.config_file.or_else(config::default_path);
    let display_path = friendly_path(config_path.as_ref());

    let client = recommend::Client::new(cfg.source.client_config())
        .context("initialize recommendation client")?;
    let endpoint = client.endpoint().to_string();
    info!(
        version = crate::VERSION,
        %endpoint,
        log = ?log_path,
        "starting reel-tui"
    );

    let source: Arc<dyn RecommendationSource + Send + Sync> =
        Arc::new(HttpRecommendationSource::new(Arc::new(client)));
    let session = Session::new(source);

    let mut model = ui::Model::new(ui::Options {
        status_message: String::new(),
        session,
        player: cfg.player.clone(),
        theme: cfg.ui.theme.clone(),
        endpoint,
        config_path: display_path,
        load_on_start: true,
    });
    let result = model.run();
    if let Err(err) = &result {
        let detail = format!("{err:#}");
        warn!(error = %detail, "ui exited with error");
    }

    let history = model.session().history();
    info!(
        played = history.played().len(),
        liked = history.liked().len(),
        disliked = history.disliked().len(),
        "session ended"
    );
    result
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/reel-tui/config.yaml".to_string()
    }
}
