pub mod api;
pub mod cms;
pub mod config;
pub mod content;
pub mod error;
pub mod intake;
pub mod loader;
pub mod render;
pub mod seo;
pub mod state;
pub mod storage;
pub mod syndication;
pub mod warmer;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use config::Config;
use state::AppState;

pub async fn run() -> error::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("GACHITORE_LOG"))
        .init();

    let config = Config::from_env()?;
    let state = AppState::new(config)?;

    let limit = state.config().warm_limit;
    tokio::spawn(warmer::warm_cache(state.fetcher().clone(), limit));

    api::run_server(state).await
}
