//! The Builders multiplayer game server.

use builders_core::GameConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod interfacer;
mod protocol;
mod room;
mod server;

use server::ServerState;

/// Game settings from the environment: `GAME_CONFIG` holds JSON, `GAME_SEED`
/// overrides the seed.
fn game_config_from_env() -> anyhow::Result<GameConfig> {
    game_config_from(
        std::env::var("GAME_CONFIG").ok().as_deref(),
        std::env::var("GAME_SEED").ok().as_deref(),
    )
}

fn game_config_from(json: Option<&str>, seed: Option<&str>) -> anyhow::Result<GameConfig> {
    let mut config = match json {
        Some(json) => GameConfig::from_json(json)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = Some(seed.parse()?);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    let game_config = game_config_from_env()?;
    info!("Starting Builders server with {:?}", game_config);

    let state = Arc::new(ServerState::new(game_config));

    server::run_server(addr, state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        assert_eq!(game_config_from(None, None).unwrap(), GameConfig::default());
    }

    #[test]
    fn test_seed_overrides_json() {
        let config = game_config_from(Some(r#"{"seed": 1, "hand_size": 3}"#), Some("42")).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.hand_size, 3);
    }

    #[test]
    fn test_unplayable_config_fails_startup() {
        let err = game_config_from(Some(r#"{"work_per_floor": 0}"#), None).unwrap_err();
        assert!(err.to_string().contains("work_per_floor"));

        assert!(game_config_from(Some(r#"{"hand_size": 0}"#), None).is_err());
        assert!(game_config_from(Some(r#"{"floors_to_win": 0}"#), None).is_err());
    }

    #[test]
    fn test_bad_seed_fails_startup() {
        assert!(game_config_from(None, Some("soon")).is_err());
    }
}
