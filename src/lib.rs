//! # encounter-copy
//!
//! Copy Encounter games between instances. A YAML job describes which game
//! to capture into a snapshot and where to replay it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use encounter_copy::{Config, Copier};
//!
//! # #[tokio::main]
//! # async fn main() -> encounter_copy::Result<()> {
//! let config = Config::load("copy.yaml")?;
//! let mut copier = Copier::launch(&config.browser).await?;
//! let result = copier.run(&config).await?;
//! println!("Success: {}", result.success);
//! copier.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod copier;

pub use config::{Config, LoadJob, OnFailure, ParamDef, Params, SaveJob};
pub use copier::{add_penalty_bonuses, load_game, save_game, CopyResult, Copier};

/// Result type for encounter-copy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from loading a job or running it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Game(#[from] encounter_game::Error),

    #[error(transparent)]
    Driver(#[from] encounter_driver::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: "Test"
credentials: { user: "author", password: "secret" }
save: { domain: demo.en.cx, game_id: 101, path: games/test.json }
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.name, "Test");
        assert!(config.load.is_none());
        assert!(!config.browser.headless);
        let save = config.save.unwrap();
        assert!(save.keep_existing);
        assert!(save.skip.is_empty());
        assert_eq!(save.levels, None);
    }

    #[test]
    fn test_game_errors_pass_through() {
        let err: Error = encounter_game::Error::MissingFileLocation.into();
        assert_eq!(
            err.to_string(),
            "game files have no local location to upload from"
        );
    }
}
