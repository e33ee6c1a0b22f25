//! # encounter-game
//!
//! Model of an Encounter game as seen through its admin UI: levels and
//! everything they own, read from and written back to live forms through an
//! [`encounter_driver::Driver`], persisted as JSON snapshots and merged.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use encounter_driver::{BrowserConfig, EokaDriver};
//! use encounter_game::{Credentials, Game, GameSession, ScrapeOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> encounter_game::Result<()> {
//! let driver = EokaDriver::launch(&BrowserConfig::default()).await?;
//! let credentials = Credentials::new("author", "secret");
//! let mut session = GameSession::new(driver, "demo.en.cx", 101, credentials);
//! let game = Game::scrape(&mut session, &ScrapeOptions::default()).await?;
//! game.to_file("games/spring.json")?;
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod bonus;
mod files;
mod form;
mod game;
pub mod hint;
mod kind;
mod level;
pub mod meta;
pub mod penalty;
mod session;
mod slot;
mod snapshot;
pub mod task;
mod time;
pub mod urls;

pub use answer::{Answer, AnswerOption, SubmitTarget, MAX_ANSWERS_PER_SECTOR};
pub use bonus::Bonus;
pub use files::{GameFiles, CHUNK_SIZE_FILES};
pub use game::{Game, ReplayOptions, ScrapeOptions};
pub use hint::{Hint, PenalizedHint};
pub use kind::{EntityKind, SkipSet, SlotKind};
pub use level::Level;
pub use meta::{AnswerBlock, Autopass, LevelName, SectorsToCover};
pub use penalty::{penalty_bonuses, PenaltyBonuses, PenaltyOptions, Variant};
pub use session::{Credentials, GameSession, KeepExisting, Timing};
pub use slot::{plan_slots, SlotForm, SlotPlan};
pub use snapshot::LevelCache;
pub use task::Task;
pub use time::{Dhms, Hms};

use std::path::PathBuf;

/// Result type for encounter-game operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or persisting a game.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Driver(#[from] encounter_driver::Error),

    #[error("cannot merge game {theirs} into game {ours}")]
    GameMismatch { ours: String, theirs: String },

    #[error("answer batch has {count} options, at most {max} fit one submission")]
    TooManyOptions { count: usize, max: usize },

    #[error("snapshot {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("game files have no local location to upload from")]
    MissingFileLocation,
}

impl Error {
    /// See [`encounter_driver::Error::is_script_fault`].
    pub fn is_script_fault(&self) -> bool {
        matches!(self, Error::Driver(e) if e.is_script_fault())
    }

    /// A snapshot or cache file that does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
