use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Shr;
use std::path::PathBuf;

use encounter_driver::Driver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::files::GameFiles;
use crate::kind::SkipSet;
use crate::level::Level;
use crate::session::GameSession;
use crate::snapshot::LevelCache;
use crate::{Error, Result};

/// A whole game: its levels, ascending by id, and its attached files.
///
/// Every level carries the game's domain and id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GameRepr")]
pub struct Game {
    domain: String,
    game_id: u32,
    levels: Vec<Level>,
    files: GameFiles,
}

#[derive(Deserialize)]
struct GameRepr {
    #[serde(alias = "_domain")]
    domain: String,
    #[serde(alias = "_game_id")]
    game_id: u32,
    #[serde(default)]
    levels: Vec<Level>,
    #[serde(default)]
    files: GameFiles,
}

impl From<GameRepr> for Game {
    fn from(repr: GameRepr) -> Self {
        Game::new(repr.domain, repr.game_id, repr.levels).with_files(repr.files)
    }
}

impl Game {
    /// Levels are sorted by id; on duplicate ids the first one is kept.
    pub fn new(domain: impl Into<String>, game_id: u32, mut levels: Vec<Level>) -> Self {
        let domain = domain.into();
        levels.sort_by_key(|l| l.level_id);
        levels.dedup_by_key(|l| l.level_id);
        let levels = levels
            .into_iter()
            .map(|l| l.rebind(&domain, game_id))
            .collect();
        Self {
            domain,
            game_id,
            levels,
            files: GameFiles::default(),
        }
    }

    pub fn with_files(mut self, files: GameFiles) -> Self {
        self.files = files;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, level_id: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.level_id == level_id)
    }

    /// Mutable access to one level's content. Its identity fields are
    /// restored on the next [`Game::rebind`].
    pub fn level_mut(&mut self, level_id: u32) -> Option<&mut Level> {
        self.levels.iter_mut().find(|l| l.level_id == level_id)
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level_ids(&self) -> BTreeSet<u32> {
        self.levels.iter().map(|l| l.level_id).collect()
    }

    pub fn files(&self) -> &GameFiles {
        &self.files
    }

    /// The same game under another domain and id, applied to every level.
    pub fn rebind(self, domain: impl Into<String>, game_id: u32) -> Self {
        Game::new(domain, game_id, self.levels).with_files(self.files)
    }

    /// Keep only the listed levels.
    pub fn retain_levels(mut self, level_ids: &BTreeSet<u32>) -> Self {
        self.levels.retain(|l| level_ids.contains(&l.level_id));
        self
    }

    fn identity(&self) -> String {
        format!("{}/{}", self.domain, self.game_id)
    }

    /// Combine a fresh capture with an older one of the same game.
    ///
    /// The result has every level of both, ascending by id; on a shared id
    /// `self` wins. Files come from `self` unless it has none.
    pub fn merge(self, other: Game) -> Result<Game> {
        if self.domain != other.domain || self.game_id != other.game_id {
            return Err(Error::GameMismatch {
                ours: self.identity(),
                theirs: other.identity(),
            });
        }
        let mut by_id: BTreeMap<u32, Level> =
            other.levels.into_iter().map(|l| (l.level_id, l)).collect();
        by_id.extend(self.levels.into_iter().map(|l| (l.level_id, l)));
        debug!("Merged game {} has {} levels", self.game_id, by_id.len());

        let files = if self.files.is_empty() {
            other.files
        } else {
            self.files
        };
        Ok(Game {
            domain: self.domain,
            game_id: self.game_id,
            levels: by_id.into_values().collect(),
            files,
        })
    }
}

/// `fresh >> stored` is [`Game::merge`].
impl Shr for Game {
    type Output = Result<Game>;

    fn shr(self, other: Game) -> Result<Game> {
        self.merge(other)
    }
}

/// What [`Game::scrape`] captures.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Level ids to read; `None` reads all of them.
    pub levels: Option<BTreeSet<u32>>,
    pub skip: SkipSet,
    /// The game is over and shows some settings as prose.
    pub past_game: bool,
    /// Where each level is stored as soon as it is read.
    pub cache: Option<LevelCache>,
    /// Take levels already in `cache` instead of reading them again.
    pub read_cache: bool,
    pub capture_files: bool,
    /// Download captured files here.
    pub download_to: Option<PathBuf>,
}

/// How [`Game::replay`] writes.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub skip: SkipSet,
    pub upload_files: bool,
}

impl Game {
    /// Read the session's game level by level.
    pub async fn scrape<D: Driver>(session: &mut GameSession<D>, opts: &ScrapeOptions) -> Result<Game> {
        session.login().await?;
        let n_levels = session.count_levels().await?;
        info!("Scraping game {} ({} levels)", session.game_id(), n_levels);

        let pause_ms = session.timing().level_pause_ms;
        let mut levels = Vec::new();
        let mut scraped_any = false;
        for level_id in 1..=n_levels {
            if opts.levels.as_ref().is_some_and(|ids| !ids.contains(&level_id)) {
                continue;
            }
            let cached = match &opts.cache {
                Some(cache) if opts.read_cache => cache.load(level_id)?,
                _ => None,
            };
            if let Some(level) = cached {
                info!("Level {} taken from cache", level_id);
                levels.push(level);
                continue;
            }
            if scraped_any {
                session.driver().wait(pause_ms).await;
            }
            let level = Level::read(session, level_id, &opts.skip, opts.past_game).await?;
            if let Some(cache) = &opts.cache {
                cache.store(&level)?;
            }
            levels.push(level);
            scraped_any = true;
        }

        let files = if opts.capture_files {
            GameFiles::capture(session, opts.download_to.as_deref()).await?
        } else {
            GameFiles::default()
        };
        Ok(Game::new(session.domain(), session.game_id(), levels).with_files(files))
    }

    /// Write every level into the session's game, which may differ from
    /// the one this was read from.
    pub async fn replay<D: Driver>(&self, session: &mut GameSession<D>, opts: &ReplayOptions) -> Result<()> {
        let target = if self.domain == session.domain() && self.game_id == session.game_id() {
            Cow::Borrowed(self)
        } else {
            info!(
                "Replaying {} onto {}/{}",
                self.identity(),
                session.domain(),
                session.game_id()
            );
            Cow::Owned(self.clone().rebind(session.domain(), session.game_id()))
        };

        session.login().await?;
        let pause_ms = session.timing().level_pause_ms;
        for (i, level) in target.levels.iter().enumerate() {
            if i > 0 {
                session.driver().wait(pause_ms).await;
            }
            level.write(session, &opts.skip).await?;
        }
        if opts.upload_files {
            target.files.upload(session).await?;
        }
        info!("Replayed {} levels", target.levels.len());
        Ok(())
    }
}
