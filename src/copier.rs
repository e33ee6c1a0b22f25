use std::collections::BTreeSet;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use encounter_driver::{BrowserConfig, Driver, EokaDriver};
use encounter_game::{
    penalty_bonuses, Credentials, Game, GameSession, LevelCache, PenaltyOptions, ReplayOptions,
    ScrapeOptions, Timing, Variant,
};
use tracing::{debug, info, warn};

use crate::config::{Config, LoadJob, SaveJob};
use crate::{Error, Result};

/// Capture the job's game into its snapshot file.
///
/// With `keep_existing` the fresh capture is merged over the snapshot
/// already at the path, so levels left out of this run survive.
pub async fn save_game<D: Driver>(
    driver: D,
    credentials: &Credentials,
    timing: Timing,
    job: &SaveJob,
) -> Result<Game> {
    let mut session =
        GameSession::new(driver, &job.domain, job.game_id, credentials.clone()).with_timing(timing);
    let opts = ScrapeOptions {
        levels: job.levels.clone(),
        skip: job.skip.clone(),
        past_game: job.past_game,
        cache: Some(LevelCache::for_destination(&job.path)),
        read_cache: !job.keep_existing,
        capture_files: job.download_files,
        download_to: job.files_location.clone(),
    };
    let mut game = Game::scrape(&mut session, &opts).await?;

    if job.keep_existing {
        match Game::from_file(&job.path) {
            Ok(existing) => {
                debug!(
                    "Merging over {} stored levels from {}",
                    existing.n_levels(),
                    job.path.display()
                );
                game = (game >> existing)?;
            }
            Err(e) if e.is_not_found() => {
                debug!("No snapshot at {} yet", job.path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }

    game.to_file(&job.path)?;
    info!("Saved {} levels to {}", game.n_levels(), job.path.display());
    Ok(game)
}

/// Replay the job's snapshot into its target game.
///
/// `transform` sees the snapshot after it was rebound to the target and
/// narrowed to the job's levels.
pub async fn load_game<D, F>(
    driver: D,
    credentials: &Credentials,
    timing: Timing,
    job: &LoadJob,
    transform: F,
) -> Result<()>
where
    D: Driver,
    F: FnOnce(Game) -> Game,
{
    let mut game = Game::from_file(&job.path)?.rebind(&job.domain, job.game_id);
    if let Some(ref levels) = job.levels {
        game = game.retain_levels(levels);
    }
    if let Some(ref location) = job.files_location {
        let files = game.files().clone().with_location(location);
        game = game.with_files(files);
    }
    let game = transform(game);

    let mut session = GameSession::new(driver, &job.domain, job.game_id, credentials.clone())
        .with_timing(timing)
        .with_keep_existing(job.keep_existing);
    let opts = ReplayOptions {
        skip: job.skip.clone(),
        upload_files: job.upload_files,
    };
    game.replay(&mut session, &opts).await?;
    Ok(())
}

/// Add penalty bonuses to one level of a game and return the gate code.
pub fn add_penalty_bonuses(
    game: &mut Game,
    level_id: u32,
    right: &BTreeSet<String>,
    variants: &[Variant],
    options: &PenaltyOptions,
) -> Result<String> {
    let level = game
        .level_mut(level_id)
        .ok_or_else(|| Error::Config(format!("snapshot has no level {}", level_id)))?;
    let generated = penalty_bonuses(right, variants, &[level_id], options);
    level
        .bonuses
        .get_or_insert_with(Vec::new)
        .extend(generated.bonuses);
    Ok(generated.gate_code)
}

/// Outcome of a job.
#[derive(Debug)]
pub struct CopyResult {
    pub success: bool,
    pub error: Option<String>,
    /// Levels in the written snapshot.
    pub levels_saved: Option<usize>,
    pub levels_loaded: Option<usize>,
    pub duration_ms: u64,
}

/// Runs copy jobs in one browser.
pub struct Copier<D> {
    driver: D,
}

impl Copier<EokaDriver> {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        Ok(Self::new(EokaDriver::launch(config).await?))
    }

    pub async fn close(self) -> Result<()> {
        self.driver.close().await?;
        Ok(())
    }
}

impl<D: Driver> Copier<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Run the job's save part, then its load part.
    pub async fn run(&mut self, config: &Config) -> Result<CopyResult> {
        self.run_parts(config, config.save.as_ref(), config.load.as_ref())
            .await
    }

    pub async fn save(&mut self, config: &Config) -> Result<CopyResult> {
        let job = config
            .save
            .as_ref()
            .ok_or_else(|| Error::Config(format!("'{}' has no save section", config.name)))?;
        self.run_parts(config, Some(job), None).await
    }

    pub async fn load(&mut self, config: &Config) -> Result<CopyResult> {
        let job = config
            .load
            .as_ref()
            .ok_or_else(|| Error::Config(format!("'{}' has no load section", config.name)))?;
        self.run_parts(config, None, Some(job)).await
    }

    async fn run_parts(
        &mut self,
        config: &Config,
        save: Option<&SaveJob>,
        load: Option<&LoadJob>,
    ) -> Result<CopyResult> {
        let start = Instant::now();
        let mut result = CopyResult {
            success: true,
            error: None,
            levels_saved: None,
            levels_loaded: None,
            duration_ms: 0,
        };

        let outcome = async {
            if let Some(job) = save {
                info!("Saving game {} from {}", job.game_id, job.domain);
                let game = save_game(&mut self.driver, &config.credentials, config.timing, job).await?;
                result.levels_saved = Some(game.n_levels());
            }
            if let Some(job) = load {
                info!("Loading {} into game {} on {}", job.path.display(), job.game_id, job.domain);
                let mut loaded = 0;
                load_game(&mut self.driver, &config.credentials, config.timing, job, |game| {
                    loaded = game.n_levels();
                    game
                })
                .await?;
                result.levels_loaded = Some(loaded);
            }
            Ok::<_, Error>(())
        }
        .await;

        if let Err(e) = outcome {
            warn!("Job '{}' failed: {}", config.name, e);
            result.success = false;
            result.error = Some(e.to_string());
            self.handle_failure(config).await;
        }
        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn handle_failure(&mut self, config: &Config) {
        let Some(path) = config.on_failure.as_ref().and_then(|f| f.screenshot.as_ref()) else {
            return;
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = path.replace("{timestamp}", &timestamp.to_string());
        info!("Saving failure screenshot to: {}", path);
        match self.driver.screenshot().await {
            Ok(data) => {
                if let Err(e) = std::fs::write(&path, data) {
                    warn!("Failed to save screenshot: {}", e);
                }
            }
            Err(e) => warn!("Failed to take screenshot: {}", e),
        }
    }
}
