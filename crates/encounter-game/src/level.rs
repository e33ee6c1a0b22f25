use std::collections::BTreeSet;

use encounter_driver::Driver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::answer::{self, Answer, AnswerProgress};
use crate::bonus::Bonus;
use crate::hint::{Hint, PenalizedHint};
use crate::kind::{EntityKind, SkipSet, SlotKind};
use crate::meta::{AnswerBlock, Autopass, LevelName, SectorsToCover};
use crate::session::GameSession;
use crate::slot::{self, SlotForm};
use crate::task::Task;
use crate::Result;

/// One level of a game and everything captured from it.
///
/// A `None` part was not captured and is left alone on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    #[serde(alias = "_domain")]
    pub domain: String,
    #[serde(alias = "_game_id")]
    pub game_id: u32,
    pub level_id: u32,
    #[serde(default)]
    pub name: Option<LevelName>,
    #[serde(default)]
    pub autopass: Option<Autopass>,
    #[serde(default)]
    pub answer_block: Option<AnswerBlock>,
    #[serde(default)]
    pub sectors_to_cover: Option<SectorsToCover>,
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
    #[serde(default)]
    pub hints: Option<Vec<Hint>>,
    #[serde(default)]
    pub penalized_hints: Option<Vec<PenalizedHint>>,
    #[serde(default)]
    pub bonuses: Option<Vec<Bonus>>,
    #[serde(default)]
    pub answers: Option<Vec<Answer>>,
}

/// One unit of reading or writing a level. Listed in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Name,
    Autopass,
    AnswerBlock,
    SectorsToCover,
    Tasks,
    Slots(SlotKind),
    Answers,
    /// Sectors to cover again, once the sectors it counts exist.
    SectorsSummary,
}

const STEPS: [Step; 10] = [
    Step::Name,
    Step::Autopass,
    Step::AnswerBlock,
    Step::SectorsToCover,
    Step::Tasks,
    Step::Slots(SlotKind::Hint),
    Step::Slots(SlotKind::PenalizedHint),
    Step::Slots(SlotKind::Bonus),
    Step::Answers,
    Step::SectorsSummary,
];

impl Step {
    fn kind(&self) -> EntityKind {
        match self {
            Step::Name => EntityKind::Name,
            Step::Autopass => EntityKind::Autopass,
            Step::AnswerBlock => EntityKind::AnswerBlock,
            Step::SectorsToCover | Step::SectorsSummary => EntityKind::SectorsToCover,
            Step::Tasks => EntityKind::Tasks,
            Step::Slots(kind) => kind.entity_kind(),
            Step::Answers => EntityKind::Answers,
        }
    }
}

/// What a level write has already submitted, so a retried step does not
/// add it a second time.
#[derive(Debug, Default)]
struct Progress {
    /// Tasks or slot entities of the current step, by stored index.
    written: BTreeSet<usize>,
    answers: AnswerProgress,
}

impl Level {
    /// Empty level: nothing captured.
    pub fn new(domain: impl Into<String>, game_id: u32, level_id: u32) -> Self {
        Self {
            domain: domain.into(),
            game_id,
            level_id,
            name: None,
            autopass: None,
            answer_block: None,
            sectors_to_cover: None,
            tasks: None,
            hints: None,
            penalized_hints: None,
            bonuses: None,
            answers: None,
        }
    }

    /// Same content under another game.
    pub fn rebind(mut self, domain: &str, game_id: u32) -> Self {
        self.domain = domain.to_string();
        self.game_id = game_id;
        self
    }

    /// Whether this level has several sectors to cover.
    fn multi_sector(&self) -> bool {
        self.answers.as_deref().is_some_and(answer::has_sectors)
    }

    fn has(&self, step: Step) -> bool {
        match step {
            Step::Name => self.name.is_some(),
            Step::Autopass => self.autopass.is_some(),
            Step::AnswerBlock => self.answer_block.is_some(),
            Step::SectorsToCover => self.sectors_to_cover.is_some(),
            Step::Tasks => self.tasks.is_some(),
            Step::Slots(SlotKind::Hint) => self.hints.is_some(),
            Step::Slots(SlotKind::PenalizedHint) => self.penalized_hints.is_some(),
            Step::Slots(SlotKind::Bonus) => self.bonuses.is_some(),
            Step::Answers => self.answers.is_some(),
            Step::SectorsSummary => self.sectors_to_cover.is_some() && self.multi_sector(),
        }
    }

    /// Read a level of the session's game, leaving out `skip`.
    ///
    /// `past_game` reads settings of a completed game, which are shown as
    /// prose.
    pub async fn read<D: Driver>(
        session: &mut GameSession<D>,
        level_id: u32,
        skip: &SkipSet,
        past_game: bool,
    ) -> Result<Self> {
        info!("Reading level {}", level_id);
        let game_id = session.game_id();
        let mut level = Level::new(session.domain(), game_id, level_id);
        session.navigate_to_level(level_id).await?;

        for step in STEPS {
            if step == Step::SectorsSummary || skip.contains(&step.kind()) {
                continue;
            }
            debug!("Level {}: reading {:?}", level_id, step);
            let driver = session.driver();
            match step {
                Step::Name => level.name = Some(LevelName::read(driver, game_id, level_id).await?),
                Step::Autopass => level.autopass = Some(Autopass::read(driver, past_game).await?),
                Step::AnswerBlock => level.answer_block = Some(AnswerBlock::read(driver).await?),
                Step::SectorsToCover => {
                    level.sectors_to_cover = Some(SectorsToCover::read(driver).await?)
                }
                Step::Tasks => level.tasks = Some(Task::read_all(driver).await?),
                Step::Slots(SlotKind::Hint) => level.hints = Some(slot::read_slots(driver).await?),
                Step::Slots(SlotKind::PenalizedHint) => {
                    level.penalized_hints = Some(slot::read_slots(driver).await?)
                }
                Step::Slots(SlotKind::Bonus) => level.bonuses = Some(slot::read_slots(driver).await?),
                Step::Answers => {
                    let domain = session.domain().to_string();
                    level.answers =
                        Some(answer::read_level_answers(session.driver(), &domain).await?);
                    session.navigate_to_level(level_id).await?;
                }
                Step::SectorsSummary => {}
            }
            session.settle_step().await;
        }
        Ok(level)
    }

    /// Write this level into the session's browser, leaving out `skip`.
    ///
    /// A step that hits a scripting fault is retried once after a fresh
    /// login; a second failure is returned.
    pub async fn write<D: Driver>(&self, session: &mut GameSession<D>, skip: &SkipSet) -> Result<()> {
        info!("Writing level {} of game {}", self.level_id, self.game_id);
        session.navigate_to_level(self.level_id).await?;

        let mut progress = Progress::default();
        for step in STEPS {
            if skip.contains(&step.kind()) || !self.has(step) {
                continue;
            }
            progress.written.clear();
            debug!("Level {}: writing {:?}", self.level_id, step);
            match self.write_step(session, step, &mut progress).await {
                Ok(()) => {}
                Err(e) if e.is_script_fault() => {
                    warn!(
                        "Level {}: {:?} failed ({}), logging in again and retrying",
                        self.level_id, step, e
                    );
                    session.recover(self.level_id).await?;
                    self.write_step(session, step, &mut progress).await?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn write_step<D: Driver>(
        &self,
        session: &mut GameSession<D>,
        step: Step,
        progress: &mut Progress,
    ) -> Result<()> {
        let keep = session.keep_existing();
        let (game_id, level_id) = (self.game_id, self.level_id);
        match step {
            Step::Name => {
                if let Some(name) = &self.name {
                    name.write(session.driver(), game_id, level_id).await?;
                }
            }
            Step::Autopass => {
                if let Some(autopass) = &self.autopass {
                    autopass.write(session.driver()).await?;
                }
            }
            Step::AnswerBlock => {
                if let Some(block) = &self.answer_block {
                    block.write(session.driver()).await?;
                }
            }
            Step::SectorsToCover => {
                if let Some(sectors) = &self.sectors_to_cover {
                    sectors.write(session.driver()).await?;
                }
            }
            Step::Tasks => {
                if let Some(tasks) = &self.tasks {
                    Task::write_all(tasks, session.driver(), &mut progress.written).await?;
                }
            }
            Step::Slots(kind) => {
                let keep = keep.for_slot(kind);
                let written = &mut progress.written;
                match kind {
                    SlotKind::Hint => {
                        self.write_slots(session, self.hints.as_deref(), keep, written)
                            .await?
                    }
                    SlotKind::PenalizedHint => {
                        self.write_slots(session, self.penalized_hints.as_deref(), keep, written)
                            .await?
                    }
                    SlotKind::Bonus => {
                        self.write_slots(session, self.bonuses.as_deref(), keep, written)
                            .await?
                    }
                }
            }
            Step::Answers => {
                if let Some(answers) = &self.answers {
                    answer::write_level_answers(
                        session.driver(),
                        answers,
                        keep.answers,
                        &mut progress.answers,
                    )
                    .await?;
                    session.navigate_to_level(level_id).await?;
                }
            }
            Step::SectorsSummary => {
                if let Some(sectors) = &self.sectors_to_cover {
                    session.navigate_to_level(level_id).await?;
                    sectors.write(session.driver()).await?;
                }
            }
        }
        Ok(())
    }

    async fn write_slots<T: SlotForm, D: Driver>(
        &self,
        session: &mut GameSession<D>,
        items: Option<&[T]>,
        keep_existing: bool,
        written: &mut BTreeSet<usize>,
    ) -> Result<()> {
        let Some(items) = items else {
            return Ok(());
        };
        slot::write_slots(
            session.driver(),
            items,
            self.game_id,
            self.level_id,
            keep_existing,
            written,
        )
        .await
    }
}
