//! Slot-table entities (hints, penalized hints, bonuses) and reconciling a
//! stored list with the slots already on a level.

use std::collections::BTreeSet;

use encounter_driver::Driver;
use tracing::debug;

use crate::form::eval_or_default;
use crate::kind::SlotKind;
use crate::Result;

/// Pause before reading a slot table; it is filled in after page load.
const SLOT_TABLE_MS: u64 = 300;

/// Entity edited through a popup opened from a slot table.
#[allow(async_fn_in_trait)]
pub trait SlotForm: Sized {
    const KIND: SlotKind;

    /// Read the entity from the popup opened by `href`.
    async fn read<D: Driver>(driver: &mut D, href: &str) -> Result<Self>;

    /// Fill and submit the popup opened by `locator`, either an existing
    /// slot's href or a fresh-slot script.
    async fn write<D: Driver>(&self, driver: &mut D, locator: &str) -> Result<()>;
}

/// What to do with the `index`-th stored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPlan {
    /// Overwrite the live slot behind `href`.
    Update { index: usize, href: String },
    /// Open a fresh slot.
    Add { index: usize },
}

impl SlotPlan {
    pub fn index(&self) -> usize {
        match self {
            SlotPlan::Update { index, .. } | SlotPlan::Add { index } => *index,
        }
    }
}

/// Pair `stored` entities with `live` slot hrefs by position.
///
/// Stored entities past the live slots become adds. Live slots past the
/// stored list are left as they are. With `keep_existing` nothing is
/// overwritten and every stored entity is added.
pub fn plan_slots(stored: usize, live: &[String], keep_existing: bool) -> Vec<SlotPlan> {
    (0..stored)
        .map(|index| match live.get(index) {
            Some(href) if !keep_existing => SlotPlan::Update {
                index,
                href: href.clone(),
            },
            _ => SlotPlan::Add { index },
        })
        .collect()
}

pub(crate) async fn slot_hrefs<D: Driver>(driver: &mut D, kind: SlotKind) -> Result<Vec<String>> {
    driver.wait(SLOT_TABLE_MS).await;
    eval_or_default(driver, &kind.slot_hrefs_js()).await
}

pub(crate) async fn read_slots<T: SlotForm, D: Driver>(driver: &mut D) -> Result<Vec<T>> {
    let hrefs = slot_hrefs(driver, T::KIND).await?;
    debug!("Reading {} {:?} slots", hrefs.len(), T::KIND);
    let mut items = Vec::with_capacity(hrefs.len());
    for href in &hrefs {
        items.push(T::read(driver, href).await?);
    }
    Ok(items)
}

/// Write `items` into the slot table. Indices in `written` were submitted
/// by an earlier attempt and are left out; each new submission is recorded.
pub(crate) async fn write_slots<T: SlotForm, D: Driver>(
    driver: &mut D,
    items: &[T],
    game_id: u32,
    level_id: u32,
    keep_existing: bool,
    written: &mut BTreeSet<usize>,
) -> Result<()> {
    let live = slot_hrefs(driver, T::KIND).await?;
    let plan = plan_slots(items.len(), &live, keep_existing);
    debug!(
        "{:?}: {} stored, {} live, keep_existing={}",
        T::KIND,
        items.len(),
        live.len(),
        keep_existing
    );
    for step in plan {
        let index = step.index();
        if written.contains(&index) {
            continue;
        }
        let item = &items[index];
        match step {
            SlotPlan::Update { href, .. } => item.write(driver, &href).await?,
            SlotPlan::Add { .. } => {
                let script = T::KIND.new_slot_script(game_id, level_id);
                item.write(driver, &script).await?
            }
        }
        written.insert(index);
    }
    Ok(())
}
