//! Level-wide settings: name, autopass, answer blocking, sectors to cover.

use encounter_driver::settle::DEFAULT_TIMEOUT_MS;
use encounter_driver::{close_after, js_str, settle, Driver, Presence};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::form::{self, named};
use crate::time::Hms;
use crate::urls;
use crate::Result;

/// Display name of a level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LevelNameRepr")]
pub struct LevelName {
    pub name: String,
}

/// Older snapshots stored the name as a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelNameRepr {
    Bare(String),
    Record {
        #[serde(default)]
        name: String,
    },
}

impl From<LevelNameRepr> for LevelName {
    fn from(repr: LevelNameRepr) -> Self {
        match repr {
            LevelNameRepr::Bare(name) | LevelNameRepr::Record { name } => LevelName { name },
        }
    }
}

impl LevelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub async fn read<D: Driver>(driver: &mut D, game_id: u32, level_id: u32) -> Result<Self> {
        driver
            .open_popup(&urls::name_editor_script(game_id, level_id))
            .await?;
        let outcome = async {
            let field = driver.require(&named("txtLevelName")).await?;
            Ok::<_, crate::Error>(LevelName::new(field.value.unwrap_or_default()))
        }
        .await;
        close_after(driver, outcome).await
    }

    pub async fn write<D: Driver>(&self, driver: &mut D, game_id: u32, level_id: u32) -> Result<()> {
        driver
            .open_popup(&urls::name_editor_script(game_id, level_id))
            .await?;
        let outcome = async {
            form::fill(driver, &[("txtLevelName", self.name.clone())]).await?;
            driver.click(r#"input[title="Update"]"#).await?;
            Ok::<_, crate::Error>(())
        }
        .await;
        close_after(driver, outcome).await
    }
}

const AUTOPASS_STATUS: &str = "#lnkAdjustAutopass";
const AUTOPASS_PENALTY: &str = "#chkTimeoutPenalty";
const AUTOPASS_SAVE: &str = r#"#AutoPassSettingsHolder input[title="Save"]"#;
const AUTOPASS_FIELDS: [&str; 6] = [
    "txtApHours",
    "txtApMinutes",
    "txtApSeconds",
    "txtApPenaltyHours",
    "txtApPenaltyMinutes",
    "txtApPenaltySeconds",
];

/// Automatic level completion after a delay, with an optional time penalty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Autopass {
    pub enabled: bool,
    pub autopass_time: Hms,
    pub penalty_time: Hms,
}

impl Autopass {
    pub fn penalty(&self) -> bool {
        !self.penalty_time.is_zero()
    }

    /// Status prose of a completed game: `"<delay>, <penalty>"`.
    pub fn from_prose(text: &str) -> Self {
        let mut parts = text.split(',');
        let autopass_time = parts.next().map(Hms::parse_prose).unwrap_or_default();
        let penalty_time = parts.next().map(Hms::parse_prose).unwrap_or_default();
        Autopass {
            enabled: !autopass_time.is_zero(),
            autopass_time,
            penalty_time,
        }
    }

    /// Read from the level page. A completed game shows prose instead of the
    /// settings form.
    pub async fn read<D: Driver>(driver: &mut D, past_game: bool) -> Result<Self> {
        let Some(status) = driver.find(AUTOPASS_STATUS).await? else {
            debug!("No autopass status on page");
            return Ok(Self::default());
        };
        if past_game {
            return Ok(Self::from_prose(&status.text));
        }
        if matches!(status.text.as_str(), "нет" | "no") {
            return Ok(Self::default());
        }

        driver.click(AUTOPASS_STATUS).await?;
        settle(driver, AUTOPASS_PENALTY, Presence::Present, DEFAULT_TIMEOUT_MS).await;
        let v = form::read_numbers(driver, &AUTOPASS_FIELDS).await?;
        Ok(Autopass {
            enabled: true,
            autopass_time: Hms::from_fields(&v[..3]),
            penalty_time: Hms::from_fields(&v[3..]),
        })
    }

    pub async fn write<D: Driver>(&self, driver: &mut D) -> Result<()> {
        driver.require(AUTOPASS_STATUS).await?;
        driver.click(AUTOPASS_STATUS).await?;
        settle(driver, AUTOPASS_PENALTY, Presence::Present, DEFAULT_TIMEOUT_MS).await;

        form::set_checked(driver, AUTOPASS_PENALTY, self.penalty()).await?;
        let values: Vec<u32> = self
            .autopass_time
            .fields()
            .into_iter()
            .chain(self.penalty_time.fields())
            .collect();
        form::fill_numbers(driver, &AUTOPASS_FIELDS, &values).await?;
        driver.click(AUTOPASS_SAVE).await?;
        Ok(())
    }
}

const BLOCK_STATUS: &str = "#lnkAnswerBlockingStatus";
const BLOCK_FOR_USER: &str = "#rbApplyForUser";
const BLOCK_FOR_TEAM: &str = "#rbApplyForTeam";
const BLOCK_SAVE: &str = r#"#divAnswerBlockingSettings input[title="Save"]"#;
const BLOCK_FIELDS: [&str; 4] = [
    "txtAttemptsNumber",
    "txtAttemptsPeriodHours",
    "txtAttemptsPeriodMinutes",
    "txtAttemptsPeriodSeconds",
];

/// Limit on answer attempts per player or team within a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerBlock {
    pub enabled: bool,
    /// Applies per player rather than per team.
    pub individual: bool,
    pub n_tries: u32,
    pub block_time: Hms,
}

impl AnswerBlock {
    pub async fn read<D: Driver>(driver: &mut D) -> Result<Self> {
        let Some(status) = driver.find(BLOCK_STATUS).await? else {
            debug!("No answer blocking status on page");
            return Ok(Self::default());
        };
        if matches!(status.text.as_str(), "отключена" | "disabled") {
            return Ok(Self::default());
        }

        driver.click(BLOCK_STATUS).await?;
        settle(driver, BLOCK_FOR_USER, Presence::Present, DEFAULT_TIMEOUT_MS).await;
        let v = form::read_numbers(driver, &BLOCK_FIELDS).await?;
        let individual = form::is_checked(driver, BLOCK_FOR_USER).await?;
        Ok(AnswerBlock {
            enabled: true,
            individual,
            n_tries: v[0],
            block_time: Hms::from_fields(&v[1..]),
        })
    }

    pub async fn write<D: Driver>(&self, driver: &mut D) -> Result<()> {
        driver.require(BLOCK_STATUS).await?;
        driver.click(BLOCK_STATUS).await?;
        settle(driver, BLOCK_FOR_USER, Presence::Present, DEFAULT_TIMEOUT_MS).await;

        let mut values = vec![self.n_tries];
        values.extend(self.block_time.fields());
        form::fill_numbers(driver, &BLOCK_FIELDS, &values).await?;
        let scope = if self.individual {
            BLOCK_FOR_USER
        } else {
            BLOCK_FOR_TEAM
        };
        driver.click(scope).await?;
        driver.click(BLOCK_SAVE).await?;
        Ok(())
    }
}

const SECTORS_STATUS: &str = "#lnkSectorsSettings";
const SECTORS_CUSTOM: &str = "#rbCompleteCustom";
const SECTORS_COUNT: &str = "#txtRequiredSectorsCount";
const SECTORS_SAVE: &str = r#"#divSectorsSettins input[title="Save"]"#;

/// How many sectors close the level. `None` means all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorsToCover {
    pub n_sectors: Option<u32>,
}

impl SectorsToCover {
    /// A level without the sectors settings link reads as "all sectors".
    pub async fn read<D: Driver>(driver: &mut D) -> Result<Self> {
        if !driver.exists(SECTORS_STATUS).await? {
            return Ok(Self::default());
        }
        driver.click(SECTORS_STATUS).await?;
        settle(driver, SECTORS_CUSTOM, Presence::Present, DEFAULT_TIMEOUT_MS).await;
        if !form::is_checked(driver, SECTORS_CUSTOM).await? {
            return Ok(Self::default());
        }
        let n_sectors = driver
            .find(SECTORS_COUNT)
            .await?
            .and_then(|e| e.value)
            .and_then(|v| v.trim().parse().ok());
        Ok(SectorsToCover { n_sectors })
    }

    /// No-op on a level without the sectors settings link.
    pub async fn write<D: Driver>(&self, driver: &mut D) -> Result<()> {
        if !driver.exists(SECTORS_STATUS).await? {
            debug!("Sectors settings absent, nothing to write");
            return Ok(());
        }
        driver.click(SECTORS_STATUS).await?;
        settle(driver, SECTORS_CUSTOM, Presence::Present, DEFAULT_TIMEOUT_MS).await;
        if let Some(n) = self.n_sectors {
            driver.click(SECTORS_CUSTOM).await?;
            let js = format!(
                "$('{}').val({})",
                SECTORS_COUNT,
                js_str(&n.to_string())
            );
            driver.exec(&js).await?;
        }
        driver.click(SECTORS_SAVE).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_driver::mock::{Call, MockDriver};
    use encounter_driver::Element;
    use serde_json::json;

    #[test]
    fn test_level_name_upgrades_bare_string() {
        let old: LevelName = serde_json::from_str(r#""Intro""#).unwrap();
        let new: LevelName = serde_json::from_str(r#"{"name":"Intro"}"#).unwrap();
        assert_eq!(old, new);
        assert_eq!(serde_json::to_string(&new).unwrap(), r#"{"name":"Intro"}"#);
    }

    #[tokio::test]
    async fn test_level_name_read_in_popup() {
        let mut driver = MockDriver::new();
        driver.element(r#"[name="txtLevelName"]"#, Element::with_value("Intro"));
        let name = LevelName::read(&mut driver, 101, 3).await.unwrap();
        assert_eq!(name.name, "Intro");
        assert_eq!(
            driver.popups(),
            vec!["GameEditor('./NameCommentEdit.aspx?gid=101&level=3', '');"]
        );
        assert_eq!(driver.popup_depth(), 0);
    }

    #[tokio::test]
    async fn test_level_name_missing_field_still_closes_popup() {
        let mut driver = MockDriver::new();
        let err = LevelName::read(&mut driver, 101, 3).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Driver(encounter_driver::Error::NotFound(_))
        ));
        assert_eq!(driver.popup_depth(), 0);
    }

    #[tokio::test]
    async fn test_autopass_disabled_reads_default() {
        let mut driver = MockDriver::new();
        driver.element(AUTOPASS_STATUS, Element::with_text("нет"));
        let ap = Autopass::read(&mut driver, false).await.unwrap();
        assert_eq!(ap, Autopass::default());
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_autopass_reads_settings() {
        let mut driver = MockDriver::new();
        driver
            .element(AUTOPASS_STATUS, Element::with_text("1:00:00"))
            .element(AUTOPASS_PENALTY, Element::checked())
            .on_script("txtApPenaltyHours", json!([1, 0, 0, 0, 30, 0]));
        let ap = Autopass::read(&mut driver, false).await.unwrap();
        assert!(ap.enabled);
        assert_eq!(ap.autopass_time, Hms(1, 0, 0));
        assert_eq!(ap.penalty_time, Hms(0, 30, 0));
        assert!(ap.penalty());
    }

    #[tokio::test]
    async fn test_autopass_past_game_prose() {
        let mut driver = MockDriver::new();
        driver.element(
            AUTOPASS_STATUS,
            Element::with_text("1 days 2 hours, 15 minutes"),
        );
        let ap = Autopass::read(&mut driver, true).await.unwrap();
        assert_eq!(
            ap,
            Autopass {
                enabled: true,
                autopass_time: Hms(26, 0, 0),
                penalty_time: Hms(0, 15, 0),
            }
        );
    }

    #[tokio::test]
    async fn test_autopass_write_toggles_penalty_and_saves() {
        let mut driver = MockDriver::new();
        driver
            .element(AUTOPASS_STATUS, Element::with_text("no"))
            .element(AUTOPASS_PENALTY, Element::default());
        let ap = Autopass {
            enabled: true,
            autopass_time: Hms(0, 45, 0),
            penalty_time: Hms(0, 10, 0),
        };
        ap.write(&mut driver).await.unwrap();
        assert_eq!(
            driver.clicks(),
            vec![AUTOPASS_STATUS, AUTOPASS_PENALTY, AUTOPASS_SAVE]
        );
        assert!(driver.scripts().iter().any(|js| js.contains(
            r#"[["txtApHours","0"],["txtApMinutes","45"],["txtApSeconds","0"],["txtApPenaltyHours","0"],["txtApPenaltyMinutes","10"],["txtApPenaltySeconds","0"]]"#
        )));
    }

    #[tokio::test]
    async fn test_answer_block_round_trip_through_form() {
        let mut driver = MockDriver::new();
        driver
            .element(BLOCK_STATUS, Element::with_text("3 attempts"))
            .element(BLOCK_FOR_USER, Element::checked())
            .on_script("txtAttemptsNumber", json!([3, 0, 5, 0]));
        let block = AnswerBlock::read(&mut driver).await.unwrap();
        assert_eq!(
            block,
            AnswerBlock {
                enabled: true,
                individual: true,
                n_tries: 3,
                block_time: Hms(0, 5, 0),
            }
        );

        driver.clear_calls();
        block.write(&mut driver).await.unwrap();
        assert_eq!(
            driver.clicks(),
            vec![BLOCK_STATUS, BLOCK_FOR_USER, BLOCK_SAVE]
        );
    }

    #[tokio::test]
    async fn test_answer_block_disabled() {
        let mut driver = MockDriver::new();
        driver.element(BLOCK_STATUS, Element::with_text("отключена"));
        assert_eq!(
            AnswerBlock::read(&mut driver).await.unwrap(),
            AnswerBlock::default()
        );
    }

    #[tokio::test]
    async fn test_sectors_absent_feature() {
        let mut driver = MockDriver::new();
        assert_eq!(
            SectorsToCover::read(&mut driver).await.unwrap(),
            SectorsToCover::default()
        );
        SectorsToCover { n_sectors: Some(2) }
            .write(&mut driver)
            .await
            .unwrap();
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sectors_custom_count() {
        let mut driver = MockDriver::new();
        driver
            .element(SECTORS_STATUS, Element::with_text("all"))
            .element(SECTORS_CUSTOM, Element::checked())
            .element(SECTORS_COUNT, Element::with_value("4"));
        let sectors = SectorsToCover::read(&mut driver).await.unwrap();
        assert_eq!(sectors.n_sectors, Some(4));

        driver.clear_calls();
        sectors.write(&mut driver).await.unwrap();
        assert_eq!(
            driver.clicks(),
            vec![SECTORS_STATUS, SECTORS_CUSTOM, SECTORS_SAVE]
        );
        assert!(driver
            .calls()
            .contains(&Call::Script(r##"$('#txtRequiredSectorsCount').val("4")"##.into())));
    }
}
