//! Timed hints and penalized (on-request) hints.

use encounter_driver::settle::DEFAULT_TIMEOUT_MS;
use encounter_driver::{close_after, settle, Driver, Presence};
use serde::{Deserialize, Serialize};

use crate::form::{self, named};
use crate::kind::SlotKind;
use crate::slot::SlotForm;
use crate::time::{Dhms, Hms};
use crate::Result;

const HINT_TIME_FIELDS: [&str; 4] = [
    "NewPromptTimeoutDays",
    "NewPromptTimeoutHours",
    "NewPromptTimeoutMinutes",
    "NewPromptTimeoutSeconds",
];
const PENALTY_FIELDS: [&str; 3] = [
    "PenaltyPromptHours",
    "PenaltyPromptMinutes",
    "PenaltyPromptSeconds",
];
const HINT_TEXT: &str = r#"textarea[name="NewPrompt"]"#;
const PENALTY_COMMENT: &str = r#"textarea[name="txtPenaltyComment"]"#;
const CONFIRM: &str = "#chkRequestPenaltyConfirm";

/// Hint shown after a delay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hint {
    pub hint_time: Dhms,
    pub hint_text: String,
    pub dedicated_to_who: u32,
}

/// Hint a team may take early at the cost of `penalty_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenalizedHint {
    pub hint_time: Dhms,
    pub hint_text: String,
    pub dedicated_to_who: u32,
    /// Shown to the team before they take the hint.
    pub hint_description: String,
    pub additional_confirmation_on: bool,
    pub penalty_time: Hms,
}

impl Default for PenalizedHint {
    fn default() -> Self {
        Self {
            hint_time: Dhms::default(),
            hint_text: String::new(),
            dedicated_to_who: 0,
            hint_description: String::new(),
            additional_confirmation_on: true,
            penalty_time: Hms::default(),
        }
    }
}

async fn text_of<D: Driver>(driver: &mut D, selector: &str) -> Result<String> {
    Ok(driver
        .find(selector)
        .await?
        .and_then(|e| e.value)
        .unwrap_or_default())
}

/// Open the editor and wait for the hint textarea.
async fn open_editor<D: Driver>(driver: &mut D) -> Result<()> {
    form::enter_edit_mode(driver, "#lnkEdit").await?;
    settle(driver, &named("NewPrompt"), Presence::Present, DEFAULT_TIMEOUT_MS).await;
    Ok(())
}

fn timing_fields(time: &Dhms, text: &str) -> Vec<(&'static str, String)> {
    let mut fields: Vec<(&'static str, String)> = HINT_TIME_FIELDS
        .iter()
        .zip(time.fields())
        .map(|(n, v)| (*n, v.to_string()))
        .collect();
    fields.push(("NewPrompt", text.to_string()));
    fields
}

impl SlotForm for Hint {
    const KIND: SlotKind = SlotKind::Hint;

    async fn read<D: Driver>(driver: &mut D, href: &str) -> Result<Self> {
        driver.open_popup(href).await?;
        let outcome = async {
            form::enter_edit_mode(driver, "#lnkEdit").await?;
            let time = form::read_numbers(driver, &HINT_TIME_FIELDS).await?;
            let hint_text = text_of(driver, HINT_TEXT).await?;
            let dedicated_to_who = form::read_team(driver).await?;
            Ok::<_, crate::Error>(Hint {
                hint_time: Dhms::from_fields(&time),
                hint_text,
                dedicated_to_who,
            })
        }
        .await;
        close_after(driver, outcome).await
    }

    async fn write<D: Driver>(&self, driver: &mut D, locator: &str) -> Result<()> {
        driver.open_popup(locator).await?;
        let outcome = async {
            open_editor(driver).await?;
            form::fill(driver, &timing_fields(&self.hint_time, &self.hint_text)).await?;
            form::set_team(driver, self.dedicated_to_who).await?;
            form::submit(driver, "#btnUpdate", "#btnAdd").await?;
            Ok::<_, crate::Error>(())
        }
        .await;
        close_after(driver, outcome).await
    }
}

impl SlotForm for PenalizedHint {
    const KIND: SlotKind = SlotKind::PenalizedHint;

    async fn read<D: Driver>(driver: &mut D, href: &str) -> Result<Self> {
        driver.open_popup(href).await?;
        let outcome = async {
            form::enter_edit_mode(driver, "#lnkEdit").await?;
            let time = form::read_numbers(driver, &HINT_TIME_FIELDS).await?;
            let penalty = form::read_numbers(driver, &PENALTY_FIELDS).await?;
            let hint_text = text_of(driver, HINT_TEXT).await?;
            let hint_description = text_of(driver, PENALTY_COMMENT).await?;
            let additional_confirmation_on = form::is_checked(driver, CONFIRM).await?;
            let dedicated_to_who = form::read_team(driver).await?;
            Ok::<_, crate::Error>(PenalizedHint {
                hint_time: Dhms::from_fields(&time),
                hint_text,
                dedicated_to_who,
                hint_description,
                additional_confirmation_on,
                penalty_time: Hms::from_fields(&penalty),
            })
        }
        .await;
        close_after(driver, outcome).await
    }

    async fn write<D: Driver>(&self, driver: &mut D, locator: &str) -> Result<()> {
        driver.open_popup(locator).await?;
        let outcome = async {
            open_editor(driver).await?;
            let mut fields = timing_fields(&self.hint_time, &self.hint_text);
            fields.extend(
                PENALTY_FIELDS
                    .iter()
                    .zip(self.penalty_time.fields())
                    .map(|(n, v)| (*n, v.to_string())),
            );
            fields.push(("txtPenaltyComment", self.hint_description.clone()));
            form::fill(driver, &fields).await?;
            form::set_checked(driver, CONFIRM, self.additional_confirmation_on).await?;
            form::set_team(driver, self.dedicated_to_who).await?;
            form::submit(driver, "#btnUpdate", "#btnAdd").await?;
            Ok::<_, crate::Error>(())
        }
        .await;
        close_after(driver, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_driver::mock::MockDriver;
    use encounter_driver::Element;
    use serde_json::json;

    #[tokio::test]
    async fn test_hint_read() {
        let mut driver = MockDriver::new();
        driver
            .element("#lnkEdit", Element::default())
            .element(HINT_TEXT, Element::with_value("Look under the bench"))
            .on_script("NewPromptTimeoutDays", json!([0, 0, 15, 0]))
            .on_script("select.input", json!(0));
        let hint = Hint::read(&mut driver, "PromptEdit.aspx?prid=9").await.unwrap();
        assert_eq!(
            hint,
            Hint {
                hint_time: Dhms(0, 0, 15, 0),
                hint_text: "Look under the bench".into(),
                dedicated_to_who: 0,
            }
        );
        assert_eq!(driver.clicks(), vec!["#lnkEdit"]);
        assert_eq!(driver.popup_depth(), 0);
    }

    #[tokio::test]
    async fn test_hint_write_into_fresh_slot_adds() {
        let mut driver = MockDriver::new();
        driver.element(r#"[name="NewPrompt"]"#, Element::default());
        let hint = Hint {
            hint_time: Dhms(0, 1, 0, 0),
            hint_text: "Try the `river`".into(),
            dedicated_to_who: 3,
        };
        let script = SlotKind::Hint.new_slot_script(7, 2);
        hint.write(&mut driver, &script).await.unwrap();

        assert_eq!(driver.popups(), vec![script.as_str()]);
        assert_eq!(driver.clicks(), vec!["#btnAdd"]);
        let scripts = driver.scripts();
        assert!(scripts[0].contains(r#"["NewPromptTimeoutHours","1"]"#));
        assert!(scripts[0].contains(r#"["NewPrompt","Try the `river`"]"#));
        assert!(scripts[1].contains(r#"s.value = "3""#));
    }

    #[tokio::test]
    async fn test_hint_write_failure_closes_popup() {
        let mut driver = MockDriver::new();
        driver.fail_script("NewPromptTimeoutDays", 1);
        let err = Hint::default()
            .write(&mut driver, "PromptEdit.aspx?prid=1")
            .await
            .unwrap_err();
        assert!(err.is_script_fault());
        assert_eq!(driver.popup_depth(), 0);
    }

    #[tokio::test]
    async fn test_penalized_hint_read() {
        let mut driver = MockDriver::new();
        driver
            .element("#lnkEdit", Element::default())
            .element(HINT_TEXT, Element::with_value("The code is 42"))
            .element(PENALTY_COMMENT, Element::with_value("Costs 30 minutes"))
            .on_script("NewPromptTimeoutDays", json!([0, 0, 0, 0]))
            .on_script("PenaltyPromptHours", json!([0, 30, 0]));
        let hint = PenalizedHint::read(&mut driver, "PromptEdit.aspx?prid=4&penalty=1")
            .await
            .unwrap();
        assert_eq!(hint.penalty_time, Hms(0, 30, 0));
        assert_eq!(hint.hint_description, "Costs 30 minutes");
        assert!(!hint.additional_confirmation_on);
    }

    #[tokio::test]
    async fn test_penalized_hint_write_syncs_confirmation() {
        let mut driver = MockDriver::new();
        driver
            .element("#btnUpdate", Element::default())
            .element(CONFIRM, Element::checked());
        let hint = PenalizedHint {
            additional_confirmation_on: false,
            penalty_time: Hms(1, 0, 0),
            ..Default::default()
        };
        hint.write(&mut driver, "PromptEdit.aspx?prid=4&penalty=1")
            .await
            .unwrap();
        assert_eq!(driver.clicks(), vec![CONFIRM, "#btnUpdate"]);
        assert!(driver.scripts()[0].contains(r#"["PenaltyPromptHours","1"]"#));
    }

    #[test]
    fn test_penalized_hint_defaults_to_confirmation() {
        let hint: PenalizedHint = serde_json::from_str(r#"{"hint_text":"x"}"#).unwrap();
        assert!(hint.additional_confirmation_on);
        assert_eq!(hint.hint_text, "x");
    }
}
