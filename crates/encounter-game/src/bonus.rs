//! Bonuses: answer-gated side tasks that shift a team's time.

use encounter_driver::{close_after, Driver};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::form::{self, eval_or_default};
use crate::kind::SlotKind;
use crate::slot::SlotForm;
use crate::time::Hms;
use crate::Result;

/// Answer inputs shown by a fresh bonus form.
const VISIBLE_ANSWER_INPUTS: usize = 10;
/// Answer inputs added by one click on "more".
const MORE_ANSWER_INPUTS: usize = 30;

const EDIT_LINK: &str = r#"a[title="Edit"]"#;
const ALL_LEVELS: &str = "#rbAllLevels";
const CUSTOM_LEVELS: &str = "#rbCustomLevels";
const ABSOLUTE_LIMIT: &str = "#chkAbsoluteLimit";
const DELAY: &str = "#chkDelay";
const RELATIVE_LIMIT: &str = "#chkRelativeLimit";

const TEXT_FIELDS: [&str; 5] = ["txtBonusName", "txtTask", "txtValidFrom", "txtValidTo", "txtHelp"];
const DELAY_FIELDS: [&str; 3] = ["txtDelayHours", "txtDelayMinutes", "txtDelaySeconds"];
const WINDOW_FIELDS: [&str; 3] = ["txtValidHours", "txtValidMinutes", "txtValidSeconds"];
const BONUS_TIME_FIELDS: [&str; 3] = ["txtHours", "txtMinutes", "txtSeconds"];

const LEVEL_BOXES_JS: &str = r#"(() => {
    return $('.enCheckBox[name^="level"]').map(function (i) {
        return { index: i + 1, name: $(this).attr('name'), checked: !!this.checked };
    }).get();
})()"#;

const ANSWER_VALUES_JS: &str = r#"(() => {
    return $('input[name^="answer_"]').map(function () { return $(this).val(); }).get()
        .filter(v => v);
})()"#;

const ANSWER_NAMES_JS: &str = r#"(() => {
    return $('input[name^="answer_"]').map(function () { return $(this).attr('name'); }).get();
})()"#;

const MORE_ANSWERS_JS: &str = "$('a.Text4')[2].click()";

#[derive(Debug, Clone, Deserialize)]
struct LevelBox {
    index: u32,
    name: String,
    #[serde(default)]
    checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bonus {
    pub name: String,
    pub bonus_task: String,
    pub answers: Vec<String>,
    /// Level numbers (1-based, as listed on the form) the bonus is open on.
    /// `None` opens it on every level.
    pub levels_available: Option<Vec<u32>>,
    /// Absolute window, as the form's "from" and "to" strings.
    pub available_time: Option<(String, String)>,
    #[serde(alias = "appearence_delay")]
    pub appearance_delay: Option<Hms>,
    /// How long the bonus stays open once it appears.
    pub availability_window: Option<Hms>,
    /// Time granted (or taken) when the bonus is solved.
    pub bonus_time: Hms,
    pub hint_text: String,
    pub dedicated_to_who: u32,
}

impl Bonus {
    /// Clicks on "more" needed before `n` answers fit the form.
    fn extra_answer_clicks(n: usize) -> usize {
        n.saturating_sub(VISIBLE_ANSWER_INPUTS)
            .div_ceil(MORE_ANSWER_INPUTS)
    }

    fn custom_levels(&self) -> Option<&[u32]> {
        self.levels_available
            .as_deref()
            .filter(|levels| !levels.is_empty())
    }

    async fn sync_levels<D: Driver>(&self, driver: &mut D) -> Result<()> {
        let wanted = self.custom_levels().unwrap_or_default();
        let boxes: Vec<LevelBox> = eval_or_default(driver, LEVEL_BOXES_JS).await?;
        for b in boxes {
            if b.checked != wanted.contains(&b.index) {
                driver
                    .click(&format!(r#".enCheckBox[name="{}"]"#, b.name))
                    .await?;
            }
        }
        Ok(())
    }

    async fn fill_answers<D: Driver>(&self, driver: &mut D) -> Result<()> {
        for _ in 0..Self::extra_answer_clicks(self.answers.len()) {
            driver.exec(MORE_ANSWERS_JS).await?;
        }
        let names: Vec<String> = eval_or_default(driver, ANSWER_NAMES_JS).await?;
        if names.len() < self.answers.len() {
            warn!(
                "Bonus '{}': {} answers but only {} inputs",
                self.name,
                self.answers.len(),
                names.len()
            );
        }
        let fields: Vec<(&str, String)> = names
            .iter()
            .map(String::as_str)
            .zip(self.answers.iter().cloned())
            .collect();
        form::fill(driver, &fields).await
    }
}

impl SlotForm for Bonus {
    const KIND: SlotKind = SlotKind::Bonus;

    async fn read<D: Driver>(driver: &mut D, href: &str) -> Result<Self> {
        driver.open_popup(href).await?;
        let outcome = async {
            form::enter_edit_mode(driver, EDIT_LINK).await?;
            let texts = form::read_texts(driver, &TEXT_FIELDS).await?;
            let delay = form::read_numbers(driver, &DELAY_FIELDS).await?;
            let window = form::read_numbers(driver, &WINDOW_FIELDS).await?;
            let bonus_time = form::read_numbers(driver, &BONUS_TIME_FIELDS).await?;

            let all_levels = form::is_checked(driver, ALL_LEVELS).await?;
            let boxes: Vec<LevelBox> = eval_or_default(driver, LEVEL_BOXES_JS).await?;
            let has_window = form::is_checked(driver, ABSOLUTE_LIMIT).await?;
            let has_delay = form::is_checked(driver, DELAY).await?;
            let has_relative = form::is_checked(driver, RELATIVE_LIMIT).await?;
            let answers: Vec<String> = eval_or_default(driver, ANSWER_VALUES_JS).await?;
            let dedicated_to_who = form::read_team(driver).await?;

            let [name, bonus_task, valid_from, valid_to, hint_text] = <[String; 5]>::try_from(texts)
                .unwrap_or_default();
            Ok::<_, crate::Error>(Bonus {
                name,
                bonus_task,
                answers,
                levels_available: (!all_levels)
                    .then(|| boxes.iter().filter(|b| b.checked).map(|b| b.index).collect()),
                available_time: has_window.then_some((valid_from, valid_to)),
                appearance_delay: has_delay.then(|| Hms::from_fields(&delay)),
                availability_window: has_relative.then(|| Hms::from_fields(&window)),
                bonus_time: Hms::from_fields(&bonus_time),
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
            form::enter_edit_mode(driver, EDIT_LINK).await?;
            driver.wait(700).await;

            let scope = if self.custom_levels().is_some() {
                CUSTOM_LEVELS
            } else {
                ALL_LEVELS
            };
            driver.click(scope).await?;
            form::set_checked(driver, ABSOLUTE_LIMIT, self.available_time.is_some()).await?;
            form::set_checked(driver, DELAY, self.appearance_delay.is_some()).await?;
            form::set_checked(driver, RELATIVE_LIMIT, self.availability_window.is_some()).await?;

            let mut fields: Vec<(&str, String)> = vec![
                ("txtBonusName", self.name.clone()),
                ("txtTask", self.bonus_task.clone()),
                ("txtHelp", self.hint_text.clone()),
            ];
            if let Some((from, to)) = &self.available_time {
                fields.push(("txtValidFrom", from.clone()));
                fields.push(("txtValidTo", to.clone()));
            }
            let groups = [
                (&DELAY_FIELDS, self.appearance_delay),
                (&WINDOW_FIELDS, self.availability_window),
                (&BONUS_TIME_FIELDS, Some(self.bonus_time)),
            ];
            for (names, value) in groups {
                if let Some(value) = value {
                    fields.extend(names.iter().zip(value.fields()).map(|(n, v)| (*n, v.to_string())));
                }
            }
            form::fill(driver, &fields).await?;

            self.sync_levels(driver).await?;
            self.fill_answers(driver).await?;
            form::set_team(driver, self.dedicated_to_who).await?;
            form::submit(driver, r#"[name="btnUpdate"]"#, r#"[name="btnAdd"]"#).await?;
            Ok::<_, crate::Error>(())
        }
        .await;
        close_after(driver, outcome).await
    }
}
