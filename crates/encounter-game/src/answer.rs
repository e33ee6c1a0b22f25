//! Level answers, optionally grouped into named sectors.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use encounter_driver::Driver;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::form::{self, eval_or_default};
use crate::urls;
use crate::{Error, Result};

/// Answer inputs on one submission of the answer editor.
pub const MAX_ANSWERS_PER_SECTOR: usize = 10;

pub const SHOW_ANSWERS: &str = "#AnswersTable_ctl00_lnkShowAnswers";
const SECTOR_NAMES: &str = "#hdnSectorNames_0";
const ADD_SECTOR: &str = "a[title='Add sector']";
const ADD_ANSWERS: &str = "a[title='Add answers']";
/// Pause after revealing the answers block or opening an answer form.
const ANSWERS_MS: u64 = 300;

const EDIT_HREFS_JS: &str = r#"(() => {
    return $("a[title='Edit']").map(function () { return $(this).attr('href'); }).get();
})()"#;

/// Options already stored on an answer editor page. The blank inputs for new
/// answers have single-digit suffixes and are skipped.
const READ_OPTIONS_JS: &str = r#"(() => {
    const res = [];
    $('input').filter(function () { return /txtAnswer_[0-9]{2,}/.test(this.name); }).each(function () {
        const text = $(this).val();
        if (!text) return;
        const sel = $(this).closest('tr').find('select')[0];
        const who = sel ? parseInt(sel.value, 10) : 0;
        res.push({ text: text, dedicated_to_who: isNaN(who) ? 0 : who });
    });
    return res;
})()"#;

/// One accepted answer text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AnswerOptionRepr")]
pub struct AnswerOption {
    pub text: String,
    pub dedicated_to_who: u32,
}

/// Older snapshots stored options as plain strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerOptionRepr {
    Bare(String),
    Record {
        text: String,
        #[serde(default)]
        dedicated_to_who: u32,
    },
}

impl From<AnswerOptionRepr> for AnswerOption {
    fn from(repr: AnswerOptionRepr) -> Self {
        match repr {
            AnswerOptionRepr::Bare(text) => AnswerOption {
                text,
                dedicated_to_who: 0,
            },
            AnswerOptionRepr::Record {
                text,
                dedicated_to_who,
            } => AnswerOption {
                text,
                dedicated_to_who,
            },
        }
    }
}

impl From<&str> for AnswerOption {
    fn from(text: &str) -> Self {
        AnswerOption {
            text: text.to_string(),
            dedicated_to_who: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub options: Vec<AnswerOption>,
    /// Sector name; `None` on a level without sectors.
    #[serde(default)]
    pub name: Option<String>,
    /// Explicit position among the level's answers.
    #[serde(default)]
    pub order: Option<u32>,
}

/// Button that submits one batch of answer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTarget {
    /// First batch of a sector.
    SaveSector,
    /// Further batches of a sector, under the same sector name.
    AddSector,
    /// Any batch on a level without sectors.
    Save,
}

impl SubmitTarget {
    pub fn select(has_sectors: bool, first_batch: bool) -> Self {
        match (has_sectors, first_batch) {
            (true, true) => SubmitTarget::SaveSector,
            (true, false) => SubmitTarget::AddSector,
            (false, _) => SubmitTarget::Save,
        }
    }

    /// Link that opens a blank form for the batch.
    pub fn opener(&self) -> &'static str {
        match self {
            SubmitTarget::SaveSector | SubmitTarget::AddSector => ADD_SECTOR,
            SubmitTarget::Save => ADD_ANSWERS,
        }
    }

    pub fn button(&self) -> &'static str {
        match self {
            SubmitTarget::SaveSector | SubmitTarget::AddSector => r#"input[name="btnSaveSector"]"#,
            SubmitTarget::Save => r#"input[name="AnswersTable_ctl00_NewAnswerEditor_ctl00_btnSave"]"#,
        }
    }
}

impl Answer {
    pub fn new<I, S>(options: I, name: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Answer {
            options: options
                .into_iter()
                .map(|s| AnswerOption::from(s.as_ref()))
                .collect(),
            name: name.map(str::to_string),
            order: None,
        }
    }

    /// Split into batches of at most [`MAX_ANSWERS_PER_SECTOR`] options, each
    /// keeping the sector name and order.
    pub fn parts(&self) -> Vec<Answer> {
        self.options
            .chunks(MAX_ANSWERS_PER_SECTOR)
            .map(|chunk| Answer {
                options: chunk.to_vec(),
                name: self.name.clone(),
                order: self.order,
            })
            .collect()
    }

    fn check_batch(&self) -> Result<()> {
        if self.options.len() > MAX_ANSWERS_PER_SECTOR {
            return Err(Error::TooManyOptions {
                count: self.options.len(),
                max: MAX_ANSWERS_PER_SECTOR,
            });
        }
        Ok(())
    }

    /// Read the options from an answer editor page.
    pub async fn read<D: Driver>(driver: &mut D, url: &str, name: Option<String>) -> Result<Self> {
        driver.goto(url).await?;
        let options: Vec<AnswerOption> = eval_or_default(driver, READ_OPTIONS_JS).await?;
        Ok(Answer {
            options,
            name,
            order: None,
        })
    }

    /// Fill the open answer form with this batch and submit it through
    /// `target`. Fails before touching the page if the batch is too large.
    pub async fn write_part<D: Driver>(&self, driver: &mut D, target: SubmitTarget) -> Result<()> {
        self.check_batch()?;

        let names: Vec<String> = (0..self.options.len())
            .map(|i| format!("txtAnswer_{i}"))
            .collect();
        let mut fields: Vec<(&str, String)> = names
            .iter()
            .map(String::as_str)
            .zip(self.options.iter().map(|o| o.text.clone()))
            .collect();
        if let Some(name) = &self.name {
            fields.push(("txtSectorName", name.clone()));
        }
        form::fill(driver, &fields).await?;

        let teams: Vec<(usize, u32)> = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.dedicated_to_who != 0)
            .map(|(i, o)| (i, o.dedicated_to_who))
            .collect();
        if !teams.is_empty() {
            let teams = serde_json::to_string(&teams).map_err(encounter_driver::Error::from)?;
            let js = format!(
                r#"(() => {{
    for (const [i, who] of {teams}) {{
        $('input[name="txtAnswer_' + i + '"]').closest('tr').find('select').val(String(who));
    }}
    return true;
}})()"#
            );
            driver.exec(&js).await?;
        }

        driver.click(target.button()).await?;
        Ok(())
    }
}

/// A level has sectors when it has several answers, or one named answer.
pub fn has_sectors(answers: &[Answer]) -> bool {
    answers.len() > 1 || answers.first().is_some_and(|a| a.name.is_some())
}

/// Submission order: by `order` when every answer carries one, else as
/// listed.
pub fn ordered(answers: &[Answer]) -> Vec<&Answer> {
    let mut out: Vec<&Answer> = answers.iter().collect();
    if !out.is_empty() && out.iter().all(|a| a.order.is_some()) {
        out.sort_by_key(|a| a.order);
    }
    out
}

fn sector_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#":\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#)
            .expect("sector map pattern")
    })
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Sector names, in order, from the page's `'key': 'name', ...` map literal.
pub fn parse_sector_names(raw: &str) -> Vec<String> {
    sector_value_re()
        .captures_iter(raw)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
        .map(|m| unescape(m.as_str()))
        .collect()
}

async fn sector_names<D: Driver>(driver: &mut D) -> Result<Vec<String>> {
    let raw = driver
        .find(SECTOR_NAMES)
        .await?
        .and_then(|e| e.value)
        .unwrap_or_default();
    Ok(parse_sector_names(&raw))
}

/// Reveal the answers block of the level page. Returns false when the level
/// has none.
async fn show_answers<D: Driver>(driver: &mut D) -> Result<bool> {
    if !driver.exists(SHOW_ANSWERS).await? {
        return Ok(false);
    }
    driver.click(SHOW_ANSWERS).await?;
    driver.wait(ANSWERS_MS).await;
    Ok(true)
}

/// Read every answer of the level page. Leaves the browser on the last
/// answer editor page.
pub(crate) async fn read_level_answers<D: Driver>(driver: &mut D, domain: &str) -> Result<Vec<Answer>> {
    if !show_answers(driver).await? {
        debug!("No answers block on level");
        return Ok(Vec::new());
    }
    let hrefs: Vec<String> = eval_or_default(driver, EDIT_HREFS_JS).await?;
    let mut names: Vec<Option<String>> = sector_names(driver).await?.into_iter().map(Some).collect();
    if names.is_empty() {
        names.push(None);
    }

    let mut answers = Vec::new();
    for (i, (href, name)) in hrefs.iter().zip(names).enumerate() {
        let mut answer = Answer::read(driver, &urls::absolute(domain, href), name).await?;
        answer.order = Some(i as u32);
        answers.push(answer);
    }
    Ok(answers)
}

/// Batches already submitted for a level, so a retried write resumes instead
/// of submitting them twice.
#[derive(Debug, Default)]
pub(crate) struct AnswerProgress {
    remote_sectors: Option<BTreeSet<String>>,
    done: BTreeSet<(usize, usize)>,
}

/// Submit `answers` on the current level page.
///
/// With `keep_existing`, answers whose sector name already exists on the
/// level are left out.
pub(crate) async fn write_level_answers<D: Driver>(
    driver: &mut D,
    answers: &[Answer],
    keep_existing: bool,
    progress: &mut AnswerProgress,
) -> Result<()> {
    let has_sectors = has_sectors(answers);
    let batches: Vec<(usize, usize, Answer)> = ordered(answers)
        .into_iter()
        .enumerate()
        .flat_map(|(ai, answer)| {
            answer
                .parts()
                .into_iter()
                .enumerate()
                .map(move |(pi, part)| (ai, pi, part))
        })
        .collect();
    for (_, _, part) in &batches {
        part.check_batch()?;
    }

    show_answers(driver).await?;
    if keep_existing && progress.remote_sectors.is_none() {
        progress.remote_sectors = Some(sector_names(driver).await?.into_iter().collect());
    }
    let remote = progress.remote_sectors.clone().unwrap_or_default();

    for (ai, pi, part) in batches {
        if progress.done.contains(&(ai, pi)) {
            continue;
        }
        if let Some(name) = part.name.as_ref().filter(|n| remote.contains(*n)) {
            info!("Sector '{}' already exists, keeping it", name);
            continue;
        }
        let target = SubmitTarget::select(has_sectors, pi == 0);
        debug!("Answer {} part {} via {:?}", ai, pi, target);
        driver.click(target.opener()).await?;
        driver.wait(ANSWERS_MS).await;
        part.write_part(driver, target).await?;
        progress.done.insert((ai, pi));
    }
    Ok(())
}
