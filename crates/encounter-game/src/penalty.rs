//! Penalty bonuses: one bonus per candidate answer, where only the right
//! ones reveal a gate code that unlocks the level.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::bonus::Bonus;
use crate::time::Hms;

const BONUS_NAME: &str = "Штрафной бонус";
const WRONG: &str = "Неверно";
const GATE_CODE_LEN: usize = 10;

/// One candidate answer: a single code, or several codes entered together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variant {
    Single(String),
    Composite(Vec<String>),
}

impl Variant {
    pub fn parts(&self) -> Vec<String> {
        match self {
            Variant::Single(s) => vec![s.clone()],
            Variant::Composite(parts) => parts.clone(),
        }
    }

    pub fn answer_set(&self) -> BTreeSet<String> {
        self.parts().into_iter().collect()
    }

    fn repr(&self) -> String {
        match self {
            Variant::Single(s) => py_str(s),
            Variant::Composite(parts) => py_list(parts.iter().map(|p| py_str(p))),
        }
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::Single(s.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for Variant {
    fn from(parts: [&str; N]) -> Self {
        Variant::Composite(parts.iter().map(|p| p.to_string()).collect())
    }
}

/// Quoted the way the hashed text has always been built, so gate codes stay
/// stable across tool versions.
fn py_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn py_list(items: impl Iterator<Item = String>) -> String {
    format!("[{}]", items.collect::<Vec<_>>().join(", "))
}

/// First ten hex digits of the md5 of the sorted right answers, every
/// variant in input order, and the seed.
pub fn gate_code(right: &BTreeSet<String>, variants: &[Variant], seed: u64) -> String {
    let text = format!(
        "{}{}{}",
        py_list(right.iter().map(|r| py_str(r))),
        py_list(variants.iter().map(Variant::repr)),
        seed
    );
    let digest = format!("{:x}", md5::compute(text.as_bytes()));
    digest[..GATE_CODE_LEN].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyOptions {
    pub seed: u64,
    /// Shuffle the bonuses with `seed`.
    pub shuffle: bool,
    /// Appended to the wrong-answer message.
    pub penalty: Option<String>,
}

impl Default for PenaltyOptions {
    fn default() -> Self {
        Self {
            seed: 41,
            shuffle: false,
            penalty: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyBonuses {
    pub bonuses: Vec<Bonus>,
    pub gate_code: String,
}

/// One bonus per variant, open on `levels`.
///
/// A variant whose codes are exactly `right` reveals the gate code; every
/// other variant answers with the wrong-answer message.
pub fn penalty_bonuses(
    right: &BTreeSet<String>,
    variants: &[Variant],
    levels: &[u32],
    options: &PenaltyOptions,
) -> PenaltyBonuses {
    let gate = gate_code(right, variants, options.seed);
    let right_text = format!("Верно! Введите в поле ввода '{gate}' (без кавычек)");
    let wrong_text = match &options.penalty {
        Some(penalty) => format!("{WRONG}. {penalty}"),
        None => WRONG.to_string(),
    };

    let mut ordered = variants.to_vec();
    if options.shuffle {
        ordered.shuffle(&mut StdRng::seed_from_u64(options.seed));
    }
    let bonuses = ordered
        .into_iter()
        .map(|variant| {
            let is_right = variant.answer_set() == *right;
            Bonus {
                name: BONUS_NAME.to_string(),
                answers: variant.parts(),
                levels_available: Some(levels.to_vec()),
                bonus_time: Hms(0, 0, 1),
                hint_text: if is_right {
                    right_text.clone()
                } else {
                    wrong_text.clone()
                },
                ..Default::default()
            }
        })
        .collect();
    PenaltyBonuses {
        bonuses,
        gate_code: gate,
    }
}
