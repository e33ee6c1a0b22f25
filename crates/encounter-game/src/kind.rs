use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::urls;

/// Every part of a level that can be captured or written on its own.
///
/// Declaration order is traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Name,
    Autopass,
    AnswerBlock,
    SectorsToCover,
    Tasks,
    Hints,
    PenalizedHints,
    Bonuses,
    Answers,
}

/// Kinds to leave alone on read and on write.
pub type SkipSet = BTreeSet<EntityKind>;

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Name,
        EntityKind::Autopass,
        EntityKind::AnswerBlock,
        EntityKind::SectorsToCover,
        EntityKind::Tasks,
        EntityKind::Hints,
        EntityKind::PenalizedHints,
        EntityKind::Bonuses,
        EntityKind::Answers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Name => "name",
            EntityKind::Autopass => "autopass",
            EntityKind::AnswerBlock => "answer_block",
            EntityKind::SectorsToCover => "sectors_to_cover",
            EntityKind::Tasks => "tasks",
            EntityKind::Hints => "hints",
            EntityKind::PenalizedHints => "penalized_hints",
            EntityKind::Bonuses => "bonuses",
            EntityKind::Answers => "answers",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = EntityKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown entity kind '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Entities edited through numbered slots in a table of the level page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Hint,
    PenalizedHint,
    Bonus,
}

impl SlotKind {
    /// Numeric type used by the admin UI (0, 1, 2).
    pub fn code(&self) -> u8 {
        match self {
            SlotKind::Hint => 0,
            SlotKind::PenalizedHint => 1,
            SlotKind::Bonus => 2,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            SlotKind::Hint => EntityKind::Hints,
            SlotKind::PenalizedHint => EntityKind::PenalizedHints,
            SlotKind::Bonus => EntityKind::Bonuses,
        }
    }

    /// Index of this kind's table among `table.bg_dark` on the level page.
    pub fn table_index(&self) -> usize {
        2 + self.code() as usize
    }

    /// Script returning the edit-link hrefs of the live slots, in page order.
    pub fn slot_hrefs_js(&self) -> String {
        format!(
            r#"(() => {{
    const table = $('table.bg_dark')[{}];
    if (!table) return [];
    return $(table).find('table tr a').map(function () {{ return $(this).attr('href'); }}).get();
}})()"#,
            self.table_index()
        )
    }

    /// Popup-opening script for a fresh slot.
    pub fn new_slot_script(&self, game_id: u32, level_id: u32) -> String {
        match self {
            SlotKind::Hint => urls::new_hint_script(game_id, level_id),
            SlotKind::PenalizedHint => urls::new_penalized_hint_script(game_id, level_id),
            SlotKind::Bonus => urls::new_bonus_script(game_id, level_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("hint".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_skip_set_is_ordered_by_traversal() {
        let skip: SkipSet = serde_json::from_str(r#"["answers", "name", "bonuses"]"#).unwrap();
        let order: Vec<_> = skip.into_iter().collect();
        assert_eq!(
            order,
            vec![EntityKind::Name, EntityKind::Bonuses, EntityKind::Answers]
        );
    }

    #[test]
    fn test_slot_tables() {
        assert_eq!(SlotKind::Hint.table_index(), 2);
        assert_eq!(SlotKind::PenalizedHint.table_index(), 3);
        assert_eq!(SlotKind::Bonus.table_index(), 4);
        assert!(SlotKind::Bonus
            .slot_hrefs_js()
            .contains("$('table.bg_dark')[4]"));
        assert_eq!(SlotKind::PenalizedHint.entity_kind(), EntityKind::PenalizedHints);
    }
}
