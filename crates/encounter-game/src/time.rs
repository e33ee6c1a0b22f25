use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hours, minutes, seconds. Serialized as `[h, m, s]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hms(pub u32, pub u32, pub u32);

/// Days, hours, minutes, seconds. Serialized as `[d, h, m, s]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dhms(pub u32, pub u32, pub u32, pub u32);

fn prose_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\s*(day|hour|minute|second)s?").expect("prose duration pattern")
    })
}

impl Hms {
    pub fn is_zero(&self) -> bool {
        *self == Hms::default()
    }

    pub fn fields(&self) -> [u32; 3] {
        [self.0, self.1, self.2]
    }

    pub fn from_fields(f: &[u32]) -> Self {
        let at = |i: usize| f.get(i).copied().unwrap_or(0);
        Hms(at(0), at(1), at(2))
    }

    /// Parse the prose a completed game shows instead of its settings form,
    /// e.g. `"1 days 2 hours 5 minutes"`. Days fold into hours; missing units
    /// are zero.
    pub fn parse_prose(text: &str) -> Self {
        let mut out = Hms::default();
        for cap in prose_re().captures_iter(text) {
            let n: u32 = cap[1].parse().unwrap_or(0);
            match &cap[2] {
                "day" => out.0 = out.0.saturating_add(n.saturating_mul(24)),
                "hour" => out.0 = out.0.saturating_add(n),
                "minute" => out.1 = out.1.saturating_add(n),
                _ => out.2 = out.2.saturating_add(n),
            }
        }
        out
    }
}

impl Dhms {
    pub fn fields(&self) -> [u32; 4] {
        [self.0, self.1, self.2, self.3]
    }

    pub fn from_fields(f: &[u32]) -> Self {
        let at = |i: usize| f.get(i).copied().unwrap_or(0);
        Dhms(at(0), at(1), at(2), at(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prose() {
        assert_eq!(Hms::parse_prose("1 days 2 hours 5 minutes"), Hms(26, 5, 0));
        assert_eq!(Hms::parse_prose(" 30 seconds"), Hms(0, 0, 30));
        assert_eq!(Hms::parse_prose("1 hour 1 minute 1 second"), Hms(1, 1, 1));
        assert_eq!(Hms::parse_prose("no"), Hms::default());
    }

    #[test]
    fn test_parse_prose_saturates() {
        assert_eq!(
            Hms::parse_prose("4000000000 days 1 hour"),
            Hms(u32::MAX, 0, 0)
        );
        assert_eq!(
            Hms::parse_prose("4000000000 minutes, 4000000000 minutes"),
            Hms(0, u32::MAX, 0)
        );
    }

    #[test]
    fn test_serialized_as_arrays() {
        assert_eq!(serde_json::to_string(&Hms(1, 2, 3)).unwrap(), "[1,2,3]");
        let d: Dhms = serde_json::from_str("[0,1,0,30]").unwrap();
        assert_eq!(d, Dhms(0, 1, 0, 30));
    }

    #[test]
    fn test_from_fields_pads_with_zero() {
        assert_eq!(Hms::from_fields(&[4]), Hms(4, 0, 0));
        assert_eq!(Dhms::from_fields(&[1, 2, 3, 4, 5]), Dhms(1, 2, 3, 4));
        assert!(Hms::from_fields(&[]).is_zero());
    }
}
