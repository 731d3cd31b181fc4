use chrono::{DateTime, Duration, SubsecRound, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::DoseError;

// ---------------------------------------------------------------------------
// DosageUnit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DosageUnit {
    Mg,
    Ml,
    Tablet,
    Drop,
    Tsp,
    Tbsp,
    Other(String),
}

impl FromStr for DosageUnit {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "mg" | "milligram" | "milligrams" => Self::Mg,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Self::Ml,
            "tablet" | "tablets" | "tab" | "tabs" => Self::Tablet,
            "drop" | "drops" => Self::Drop,
            "tsp" | "teaspoon" | "teaspoons" => Self::Tsp,
            "tbsp" | "tablespoon" | "tablespoons" => Self::Tbsp,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for DosageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mg => write!(f, "mg"),
            Self::Ml => write!(f, "ml"),
            Self::Tablet => write!(f, "tablet"),
            Self::Drop => write!(f, "drop"),
            Self::Tsp => write!(f, "tsp"),
            Self::Tbsp => write!(f, "tbsp"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DoseInterval
// ---------------------------------------------------------------------------

/// Gap between doses, in whole minutes. Zero means no restriction.
///
/// Always within `0..=DoseInterval::MAX_MINUTES`; deserialisation goes
/// through the same check as the constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct DoseInterval {
    minutes: i64,
}

/// Common intervals offered by the entry control, as `days:hours:minutes`.
pub const COMMON_INTERVALS: &[(&str, &str)] = &[
    ("0:0:15", "Every 15 minutes"),
    ("0:0:30", "Every 30 minutes"),
    ("0:0:45", "Every 45 minutes"),
    ("0:1:0", "Every hour"),
    ("0:2:0", "Every 2 hours"),
    ("0:3:0", "Every 3 hours"),
    ("0:4:0", "Every 4 hours"),
    ("0:6:0", "Every 6 hours"),
    ("0:8:0", "Every 8 hours"),
    ("0:12:0", "Every 12 hours (twice daily)"),
    ("1:0:0", "Daily (once per day)"),
    ("2:0:0", "Every 2 days"),
    ("3:0:0", "Every 3 days"),
    ("7:0:0", "Weekly"),
    ("14:0:0", "Every 2 weeks"),
    ("30:0:0", "Monthly"),
];

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

impl DoseInterval {
    pub const ZERO: Self = Self { minutes: 0 };

    /// Largest interval the entry control can produce: 365d 23h 59m.
    pub const MAX_MINUTES: i64 = IntervalInput::MAX_DAYS * MINUTES_PER_DAY
        + IntervalInput::MAX_HOURS * MINUTES_PER_HOUR
        + IntervalInput::MAX_MINUTES;

    /// Returns `None` outside `0..=MAX_MINUTES`.
    pub fn from_minutes(minutes: i64) -> Option<Self> {
        (0..=Self::MAX_MINUTES)
            .contains(&minutes)
            .then_some(Self { minutes })
    }

    /// Combine components without clamping. `None` on negatives or when the
    /// total exceeds `MAX_MINUTES`.
    pub fn from_parts(days: i64, hours: i64, minutes: i64) -> Option<Self> {
        if days < 0 || hours < 0 || minutes < 0 {
            return None;
        }
        let total = days
            .checked_mul(MINUTES_PER_DAY)?
            .checked_add(hours.checked_mul(MINUTES_PER_HOUR)?)?
            .checked_add(minutes)?;
        Self::from_minutes(total)
    }

    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    pub fn is_zero(&self) -> bool {
        self.minutes == 0
    }

    /// Saturates at `Duration::MAX`, so an out-of-range value can only ever
    /// lengthen the wait.
    pub fn as_duration(&self) -> Duration {
        Duration::try_minutes(self.minutes).unwrap_or(Duration::MAX)
    }

    /// Split into `(days, hours, minutes)`.
    pub fn parts(&self) -> (i64, i64, i64) {
        let days = self.minutes / MINUTES_PER_DAY;
        let rest = self.minutes % MINUTES_PER_DAY;
        (days, rest / MINUTES_PER_HOUR, rest % MINUTES_PER_HOUR)
    }

    /// Description of the matching preset, if this is one of the common intervals.
    pub fn preset_label(&self) -> Option<&'static str> {
        let (d, h, m) = self.parts();
        let key = format!("{d}:{h}:{m}");
        COMMON_INTERVALS
            .iter()
            .find(|(value, _)| *value == key)
            .map(|(_, label)| *label)
    }
}

impl TryFrom<i64> for DoseInterval {
    type Error = String;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes)
            .ok_or_else(|| format!("interval of {minutes} minutes is out of range"))
    }
}

impl From<DoseInterval> for i64 {
    fn from(interval: DoseInterval) -> Self {
        interval.minutes
    }
}

static INTERVAL_UNITS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(\d+)\s*d)?\s*(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?$")
        .expect("interval pattern is valid")
});

impl FromStr for DoseInterval {
    type Err = anyhow::Error;

    /// Accepts `"4h"`, `"1d 6h"`, `"90m"`, `"1d12h30m"` or `"days:hours:minutes"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            let parts: Vec<&str> = s.split(':').map(str::trim).collect();
            if parts.len() > 3 {
                anyhow::bail!("invalid interval: {s} (expected days:hours:minutes)");
            }
            let mut nums = [0i64; 3];
            for (slot, part) in nums.iter_mut().zip(&parts) {
                if !part.is_empty() {
                    *slot = part
                        .parse()
                        .map_err(|_| anyhow::anyhow!("invalid interval: {s}"))?;
                }
            }
            return Self::from_parts(nums[0], nums[1], nums[2])
                .ok_or_else(|| anyhow::anyhow!("invalid interval: {s} (must be between 0m and 365d 23h 59m)"));
        }

        let caps = INTERVAL_UNITS_RE
            .captures(s)
            .filter(|c| c.iter().skip(1).any(|g| g.is_some()))
            .ok_or_else(|| anyhow::anyhow!("invalid interval: {s} (e.g. 4h, 1d 6h, 30m)"))?;
        let part = |i: usize| -> anyhow::Result<i64> {
            match caps.get(i) {
                Some(m) => Ok(m.as_str().parse()?),
                None => Ok(0),
            }
        };
        Self::from_parts(part(1)?, part(2)?, part(3)?)
            .ok_or_else(|| anyhow::anyhow!("interval too large: {s} (at most 365d 23h 59m)"))
    }
}

impl fmt::Display for DoseInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0m");
        }
        let (d, h, m) = self.parts();
        let mut pieces = Vec::new();
        if d > 0 {
            pieces.push(format!("{d}d"));
        }
        if h > 0 {
            pieces.push(format!("{h}h"));
        }
        if m > 0 {
            pieces.push(format!("{m}m"));
        }
        write!(f, "{}", pieces.join(" "))
    }
}

// ---------------------------------------------------------------------------
// IntervalInput
// ---------------------------------------------------------------------------

/// The three bounded fields of the interval entry control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalInput {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl IntervalInput {
    pub const MAX_DAYS: i64 = 365;
    pub const MAX_HOURS: i64 = 23;
    pub const MAX_MINUTES: i64 = 59;

    /// Each field clamped to its own bound. Overflow is not carried into the
    /// next unit.
    pub fn clamped(&self) -> Self {
        Self {
            days: self.days.clamp(0, Self::MAX_DAYS),
            hours: self.hours.clamp(0, Self::MAX_HOURS),
            minutes: self.minutes.clamp(0, Self::MAX_MINUTES),
        }
    }

    pub fn compose(&self) -> DoseInterval {
        let c = self.clamped();
        DoseInterval {
            minutes: c.days * MINUTES_PER_DAY + c.hours * MINUTES_PER_HOUR + c.minutes,
        }
    }
}

// ---------------------------------------------------------------------------
// ParsedDosage + parse_dosage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDosage {
    pub amount: f64,
    pub unit: Option<DosageUnit>,
}

static FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*/\s*(\d+)\s*(.*)$").expect("fraction pattern is valid")
});

static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+\.?\d*|\.\d+)\s*(.*)$").expect("decimal pattern is valid")
});

/// Parse a dosage entry such as `"5"`, `"2.5ml"`, `"1/2 tablet"` or `"½ tablet"`.
///
/// The amount must be a positive number; a trailing unit is optional.
pub fn parse_dosage(input: &str) -> Result<ParsedDosage, DoseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DoseError::validation("dosage", "a dosage is required"));
    }

    let parsed = try_unicode_fraction(trimmed)
        .or_else(|| try_fraction(trimmed))
        .or_else(|| try_decimal(trimmed));

    match parsed {
        Some(p) if p.amount.is_finite() && p.amount > 0.0 => Ok(p),
        Some(_) => Err(DoseError::validation("dosage", "Dosage must be positive")),
        None => Err(DoseError::validation(
            "dosage",
            format!("'{trimmed}' is not a number"),
        )),
    }
}

fn unit_from_rest(rest: &str) -> Option<DosageUnit> {
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        rest.parse().ok()
    }
}

fn try_unicode_fraction(s: &str) -> Option<ParsedDosage> {
    let fractions: &[(char, f64)] = &[
        ('\u{00bd}', 0.5),
        ('\u{2153}', 1.0 / 3.0),
        ('\u{2154}', 2.0 / 3.0),
        ('\u{00bc}', 0.25),
        ('\u{00be}', 0.75),
    ];

    let first = s.chars().next()?;
    let &(ch, amount) = fractions.iter().find(|(ch, _)| *ch == first)?;
    Some(ParsedDosage {
        amount,
        unit: unit_from_rest(&s[ch.len_utf8()..]),
    })
}

fn try_fraction(s: &str) -> Option<ParsedDosage> {
    let caps = FRACTION_RE.captures(s)?;
    let num: f64 = caps[1].parse().ok()?;
    let den: f64 = caps[2].parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(ParsedDosage {
        amount: num / den,
        unit: unit_from_rest(&caps[3]),
    })
}

fn try_decimal(s: &str) -> Option<ParsedDosage> {
    let caps = DECIMAL_RE.captures(s)?;
    let amount: f64 = caps[1].parse().ok()?;
    Some(ParsedDosage {
        amount,
        unit: unit_from_rest(&caps[2]),
    })
}

/// Split a comma-separated tag list into a set, dropping blanks.
pub fn parse_tags(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// DoseRecord
// ---------------------------------------------------------------------------

/// One administered dose of a medicine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseRecord {
    pub id: String,
    pub subject_id: String,
    pub name: String,
    pub dosage: f64,
    pub dosage_unit: DosageUnit,
    pub given_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<DoseInterval>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl DoseRecord {
    /// A new active dose given now, with no interval.
    pub fn new(
        subject_id: impl Into<String>,
        name: impl Into<String>,
        dosage: f64,
        dosage_unit: DosageUnit,
    ) -> Self {
        let now = Utc::now().trunc_subsecs(0);
        Self {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.into(),
            name: name.into().trim().to_string(),
            dosage,
            dosage_unit,
            given_at: now,
            interval: None,
            is_recurring: false,
            active: true,
            notes: None,
            tags: BTreeSet::new(),
            created_at: now,
        }
    }

    /// Identity used to group doses of the same medicine.
    pub fn medicine_key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- DosageUnit ----------------------------------------------------------

    #[test]
    fn unit_from_str_known_and_plural() {
        assert_eq!("ML".parse::<DosageUnit>().unwrap(), DosageUnit::Ml);
        assert_eq!("tablets".parse::<DosageUnit>().unwrap(), DosageUnit::Tablet);
        assert_eq!("drops".parse::<DosageUnit>().unwrap(), DosageUnit::Drop);
        assert_eq!("teaspoon".parse::<DosageUnit>().unwrap(), DosageUnit::Tsp);
        assert_eq!("tbsp".parse::<DosageUnit>().unwrap(), DosageUnit::Tbsp);
    }

    #[test]
    fn unit_from_str_unknown() {
        assert_eq!(
            "sachet".parse::<DosageUnit>().unwrap(),
            DosageUnit::Other("sachet".to_string())
        );
    }

    #[test]
    fn unit_display_parses_back() {
        for u in [
            DosageUnit::Mg,
            DosageUnit::Ml,
            DosageUnit::Tablet,
            DosageUnit::Drop,
            DosageUnit::Tsp,
            DosageUnit::Tbsp,
        ] {
            assert_eq!(u.to_string().parse::<DosageUnit>().unwrap(), u);
        }
    }

    // -- DoseInterval --------------------------------------------------------

    #[test]
    fn interval_parse_unit_forms() {
        assert_eq!("4h".parse::<DoseInterval>().unwrap().minutes(), 240);
        assert_eq!("1d 6h".parse::<DoseInterval>().unwrap().minutes(), 1800);
        assert_eq!("90m".parse::<DoseInterval>().unwrap().minutes(), 90);
        assert_eq!("1d12h30m".parse::<DoseInterval>().unwrap().minutes(), 2190);
    }

    #[test]
    fn interval_parse_preset_form() {
        assert_eq!("0:4:0".parse::<DoseInterval>().unwrap().minutes(), 240);
        assert_eq!("1:0:0".parse::<DoseInterval>().unwrap().minutes(), 1440);
        assert_eq!("0:0:15".parse::<DoseInterval>().unwrap().minutes(), 15);
    }

    #[test]
    fn interval_parse_rejects_garbage() {
        assert!("".parse::<DoseInterval>().is_err());
        assert!("soon".parse::<DoseInterval>().is_err());
        assert!("4".parse::<DoseInterval>().is_err());
        assert!("0:-4:0".parse::<DoseInterval>().is_err());
        assert!("1:2:3:4".parse::<DoseInterval>().is_err());
    }

    #[test]
    fn interval_upper_bound() {
        let max = "365d 23h 59m".parse::<DoseInterval>().unwrap();
        assert_eq!(max.minutes(), DoseInterval::MAX_MINUTES);
        assert_eq!("365:23:59".parse::<DoseInterval>().unwrap(), max);
        assert_eq!(
            DoseInterval::from_minutes(DoseInterval::MAX_MINUTES),
            Some(max)
        );

        assert!("365d 23h 60m".parse::<DoseInterval>().is_err());
        assert!("366d".parse::<DoseInterval>().is_err());
        assert!("365:24:0".parse::<DoseInterval>().is_err());
        assert!(DoseInterval::from_minutes(DoseInterval::MAX_MINUTES + 1).is_none());
    }

    #[test]
    fn interval_huge_values_rejected_without_panic() {
        assert!("200000000000000m".parse::<DoseInterval>().is_err());
        assert!("100000000d".parse::<DoseInterval>().is_err());
        assert!("99999999999999999999h".parse::<DoseInterval>().is_err());
    }

    #[test]
    fn interval_deserialize_checks_range() {
        let ok: DoseInterval = serde_json::from_str("240").unwrap();
        assert_eq!(ok.minutes(), 240);
        assert_eq!(serde_json::to_string(&ok).unwrap(), "240");
        assert!(serde_json::from_str::<DoseInterval>("-5").is_err());
        assert!(serde_json::from_str::<DoseInterval>("200000000000000").is_err());
    }

    #[test]
    fn interval_display() {
        assert_eq!(DoseInterval::ZERO.to_string(), "0m");
        assert_eq!(DoseInterval::from_minutes(240).unwrap().to_string(), "4h");
        assert_eq!(DoseInterval::from_minutes(1830).unwrap().to_string(), "1d 6h 30m");
    }

    #[test]
    fn interval_negative_rejected() {
        assert!(DoseInterval::from_minutes(-1).is_none());
        assert!(DoseInterval::from_parts(0, -1, 0).is_none());
    }

    #[test]
    fn interval_preset_label() {
        let four_hours = DoseInterval::from_parts(0, 4, 0).unwrap();
        assert_eq!(four_hours.preset_label(), Some("Every 4 hours"));
        let odd = DoseInterval::from_parts(0, 5, 0).unwrap();
        assert_eq!(odd.preset_label(), None);
    }

    // -- IntervalInput -------------------------------------------------------

    #[test]
    fn interval_input_clamps_each_field() {
        let input = IntervalInput {
            days: 400,
            hours: 30,
            minutes: 90,
        };
        assert_eq!(
            input.clamped(),
            IntervalInput {
                days: 365,
                hours: 23,
                minutes: 59
            }
        );
        assert_eq!(input.compose().parts(), (365, 23, 59));
    }

    #[test]
    fn interval_input_negative_clamps_to_zero() {
        let input = IntervalInput {
            days: -2,
            hours: 4,
            minutes: -10,
        };
        assert_eq!(input.compose().parts(), (0, 4, 0));
    }

    #[test]
    fn interval_input_all_zero_is_zero() {
        assert!(IntervalInput::default().compose().is_zero());
    }

    // -- parse_dosage --------------------------------------------------------

    #[test]
    fn parse_dosage_bare_number() {
        let d = parse_dosage("5").unwrap();
        assert_eq!(d.amount, 5.0);
        assert_eq!(d.unit, None);
    }

    #[test]
    fn parse_dosage_glued_unit() {
        let d = parse_dosage("2.5ml").unwrap();
        assert_eq!(d.amount, 2.5);
        assert_eq!(d.unit, Some(DosageUnit::Ml));
    }

    #[test]
    fn parse_dosage_fraction() {
        let d = parse_dosage("1/2 tablet").unwrap();
        assert_eq!(d.amount, 0.5);
        assert_eq!(d.unit, Some(DosageUnit::Tablet));
    }

    #[test]
    fn parse_dosage_unicode_fraction() {
        let d = parse_dosage("\u{00bd} tablet").unwrap();
        assert_eq!(d.amount, 0.5);
        assert_eq!(d.unit, Some(DosageUnit::Tablet));
    }

    #[test]
    fn parse_dosage_rejects_non_positive() {
        assert!(parse_dosage("0").is_err());
        assert!(parse_dosage("-5ml").is_err());
        assert!(parse_dosage("0/2").is_err());
    }

    #[test]
    fn parse_dosage_rejects_text() {
        let err = parse_dosage("a spoonful").unwrap_err();
        assert_eq!(err.field(), Some("dosage"));
        assert!(parse_dosage("").is_err());
    }

    // -- tags / record -------------------------------------------------------

    #[test]
    fn parse_tags_is_a_set() {
        let tags = parse_tags("fever, night,fever,, ");
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("fever"));
        assert!(tags.contains("night"));
    }

    #[test]
    fn record_new_defaults() {
        let r = DoseRecord::new("ada", "  Tylenol ", 5.0, DosageUnit::Ml);
        assert_eq!(r.name, "Tylenol");
        assert_eq!(r.medicine_key(), "tylenol");
        assert!(r.active);
        assert!(!r.is_recurring);
        assert!(r.interval.is_none());
        assert!(!r.id.is_empty());
        assert_eq!(r.given_at, r.created_at);
    }

    #[test]
    fn record_serde_roundtrip() {
        let mut r = DoseRecord::new("ada", "Ibuprofen", 2.5, DosageUnit::Ml);
        r.interval = DoseInterval::from_parts(0, 6, 0);
        r.tags = parse_tags("fever");
        let json = serde_json::to_string(&r).unwrap();
        let back: DoseRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn record_without_active_deserializes_as_active() {
        let json = r#"{
            "id": "d1",
            "subject_id": "ada",
            "name": "Tylenol",
            "dosage": 5.0,
            "dosage_unit": "ml",
            "given_at": "2024-01-01T08:00:00Z",
            "created_at": "2024-01-01T08:00:00Z"
        }"#;
        let r: DoseRecord = serde_json::from_str(json).unwrap();
        assert!(r.active);
        assert!(r.interval.is_none());
    }
}
