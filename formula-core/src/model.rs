use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::UnknownPhase;

/// Maximum number of scents a single fragrance entry can be split into.
pub const MAX_SCENTS: usize = 3;

/// Manufacturing phase an ingredient is added in.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    #[serde(rename = "phaseA")]
    A,
    #[serde(rename = "phaseB")]
    B,
    #[serde(rename = "phaseC")]
    C,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    /// Human label, e.g. `Phase A`.
    pub fn label(self) -> &'static str {
        match self {
            Phase::A => "Phase A",
            Phase::B => "Phase B",
            Phase::C => "Phase C",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts `a`, `phaseA`, `Phase A` in any case.
impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let letter = lower.strip_prefix("phase").unwrap_or(&lower).trim();
        match letter {
            "a" => Ok(Phase::A),
            "b" => Ok(Phase::B),
            "c" => Ok(Phase::C),
            _ => Err(UnknownPhase(s.to_string())),
        }
    }
}

/// Parse a number the way a form field would: leading numeric prefix wins,
/// anything unparseable (empty, garbage, non-finite) counts as zero.
pub fn parse_decimal(raw: &str) -> f64 {
    let s = raw.trim();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let mut seen_dot = false;
    let mut seen_digit = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// One row of a formula.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    #[serde(default)]
    pub name: String,
    /// Percent exactly as entered; see [`Ingredient::percent_value`].
    #[serde(default)]
    pub percent: String,
    /// `None` for unknown or missing phases; such rows belong to no bucket.
    #[serde(default, deserialize_with = "lenient_phase")]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub id: String,
}

impl Ingredient {
    pub fn blank(id: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            percent: String::new(),
            phase: Some(Phase::A),
            id: id.into(),
        }
    }

    pub fn percent_value(&self) -> f64 {
        parse_decimal(&self.percent)
    }

    pub fn is_fragrance(&self) -> bool {
        self.name.to_lowercase().contains("fragrance")
    }

    /// Both name and percent hold something other than whitespace.
    pub fn is_filled(&self) -> bool {
        !self.name.trim().is_empty() && !self.percent.trim().is_empty()
    }
}

fn lenient_phase<'de, D>(deserializer: D) -> Result<Option<Phase>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// A named scent and its share of the parent fragrance, in percent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scent {
    pub name: String,
    pub percent: String,
}

impl Scent {
    pub fn percent_value(&self) -> f64 {
        parse_decimal(&self.percent)
    }
}

/// Subdivision of one fragrance ingredient into up to [`MAX_SCENTS`] scents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSplit", into = "RawSplit")]
pub struct FragranceSplit {
    count: u8,
    scents: [Scent; MAX_SCENTS],
}

impl Default for FragranceSplit {
    fn default() -> Self {
        Self {
            count: 1,
            scents: Default::default(),
        }
    }
}

impl FragranceSplit {
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Clamped to `1..=MAX_SCENTS`.
    pub fn set_count(&mut self, count: u8) {
        self.count = count.clamp(1, MAX_SCENTS as u8);
    }

    pub fn scent(&self, slot: usize) -> Option<&Scent> {
        self.scents.get(slot)
    }

    pub fn scent_mut(&mut self, slot: usize) -> Option<&mut Scent> {
        self.scents.get_mut(slot)
    }

    /// The first `count` scents.
    pub fn active_scents(&self) -> &[Scent] {
        &self.scents[..self.count as usize]
    }

    pub fn is_split(&self) -> bool {
        self.count >= 2
    }
}

/// Flat layout used in the persisted blob: `count`, `scent1..3`, `name1..3`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct RawSplit {
    count: u8,
    scent1: String,
    scent2: String,
    scent3: String,
    name1: String,
    name2: String,
    name3: String,
}

impl Default for RawSplit {
    fn default() -> Self {
        Self {
            count: 1,
            scent1: String::new(),
            scent2: String::new(),
            scent3: String::new(),
            name1: String::new(),
            name2: String::new(),
            name3: String::new(),
        }
    }
}

impl From<RawSplit> for FragranceSplit {
    fn from(raw: RawSplit) -> Self {
        let mut split = FragranceSplit {
            count: 1,
            scents: [
                Scent {
                    name: raw.name1,
                    percent: raw.scent1,
                },
                Scent {
                    name: raw.name2,
                    percent: raw.scent2,
                },
                Scent {
                    name: raw.name3,
                    percent: raw.scent3,
                },
            ],
        };
        split.set_count(raw.count);
        split
    }
}

impl From<FragranceSplit> for RawSplit {
    fn from(split: FragranceSplit) -> Self {
        let [s1, s2, s3] = split.scents;
        RawSplit {
            count: split.count,
            scent1: s1.percent,
            scent2: s2.percent,
            scent3: s3.percent,
            name1: s1.name,
            name2: s2.name,
            name3: s3.name,
        }
    }
}

/// Splits keyed by the index of the ingredient they belong to.
pub type FragranceSplits = BTreeMap<usize, FragranceSplit>;

/// A saved formula: the ingredient list plus its fragrance splits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, rename = "fragranceSplits")]
    pub fragrance_splits: FragranceSplits,
}

/* ===========================
Unit tests
=========================== */
