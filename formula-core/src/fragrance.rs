use crate::{
    convert::{Weight, ingredient_weight},
    model::{FragranceSplit, Ingredient},
};

/// How far the scent percentages may drift from 100 before a warning shows.
pub const SPLIT_TOLERANCE: f64 = 0.01;

/// One scent's share of a split fragrance.
#[derive(Clone, Debug, PartialEq)]
pub struct ScentAmount {
    /// Entered name, or `Scent N` when left blank.
    pub name: String,
    pub percent: f64,
    pub weight: Weight,
}

/// Per-scent amounts for a fragrance split across two or more scents.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitAllocation {
    pub scents: Vec<ScentAmount>,
    /// Sum of the scent percentages.
    pub total_percent: f64,
}

impl SplitAllocation {
    pub fn is_balanced(&self) -> bool {
        (self.total_percent - 100.0).abs() <= SPLIT_TOLERANCE
    }
}

/// Allocate a fragrance ingredient's weight across its scents.
///
/// Returns `None` unless the ingredient is a fragrance entry and the split
/// has at least two scents; callers then show the single aggregate amount.
pub fn allocate(
    ingredient: &Ingredient,
    split: &FragranceSplit,
    batch_oz: f64,
) -> Option<SplitAllocation> {
    if !ingredient.is_fragrance() || !split.is_split() {
        return None;
    }

    let base = ingredient.percent_value();
    let scents: Vec<ScentAmount> = split
        .active_scents()
        .iter()
        .enumerate()
        .map(|(i, scent)| {
            let percent = scent.percent_value();
            let name = if scent.name.is_empty() {
                format!("Scent {}", i + 1)
            } else {
                scent.name.clone()
            };
            ScentAmount {
                name,
                percent,
                weight: ingredient_weight(base * percent / 100.0, batch_oz),
            }
        })
        .collect();
    let total_percent = scents.iter().map(|s| s.percent).sum();

    Some(SplitAllocation {
        scents,
        total_percent,
    })
}

/* ===========================
Unit tests
=========================== */
