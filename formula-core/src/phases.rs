use crate::{
    convert::{Weight, ingredient_weight},
    model::{Ingredient, Phase},
};

/// Weight per phase for a whole formula.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhaseTotals {
    buckets: [Weight; 3],
}

impl PhaseTotals {
    pub fn get(&self, phase: Phase) -> Weight {
        self.buckets[phase.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, Weight)> + '_ {
        Phase::ALL.into_iter().map(|p| (p, self.get(p)))
    }

    /// Grand total across all three phases.
    pub fn total(&self) -> Weight {
        self.buckets.iter().copied().sum()
    }
}

/// Bucket ingredient weights by phase. Rows without a known phase are
/// left out of every bucket, and therefore out of the grand total.
pub fn phase_totals(ingredients: &[Ingredient], batch_oz: f64) -> PhaseTotals {
    let mut totals = PhaseTotals::default();
    for ing in ingredients {
        if let Some(phase) = ing.phase {
            totals.buckets[phase.index()] += ingredient_weight(ing.percent_value(), batch_oz);
        }
    }
    totals
}

/* ===========================
Unit tests
=========================== */
