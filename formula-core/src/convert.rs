use std::{
    iter::Sum,
    ops::{Add, AddAssign},
};

/// Grams in one avoirdupois ounce, as used throughout the calculator.
pub const GRAMS_PER_OZ: f64 = 28.3495;

/// An amount expressed in both ounces and grams.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Weight {
    pub oz: f64,
    pub grams: f64,
}

impl Weight {
    pub fn from_oz(oz: f64) -> Self {
        Self {
            oz,
            grams: oz * GRAMS_PER_OZ,
        }
    }

    /// The pair as shown on an ingredient or scent row: ounces rounded to two
    /// decimals, grams converted from those rounded ounces.
    pub fn displayed(self) -> Self {
        Self::from_oz(round2(self.oz))
    }
}

impl Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Weight) -> Weight {
        Weight {
            oz: self.oz + rhs.oz,
            grams: self.grams + rhs.grams,
        }
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Weight) {
        self.oz += rhs.oz;
        self.grams += rhs.grams;
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Self {
        iter.fold(Weight::default(), Add::add)
    }
}

/// Weight of an ingredient making up `percent` of a `batch_oz` batch.
/// Full precision; round only for display.
pub fn ingredient_weight(percent: f64, batch_oz: f64) -> Weight {
    Weight::from_oz(percent / 100.0 * batch_oz)
}

/// Presentation rounding to two decimals.
#[inline]
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/* ===========================
Unit tests
=========================== */
