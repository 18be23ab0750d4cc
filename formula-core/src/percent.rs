use crate::model::Ingredient;

/// Sum of all ingredient percentages, unrounded.
pub fn total_percent(ingredients: &[Ingredient]) -> f64 {
    ingredients.iter().map(Ingredient::percent_value).sum()
}

/// Rule for deciding whether a formula's percentages add up.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum PercentCheck {
    /// The unrounded sum must equal exactly 100. A total that displays as
    /// `100.00%` can still fail this check.
    #[default]
    Strict,
    /// The sum may sit within the given distance of 100.
    Tolerance(f64),
}

impl PercentCheck {
    /// `Strict` for a tolerance of zero, `Tolerance` otherwise.
    pub fn with_tolerance(tolerance: f64) -> Self {
        if tolerance > 0.0 {
            PercentCheck::Tolerance(tolerance)
        } else {
            PercentCheck::Strict
        }
    }

    pub fn is_balanced(self, total: f64) -> bool {
        match self {
            PercentCheck::Strict => total == 100.0,
            PercentCheck::Tolerance(eps) => (total - 100.0).abs() <= eps,
        }
    }
}

/* ===========================
Unit tests
=========================== */
