/// Water-phase weights (grams) taken before and after heating.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WaterReading {
    pub before: f64,
    pub after: f64,
}

impl WaterReading {
    pub fn new(before: f64, after: f64) -> Self {
        Self { before, after }
    }

    /// Grams lost while heating; negative when the water gained weight.
    pub fn evaporated(&self) -> f64 {
        self.before - self.after
    }

    /// Grams to add back, only when something actually evaporated.
    pub fn add_back(&self) -> Option<f64> {
        let lost = self.evaporated();
        (lost > 0.0).then_some(lost)
    }
}

/* ===========================
Unit tests
=========================== */
