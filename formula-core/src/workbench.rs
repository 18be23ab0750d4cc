use tracing::debug;

use crate::{
    convert::{Weight, ingredient_weight},
    error::WorkbenchError,
    fragrance::{SplitAllocation, allocate},
    model::{FragranceSplit, FragranceSplits, Formula, Ingredient, MAX_SCENTS, Phase},
    percent::{PercentCheck, total_percent},
    phases::{PhaseTotals, phase_totals},
    water::WaterReading,
};

/// Batch size a fresh workbench starts with, in ounces.
pub const DEFAULT_BATCH_OZ: f64 = 100.0;

/// Id of the row every empty workbench starts with.
pub const INITIAL_ID: &str = "initial";

/// A single field edit on an ingredient row.
#[derive(Clone, Debug, PartialEq)]
pub enum IngredientEdit {
    Name(String),
    Percent(String),
    Phase(Option<Phase>),
}

/// A single field edit on a fragrance split. Scent slots are zero-based.
#[derive(Clone, Debug, PartialEq)]
pub enum SplitEdit {
    Count(u8),
    ScentName(usize, String),
    ScentPercent(usize, String),
}

/// Derived view of one ingredient row.
#[derive(Clone, Debug, PartialEq)]
pub struct IngredientRow<'a> {
    pub index: usize,
    pub ingredient: &'a Ingredient,
    pub weight: Weight,
    /// Present when the row is a fragrance split into two or more scents.
    pub split: Option<SplitAllocation>,
}

/// In-memory state of the calculator: the formula being edited plus the
/// scalar inputs every derived view is computed from.
#[derive(Clone, Debug)]
pub struct Workbench {
    ingredients: Vec<Ingredient>,
    splits: FragranceSplits,
    batch_oz: f64,
    water: WaterReading,
    percent_check: PercentCheck,
    next_id: u64,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbench {
    pub fn new() -> Self {
        Self {
            ingredients: vec![Ingredient::blank(INITIAL_ID)],
            splits: FragranceSplits::new(),
            batch_oz: DEFAULT_BATCH_OZ,
            water: WaterReading::default(),
            percent_check: PercentCheck::default(),
            next_id: 1,
        }
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn splits(&self) -> &FragranceSplits {
        &self.splits
    }

    pub fn split(&self, index: usize) -> Option<&FragranceSplit> {
        self.splits.get(&index)
    }

    pub fn batch_oz(&self) -> f64 {
        self.batch_oz
    }

    pub fn set_batch_oz(&mut self, oz: f64) {
        self.batch_oz = if oz.is_finite() { oz } else { 0.0 };
    }

    pub fn water(&self) -> WaterReading {
        self.water
    }

    pub fn set_water_before(&mut self, grams: f64) {
        self.water.before = grams;
    }

    pub fn set_water_after(&mut self, grams: f64) {
        self.water.after = grams;
    }

    pub fn percent_check(&self) -> PercentCheck {
        self.percent_check
    }

    pub fn set_percent_check(&mut self, check: PercentCheck) {
        self.percent_check = check;
    }

    /// Append a blank row, unless the last row is still missing its name or
    /// percent. Returns whether a row was added.
    pub fn add_ingredient(&mut self) -> bool {
        if let Some(last) = self.ingredients.last() {
            if !last.is_filled() {
                debug!(index = self.ingredients.len() - 1, "last ingredient incomplete, not adding");
                return false;
            }
        }
        let id = self.fresh_id();
        self.ingredients.push(Ingredient::blank(id));
        true
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Result<Ingredient, WorkbenchError> {
        self.check_index(index)?;
        if self.ingredients.len() == 1 {
            return Err(WorkbenchError::SoleIngredient);
        }

        let removed = self.ingredients.remove(index);
        self.splits = std::mem::take(&mut self.splits)
            .into_iter()
            .filter(|(k, _)| *k != index)
            .map(|(k, v)| if k > index { (k - 1, v) } else { (k, v) })
            .collect();
        debug!(index, name = %removed.name, "removed ingredient");
        Ok(removed)
    }

    pub fn edit(&mut self, index: usize, edit: IngredientEdit) -> Result<(), WorkbenchError> {
        self.check_index(index)?;
        let ing = &mut self.ingredients[index];
        match edit {
            IngredientEdit::Name(name) => {
                ing.name = name;
                if ing.is_fragrance() && !self.splits.contains_key(&index) {
                    debug!(index, "fragrance entry, starting a one-scent split");
                    self.splits.insert(index, FragranceSplit::default());
                }
            }
            IngredientEdit::Percent(percent) => ing.percent = percent,
            IngredientEdit::Phase(phase) => ing.phase = phase,
        }
        Ok(())
    }

    /// Edit the split attached to `index`, creating it if needed.
    pub fn edit_split(&mut self, index: usize, edit: SplitEdit) -> Result<(), WorkbenchError> {
        self.check_index(index)?;
        let slot = match &edit {
            SplitEdit::Count(_) => None,
            SplitEdit::ScentName(slot, _) | SplitEdit::ScentPercent(slot, _) => Some(*slot),
        };
        if let Some(slot) = slot.filter(|s| *s >= MAX_SCENTS) {
            return Err(WorkbenchError::ScentSlotOutOfRange {
                slot,
                max: MAX_SCENTS,
            });
        }

        let split = self.splits.entry(index).or_default();
        match edit {
            SplitEdit::Count(count) => split.set_count(count),
            SplitEdit::ScentName(slot, name) => {
                if let Some(scent) = split.scent_mut(slot) {
                    scent.name = name;
                }
            }
            SplitEdit::ScentPercent(slot, percent) => {
                if let Some(scent) = split.scent_mut(slot) {
                    scent.percent = percent;
                }
            }
        }
        Ok(())
    }

    /// Move the row at `from` to position `to`; every other row keeps its
    /// relative order and splits travel with their ingredient.
    pub fn move_ingredient(&mut self, from: usize, to: usize) -> Result<(), WorkbenchError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let moved = self.ingredients.remove(from);
        self.ingredients.insert(to, moved);
        self.splits = std::mem::take(&mut self.splits)
            .into_iter()
            .map(|(k, v)| (shifted_index(k, from, to), v))
            .collect();
        debug!(from, to, "moved ingredient");
        Ok(())
    }

    pub fn total_percent(&self) -> f64 {
        total_percent(&self.ingredients)
    }

    pub fn is_percent_balanced(&self) -> bool {
        self.percent_check.is_balanced(self.total_percent())
    }

    pub fn phase_totals(&self) -> PhaseTotals {
        phase_totals(&self.ingredients, self.batch_oz)
    }

    pub fn rows(&self) -> Vec<IngredientRow<'_>> {
        self.ingredients
            .iter()
            .enumerate()
            .map(|(index, ingredient)| IngredientRow {
                index,
                ingredient,
                weight: ingredient_weight(ingredient.percent_value(), self.batch_oz),
                split: self
                    .splits
                    .get(&index)
                    .and_then(|split| allocate(ingredient, split, self.batch_oz)),
            })
            .collect()
    }

    /// Copy of the persisted part of the state.
    pub fn snapshot(&self) -> Formula {
        Formula {
            ingredients: self.ingredients.clone(),
            fragrance_splits: self.splits.clone(),
        }
    }

    /// Replace ingredients and splits wholesale. Scalar inputs are kept.
    pub fn load(&mut self, formula: Formula) {
        self.ingredients = formula.ingredients;
        self.splits = formula.fragrance_splits;
    }

    /// Back to a single blank row with no splits. Scalar inputs are kept.
    pub fn reset(&mut self) {
        self.ingredients = vec![Ingredient::blank(INITIAL_ID)];
        self.splits.clear();
    }

    fn check_index(&self, index: usize) -> Result<(), WorkbenchError> {
        if index < self.ingredients.len() {
            Ok(())
        } else {
            Err(WorkbenchError::IndexOutOfRange {
                index,
                len: self.ingredients.len(),
            })
        }
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id = format!("ing-{}", self.next_id);
            self.next_id += 1;
            if !self.ingredients.iter().any(|i| i.id == id) {
                return id;
            }
        }
    }
}

/// Where the row formerly at `index` sits after moving `from` to `to`.
fn shifted_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if to < from && index >= to && index < from {
        index + 1
    } else {
        index
    }
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::round2;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn fill(wb: &mut Workbench, index: usize, name: &str, percent: &str, phase: Phase) {
        wb.edit(index, IngredientEdit::Name(name.into())).unwrap();
        wb.edit(index, IngredientEdit::Percent(percent.into())).unwrap();
        wb.edit(index, IngredientEdit::Phase(Some(phase))).unwrap();
    }

    fn names(wb: &Workbench) -> Vec<&str> {
        wb.ingredients().iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_new_workbench_has_one_blank_row() {
        let wb = Workbench::new();
        assert_eq!(wb.ingredients(), &[Ingredient::blank(INITIAL_ID)]);
        assert!(wb.splits().is_empty());
        assert_eq!(wb.batch_oz(), DEFAULT_BATCH_OZ);
    }

    #[test]
    fn test_add_requires_filled_last_row() {
        let mut wb = Workbench::new();
        assert!(!wb.add_ingredient());

        wb.edit(0, IngredientEdit::Name("Glycerin".into())).unwrap();
        assert!(!wb.add_ingredient());

        wb.edit(0, IngredientEdit::Percent("   ".into())).unwrap();
        assert!(!wb.add_ingredient());

        wb.edit(0, IngredientEdit::Percent("5".into())).unwrap();
        assert!(wb.add_ingredient());
        assert_eq!(wb.ingredients().len(), 2);
        assert_eq!(wb.ingredients()[1].phase, Some(Phase::A));
        assert_ne!(wb.ingredients()[1].id, wb.ingredients()[0].id);

        // new row is blank, so a further add is refused
        assert!(!wb.add_ingredient());
    }

    #[test]
    fn test_add_to_empty_list() {
        let mut wb = Workbench::new();
        wb.load(Formula::default());
        assert!(wb.add_ingredient());
        assert_eq!(wb.ingredients().len(), 1);
    }

    #[test]
    fn test_sole_row_cannot_be_removed() {
        let mut wb = Workbench::new();
        assert_eq!(wb.remove_ingredient(0), Err(WorkbenchError::SoleIngredient));
        assert_eq!(
            wb.remove_ingredient(3),
            Err(WorkbenchError::IndexOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_remove_keeps_splits_with_their_rows() {
        let mut wb = Workbench::new();
        fill(&mut wb, 0, "Water", "80", Phase::A);
        wb.add_ingredient();
        fill(&mut wb, 1, "Fragrance Oil", "20", Phase::C);
        assert!(wb.split(1).is_some());

        let removed = wb.remove_ingredient(0).unwrap();
        assert_eq!(removed.name, "Water");
        assert_eq!(names(&wb), vec!["Fragrance Oil"]);
        assert!(wb.split(0).is_some());
        assert!(wb.split(1).is_none());
    }

    #[test]
    fn test_fragrance_name_starts_split_once() {
        let mut wb = Workbench::new();
        wb.edit(0, IngredientEdit::Name("Fragrance".into())).unwrap();
        assert_eq!(wb.split(0).unwrap().count(), 1);

        wb.edit_split(0, SplitEdit::Count(3)).unwrap();
        wb.edit(0, IngredientEdit::Name("fragrance blend".into())).unwrap();
        assert_eq!(wb.split(0).unwrap().count(), 3);
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut wb = Workbench::new();
        assert!(wb.edit(1, IngredientEdit::Percent("1".into())).is_err());
        assert_eq!(
            wb.edit_split(0, SplitEdit::ScentName(3, "x".into())),
            Err(WorkbenchError::ScentSlotOutOfRange { slot: 3, max: 3 })
        );
    }

    #[test]
    fn test_move_is_stable_for_others() {
        let mut wb = Workbench::new();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            if i > 0 {
                assert!(wb.add_ingredient());
            }
            fill(&mut wb, i, name, "25", Phase::A);
        }
        wb.edit(1, IngredientEdit::Name("b fragrance".into())).unwrap();

        wb.move_ingredient(0, 2).unwrap();
        assert_eq!(names(&wb), vec!["b fragrance", "c", "a", "d"]);
        assert!(wb.split(0).is_some());

        wb.move_ingredient(3, 0).unwrap();
        assert_eq!(names(&wb), vec!["d", "b fragrance", "c", "a"]);
        assert!(wb.split(1).is_some());
        assert_eq!(wb.splits().len(), 1);

        assert!(wb.move_ingredient(0, 4).is_err());
    }

    #[test]
    fn test_rows_carry_split_allocation() {
        let mut wb = Workbench::new();
        fill(&mut wb, 0, "Fragrance Oil", "100", Phase::C);
        wb.edit_split(0, SplitEdit::Count(2)).unwrap();
        wb.edit_split(0, SplitEdit::ScentName(0, "Lavender".into())).unwrap();
        wb.edit_split(0, SplitEdit::ScentPercent(0, "50".into())).unwrap();
        wb.edit_split(0, SplitEdit::ScentName(1, "Vanilla".into())).unwrap();
        wb.edit_split(0, SplitEdit::ScentPercent(1, "50".into())).unwrap();

        let rows = wb.rows();
        let split = rows[0].split.as_ref().unwrap();
        assert_eq!(split.scents[1].name, "Vanilla");
        assert_relative_eq!(split.scents[1].weight.oz, 50.0, epsilon = 1e-9);

        // back to one scent: aggregate amount only
        wb.edit_split(0, SplitEdit::Count(1)).unwrap();
        assert!(wb.rows()[0].split.is_none());
    }

    #[test]
    fn test_derived_totals() {
        let mut wb = Workbench::new();
        fill(&mut wb, 0, "Distilled Water", "75", Phase::A);
        wb.add_ingredient();
        fill(&mut wb, 1, "Shea Butter", "25", Phase::B);

        assert!(wb.is_percent_balanced());
        let totals = wb.phase_totals();
        assert_relative_eq!(round2(totals.total().grams), 2834.95, epsilon = 1e-9);

        wb.edit(1, IngredientEdit::Percent("5".into())).unwrap();
        assert!(!wb.is_percent_balanced());
        wb.set_percent_check(PercentCheck::Tolerance(25.0));
        assert!(wb.is_percent_balanced());
    }

    #[test]
    fn test_non_numeric_batch_is_zero() {
        let mut wb = Workbench::new();
        wb.set_batch_oz(f64::NAN);
        assert_eq!(wb.batch_oz(), 0.0);
    }

    #[test]
    fn test_reset_and_load() {
        let mut wb = Workbench::new();
        fill(&mut wb, 0, "Fragrance", "3", Phase::C);
        let saved = wb.snapshot();

        wb.reset();
        assert_eq!(wb.ingredients(), &[Ingredient::blank(INITIAL_ID)]);
        assert!(wb.splits().is_empty());

        wb.load(saved.clone());
        assert_eq!(wb.snapshot(), saved);
    }

    #[test]
    fn test_shifted_index() {
        assert_eq!(shifted_index(0, 0, 2), 2);
        assert_eq!(shifted_index(1, 0, 2), 0);
        assert_eq!(shifted_index(3, 0, 2), 3);
        assert_eq!(shifted_index(3, 3, 1), 1);
        assert_eq!(shifted_index(1, 3, 1), 2);
        assert_eq!(shifted_index(0, 3, 1), 0);
    }
}
