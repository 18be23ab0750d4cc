//! Cosmetic formula calculator core.
//!
//! Ingredients are entered as percentages of a batch (in ounces) and
//! grouped into phases A/B/C. Everything shown to the user is derived from
//! a [`Workbench`]: per-ingredient weights, fragrance splits, phase totals,
//! the total-percent check and the water evaporation add-back. Named
//! formulas persist through a [`FormulaBook`].

pub mod convert;
pub mod error;
pub mod fragrance;
pub mod model;
pub mod percent;
pub mod phases;
pub mod store;
pub mod water;
pub mod workbench;

pub use convert::{GRAMS_PER_OZ, Weight, ingredient_weight};
pub use error::{StoreError, UnknownPhase, WorkbenchError};
pub use fragrance::{ScentAmount, SplitAllocation, allocate};
pub use model::{
    Formula, FragranceSplit, FragranceSplits, Ingredient, MAX_SCENTS, Phase, Scent, parse_decimal,
};
pub use percent::{PercentCheck, total_percent};
pub use phases::{PhaseTotals, phase_totals};
pub use store::{BACKUP_KEY, FileStore, FormulaBook, KeyValueStore, MemoryStore, STORAGE_KEY};
pub use water::WaterReading;
pub use workbench::{DEFAULT_BATCH_OZ, IngredientEdit, IngredientRow, SplitEdit, Workbench};
