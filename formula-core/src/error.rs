use thiserror::Error;

/// A phase name that is not A, B or C.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown phase '{0}' (expected A, B or C)")]
pub struct UnknownPhase(pub String);

/// Rejected edits to the ingredient list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkbenchError {
    #[error("no ingredient at index {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("the only remaining ingredient cannot be removed")]
    SoleIngredient,

    #[error("scent slot {slot} is out of range (max {max})")]
    ScentSlotOutOfRange { slot: usize, max: usize },
}

/// Failures reading or writing the formula store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode formulas: {0}")]
    Json(#[from] serde_json::Error),
}
