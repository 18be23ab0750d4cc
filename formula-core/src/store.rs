//! Saved-formula persistence.
//!
//! All formulas live in one JSON blob under [`STORAGE_KEY`], a mapping of
//! formula name to `{ingredients, fragranceSplits}`. The blob is read once
//! when the book is opened and rewritten whole on every save or delete.
//!
//! Entries that fail to parse are carried through rewrites untouched. A blob
//! that is not a JSON object at all is copied to [`BACKUP_KEY`] before the
//! first rewrite replaces it.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::PathBuf,
};

use serde::Deserialize;
use serde_json::Value;

use tracing::{debug, info, warn};

use crate::{error::StoreError, model::Formula, workbench::Workbench};

/// Key the formula mapping is stored under.
pub const STORAGE_KEY: &str = "savedFormulas";

/// Key an unreadable blob is copied to before it is overwritten.
pub const BACKUP_KEY: &str = "savedFormulas.corrupt";

/// String key-value storage, as offered by the host environment.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile store, mostly useful in tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(txt) => Ok(Some(txt)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// The collection of saved formulas, backed by a [`KeyValueStore`].
#[derive(Debug)]
pub struct FormulaBook<S> {
    store: S,
    formulas: BTreeMap<String, Formula>,
    /// Entries that did not parse as a formula, written back as they were.
    unreadable: BTreeMap<String, Value>,
    /// Raw blob that did not parse at all, pending backup.
    corrupt_blob: Option<String>,
}

impl<S: KeyValueStore> FormulaBook<S> {
    /// Read the saved mapping. A missing blob means no formulas. Bad entries
    /// are skipped with a warning; a blob that does not parse opens empty.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let mut book = Self {
            store,
            formulas: BTreeMap::new(),
            unreadable: BTreeMap::new(),
            corrupt_blob: None,
        };
        let Some(txt) = book.store.get(STORAGE_KEY)? else {
            debug!("no saved formulas yet");
            return Ok(book);
        };

        match serde_json::from_str::<BTreeMap<String, Value>>(&txt) {
            Ok(entries) => {
                for (name, value) in entries {
                    match Formula::deserialize(&value) {
                        Ok(formula) => {
                            book.formulas.insert(name, formula);
                        }
                        Err(error) => {
                            warn!(name, %error, "skipping unreadable saved formula");
                            book.unreadable.insert(name, value);
                        }
                    }
                }
            }
            Err(error) => {
                warn!(%error, backup = BACKUP_KEY, "saved formulas are unreadable, starting empty");
                book.corrupt_blob = Some(txt);
            }
        }
        debug!(
            count = book.formulas.len(),
            skipped = book.unreadable.len(),
            "opened formula book"
        );
        Ok(book)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formulas.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Formula> {
        self.formulas.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Store the workbench's formula under `name`, overwriting any previous
    /// entry. Blank names are ignored and return `false`.
    pub fn save(&mut self, name: &str, workbench: &Workbench) -> Result<bool, StoreError> {
        if name.trim().is_empty() {
            return Ok(false);
        }
        self.formulas.insert(name.to_string(), workbench.snapshot());
        self.unreadable.remove(name);
        self.persist()?;
        info!(name, "saved formula");
        Ok(true)
    }

    /// Replace the workbench's ingredients and splits with the saved
    /// formula. Unknown names leave the workbench untouched.
    pub fn load(&self, name: &str, workbench: &mut Workbench) -> bool {
        match self.formulas.get(name) {
            Some(formula) => {
                workbench.load(formula.clone());
                debug!(name, "loaded formula");
                true
            }
            None => false,
        }
    }

    /// Drop `name`, persist, and reset the workbench to a single blank row.
    /// Blank names are ignored. Returns whether an entry was removed.
    pub fn delete(&mut self, name: &str, workbench: &mut Workbench) -> Result<bool, StoreError> {
        if name.trim().is_empty() {
            return Ok(false);
        }
        let removed = self.formulas.remove(name).is_some() | self.unreadable.remove(name).is_some();
        self.persist()?;
        workbench.reset();
        info!(name, removed, "deleted formula");
        Ok(removed)
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        if let Some(blob) = &self.corrupt_blob {
            self.store.set(BACKUP_KEY, blob)?;
            warn!(key = BACKUP_KEY, "backed up unreadable saved formulas");
            self.corrupt_blob = None;
        }

        let mut entries = self.unreadable.clone();
        for (name, formula) in &self.formulas {
            entries.insert(name.clone(), serde_json::to_value(formula)?);
        }
        let blob = serde_json::to_string(&entries)?;
        self.store.set(STORAGE_KEY, &blob)
    }
}

/* ===========================
Unit tests
=========================== */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::Phase,
        workbench::{INITIAL_ID, IngredientEdit},
    };
    use pretty_assertions::assert_eq;

    fn glycerin() -> Workbench {
        let mut wb = Workbench::new();
        wb.edit(0, IngredientEdit::Name("Glycerin".into())).unwrap();
        wb.edit(0, IngredientEdit::Percent("100".into())).unwrap();
        wb.edit(0, IngredientEdit::Phase(Some(Phase::A))).unwrap();
        wb
    }

    #[test]
    fn test_open_empty_store() {
        let book = FormulaBook::open(MemoryStore::new()).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_corrupt_blob_opens_empty() {
        let mut store = MemoryStore::new();
        store.set(STORAGE_KEY, "{not json").unwrap();
        let book = FormulaBook::open(store).unwrap();
        assert!(book.is_empty());
        assert_eq!(
            book.store.get(STORAGE_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn test_corrupt_blob_is_backed_up_before_save() {
        let mut store = MemoryStore::new();
        store.set(STORAGE_KEY, "{not json").unwrap();
        let mut book = FormulaBook::open(store).unwrap();
        book.save("X", &glycerin()).unwrap();
        book.save("Y", &glycerin()).unwrap();

        assert_eq!(
            book.store.get(BACKUP_KEY).unwrap().as_deref(),
            Some("{not json")
        );
        let reopened = FormulaBook::open(book.store).unwrap();
        assert_eq!(reopened.names().collect::<Vec<_>>(), vec!["X", "Y"]);
    }

    #[test]
    fn test_bad_entry_survives_rewrites() {
        let blob = r#"{
            "Broken": {"ingredients": 5},
            "Good": {"ingredients": [{"name": "Shea", "percent": "100", "phase": "phaseB", "id": "initial"}]}
        }"#;
        let mut store = MemoryStore::new();
        store.set(STORAGE_KEY, blob).unwrap();
        let mut book = FormulaBook::open(store).unwrap();
        assert_eq!(book.names().collect::<Vec<_>>(), vec!["Good"]);

        let mut wb = glycerin();
        book.save("New", &wb).unwrap();
        assert!(book.delete("Good", &mut wb).unwrap());

        let saved: Value =
            serde_json::from_str(&book.store.get(STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved["Broken"], serde_json::json!({"ingredients": 5}));
        assert!(saved.get("Good").is_none());
        assert!(saved.get("New").is_some());
        assert!(book.store.get(BACKUP_KEY).unwrap().is_none());

        // Saving over a bad entry replaces it.
        book.save("Broken", &wb).unwrap();
        let reopened = FormulaBook::open(book.store).unwrap();
        assert_eq!(reopened.names().collect::<Vec<_>>(), vec!["Broken", "New"]);
    }

    #[test]
    fn test_delete_removes_bad_entry() {
        let mut store = MemoryStore::new();
        store
            .set(STORAGE_KEY, r#"{"Broken": {"ingredients": "oops"}}"#)
            .unwrap();
        let mut book = FormulaBook::open(store).unwrap();
        let mut wb = glycerin();
        assert!(book.delete("Broken", &mut wb).unwrap());
        assert_eq!(book.store.get(STORAGE_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut book = FormulaBook::open(MemoryStore::new()).unwrap();
        let wb = glycerin();
        assert!(book.save("X", &wb).unwrap());

        let mut other = Workbench::new();
        assert!(book.load("X", &mut other));
        assert_eq!(other.snapshot(), wb.snapshot());
        assert!(!book.load("missing", &mut other));
    }

    #[test]
    fn test_blank_name_is_ignored() {
        let mut book = FormulaBook::open(MemoryStore::new()).unwrap();
        let mut wb = glycerin();
        assert!(!book.save("  ", &wb).unwrap());
        assert!(!book.delete("", &mut wb).unwrap());
        assert!(book.is_empty());
        assert_eq!(wb.ingredients()[0].name, "Glycerin");
        assert!(book.store.get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_delete_persists_and_resets() {
        let mut book = FormulaBook::open(MemoryStore::new()).unwrap();
        let mut wb = glycerin();
        book.save("X", &wb).unwrap();
        book.save("Y", &wb).unwrap();

        assert!(book.delete("X", &mut wb).unwrap());
        assert_eq!(book.names().collect::<Vec<_>>(), vec!["Y"]);
        assert_eq!(wb.ingredients().len(), 1);
        assert_eq!(wb.ingredients()[0].id, INITIAL_ID);
        assert!(wb.ingredients()[0].name.is_empty());

        let reopened = FormulaBook::open(book.store).unwrap();
        assert!(reopened.get("X").is_none());
        assert!(reopened.get("Y").is_some());
    }

    #[test]
    fn test_reads_legacy_blob() {
        let blob = r#"{
            "Body Butter": {
                "ingredients": [
                    {"name": "Shea", "percent": "60", "phase": "phaseB", "id": "initial"},
                    {"name": "Fragrance", "percent": "2", "phase": "phaseC", "id": "1712"}
                ],
                "fragranceSplits": {"1": {"count": 2, "scent1": "50", "scent2": "50", "scent3": "", "name1": "Rose"}}
            },
            "Half Saved": {}
        }"#;
        let mut store = MemoryStore::new();
        store.set(STORAGE_KEY, blob).unwrap();
        let book = FormulaBook::open(store).unwrap();

        let formula = book.get("Body Butter").unwrap();
        assert_eq!(formula.ingredients[1].phase, Some(Phase::C));
        let split = &formula.fragrance_splits[&1];
        assert_eq!(split.count(), 2);
        assert_eq!(split.scent(0).unwrap().name, "Rose");
        assert_eq!(split.scent(1).unwrap().name, "");

        let mut wb = glycerin();
        assert!(book.load("Half Saved", &mut wb));
        assert!(wb.ingredients().is_empty());
    }
}
