// ButtonStore - catalogue des boutons protégé par un mutex, écrit à chaque mutation

use crate::paths::PathResolver;
use crate::store::StoreError;
use crate::store::button::{MISSING_FILES_GROUP, SoundButton};
use crate::store::persistence::{decode, encode, write_document};
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Concurrency-safe, write-through store of sound buttons
///
/// Every operation takes the same lock for its whole duration, including the
/// document write, so callers on different threads observe the operations in
/// a single sequential order.
///
/// The store does not keep the per-group order contiguous on its own; see
/// [`crate::store::ordering`] for the flows that do.
pub struct ButtonStore {
    document: PathBuf,
    resolver: PathResolver,
    buttons: Mutex<Vec<SoundButton>>,
}

impl ButtonStore {
    /// Open the document at `document`, creating an empty one if absent
    ///
    /// An unreadable or unparsable document yields an empty collection; the
    /// broken file is left untouched until the next mutation overwrites it.
    /// Buttons whose audio file is missing are moved to
    /// [`MISSING_FILES_GROUP`].
    pub fn open(document: impl Into<PathBuf>, resolver: PathResolver) -> Result<Self, StoreError> {
        let document = document.into();

        let buttons = if document.exists() {
            Self::load(&document, &resolver)
        } else {
            info!("Creating button document at {}", document.display());
            write_document(&document, &encode(&[])?)?;
            Vec::new()
        };

        Ok(Self {
            document,
            resolver,
            buttons: Mutex::new(buttons),
        })
    }

    fn load(document: &Path, resolver: &PathResolver) -> Vec<SoundButton> {
        let parsed = std::fs::read(document)
            .map_err(StoreError::from)
            .and_then(|bytes| decode(&bytes));

        let mut buttons = match parsed {
            Ok(buttons) => buttons,
            Err(e) => {
                warn!(
                    "Could not load {}, starting with an empty soundboard: {}",
                    document.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut missing = 0;
        for button in buttons
            .iter_mut()
            .filter(|b| !b.file_path.is_empty() && !resolver.file_exists(&b.file_path))
        {
            button.group = MISSING_FILES_GROUP.to_string();
            missing += 1;
        }

        info!(
            "Loaded {} buttons from {} ({} with missing files)",
            buttons.len(),
            document.display(),
            missing
        );
        buttons
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SoundButton>> {
        self.buttons.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, buttons: &[SoundButton]) -> Result<(), StoreError> {
        write_document(&self.document, &encode(buttons)?)
    }

    pub fn document_path(&self) -> &Path {
        &self.document
    }

    /// Snapshot of every button in insertion order
    pub fn get_all(&self) -> Vec<SoundButton> {
        self.lock().clone()
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<SoundButton> {
        self.lock().iter().find(|b| b.id == id).cloned()
    }

    /// Append `button` under a freshly generated id and persist
    pub fn add(&self, button: SoundButton) -> Result<SoundButton, StoreError> {
        let mut buttons = self.lock();

        let mut button = button;
        let supplied_id = button.id;
        let mut id = Uuid::new_v4();
        while id == supplied_id || buttons.iter().any(|b| b.id == id) {
            id = Uuid::new_v4();
        }
        button.id = id;

        buttons.push(button.clone());
        self.persist(&buttons)?;
        Ok(button)
    }

    /// Overwrite label, path, group and order of `id`
    ///
    /// Returns `Ok(false)` without touching anything when `id` is unknown.
    pub fn update(&self, id: Uuid, values: &SoundButton) -> Result<bool, StoreError> {
        let mut buttons = self.lock();

        let Some(button) = buttons.iter_mut().find(|b| b.id == id) else {
            return Ok(false);
        };
        button.apply(values);

        self.persist(&buttons)?;
        Ok(true)
    }

    /// Rewrite the `order` of existing records in one locked step
    ///
    /// `assign` works on a copy of the collection and returns the ids it
    /// renumbered. Only their `order` is copied back; label, path and group
    /// always keep the stored value. Returns how many records changed.
    pub fn reorder(
        &self,
        assign: impl FnOnce(&mut [SoundButton]) -> Vec<Uuid>,
    ) -> Result<usize, StoreError> {
        let mut buttons = self.lock();

        let mut working = buttons.clone();
        let changed = assign(&mut working);

        let mut written = 0;
        for id in &changed {
            let Some(order) = working.iter().find(|b| b.id == *id).map(|b| b.order) else {
                continue;
            };
            if let Some(button) = buttons.iter_mut().find(|b| b.id == *id) {
                if button.order != order {
                    button.order = order;
                    written += 1;
                }
            }
        }

        if written > 0 {
            self.persist(&buttons)?;
        }
        Ok(written)
    }

    pub fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut buttons = self.lock();

        let Some(index) = buttons.iter().position(|b| b.id == id) else {
            return Ok(false);
        };
        buttons.remove(index);

        self.persist(&buttons)?;
        Ok(true)
    }

    /// Distinct non-blank group names, sorted
    pub fn list_groups(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|b| !b.group.trim().is_empty())
            .map(|b| b.group.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether a button other than `excluding` already points at `file_path`
    pub fn contains_file_path(&self, file_path: &str, excluding: Option<Uuid>) -> bool {
        let target = self.resolver.resolve(file_path);
        self.lock()
            .iter()
            .filter(|b| Some(b.id) != excluding)
            .any(|b| self.resolver.resolve(&b.file_path) == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_GROUP;
    use tempfile::{TempDir, tempdir};

    fn open_store(dir: &TempDir) -> ButtonStore {
        ButtonStore::open(
            dir.path().join("soundboard_data.json"),
            PathResolver::new(dir.path()),
        )
        .unwrap()
    }

    #[test]
    fn test_open_creates_document() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        assert!(store.document_path().exists());
        assert!(store.get_all().is_empty());
        assert_eq!(std::fs::read_to_string(store.document_path()).unwrap(), "[]");
    }

    #[test]
    fn test_add_then_delete() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let created = store
            .add(SoundButton::new("Horn", "horn.wav", DEFAULT_GROUP, 0))
            .unwrap();

        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, created.id);
        assert_eq!(all[0].label, "Horn");
        assert_eq!(all[0].file_path, "horn.wav");
        assert_eq!(all[0].group, DEFAULT_GROUP);
        assert_eq!(all[0].order, 0);

        assert!(store.delete(created.id).unwrap());
        assert!(store.get_all().is_empty());
        assert!(!store.delete(created.id).unwrap());
    }

    #[test]
    fn test_add_replaces_supplied_id() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let first = store.add(SoundButton::default()).unwrap();
        let mut draft = SoundButton::new("Copy", "copy.wav", DEFAULT_GROUP, 1);
        draft.id = first.id;

        let second = store.add(draft.clone()).unwrap();
        assert_ne!(second.id, draft.id);
        assert_ne!(second.id, first.id);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        store
            .add(SoundButton::new("Horn", "horn.wav", DEFAULT_GROUP, 0))
            .unwrap();
        let before = store.get_all();
        let on_disk = std::fs::read(store.document_path()).unwrap();

        let updated = store
            .update(Uuid::new_v4(), &SoundButton::new("X", "x.wav", "X", 9))
            .unwrap();

        assert!(!updated);
        assert_eq!(store.get_all(), before);
        assert_eq!(std::fs::read(store.document_path()).unwrap(), on_disk);
    }

    #[test]
    fn test_update_overwrites_fields() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let created = store
            .add(SoundButton::new("Horn", "horn.wav", DEFAULT_GROUP, 0))
            .unwrap();

        let values = SoundButton::new("Airhorn", "airhorn.wav", "Effects", 4);
        assert!(store.update(created.id, &values).unwrap());

        let stored = store.get_by_id(created.id).unwrap();
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.label, "Airhorn");
        assert_eq!(stored.group, "Effects");
        assert_eq!(stored.order, 4);
    }

    #[test]
    fn test_reorder_only_touches_order() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let horn = store
            .add(SoundButton::new("Horn", "horn.wav", "Effects", 3))
            .unwrap();

        let written = store
            .reorder(|buttons| {
                buttons[0].order = 0;
                buttons[0].label = "Ignored".to_string();
                buttons[0].group = "Elsewhere".to_string();
                vec![buttons[0].id]
            })
            .unwrap();

        assert_eq!(written, 1);
        let stored = store.get_by_id(horn.id).unwrap();
        assert_eq!(stored.order, 0);
        assert_eq!(stored.label, "Horn");
        assert_eq!(stored.group, "Effects");

        // Nothing to change, nothing written
        assert_eq!(store.reorder(|_| Vec::new()).unwrap(), 0);
    }

    #[test]
    fn test_snapshot_does_not_alias() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        store
            .add(SoundButton::new("Horn", "horn.wav", DEFAULT_GROUP, 0))
            .unwrap();

        let mut snapshot = store.get_all();
        snapshot[0].label = "Changed".to_string();
        snapshot.clear();

        assert_eq!(store.get_all()[0].label, "Horn");
    }

    #[test]
    fn test_list_groups_sorted_distinct() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        for group in ["Music", "Effects", "Music", "  ", "Ambience"] {
            store.add(SoundButton::new("b", "", group, 0)).unwrap();
        }

        assert_eq!(store.list_groups(), vec!["Ambience", "Effects", "Music"]);
    }

    #[test]
    fn test_reload_marks_missing_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("present.wav"), b"RIFF").unwrap();

        let (present, missing) = {
            let store = open_store(&dir);
            let present = store
                .add(SoundButton::new("Present", "present.wav", "Effects", 0))
                .unwrap();
            let missing = store
                .add(SoundButton::new("Missing", "gone.wav", "Effects", 1))
                .unwrap();
            (present, missing)
        };

        let reloaded = open_store(&dir);
        assert_eq!(reloaded.get_by_id(present.id).unwrap(), present);

        let reloaded_missing = reloaded.get_by_id(missing.id).unwrap();
        assert_eq!(reloaded_missing.group, MISSING_FILES_GROUP);
        assert_eq!(reloaded_missing.label, missing.label);
        assert_eq!(reloaded_missing.order, missing.order);
    }

    #[test]
    fn test_corrupt_document_falls_back_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("soundboard_data.json");
        std::fs::write(&path, b"{{{ definitely not json").unwrap();

        let store = ButtonStore::open(&path, PathResolver::new(dir.path())).unwrap();
        assert!(store.get_all().is_empty());

        store
            .add(SoundButton::new("Horn", "", DEFAULT_GROUP, 0))
            .unwrap();
        let reloaded = ButtonStore::open(&path, PathResolver::new(dir.path())).unwrap();
        assert_eq!(reloaded.get_all().len(), 1);
    }

    #[test]
    fn test_contains_file_path() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let horn = store
            .add(SoundButton::new("Horn", "horn.wav", DEFAULT_GROUP, 0))
            .unwrap();

        assert!(store.contains_file_path("horn.wav", None));
        let absolute = dir.path().join("horn.wav");
        assert!(store.contains_file_path(&absolute.to_string_lossy(), None));
        assert!(!store.contains_file_path("horn.wav", Some(horn.id)));
        assert!(!store.contains_file_path("bell.wav", None));
    }
}
