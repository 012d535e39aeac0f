// Sound button record - one entry of the soundboard catalogue

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Group assigned to buttons created without an explicit group
pub const DEFAULT_GROUP: &str = "Default";

/// Group written over buttons whose audio file is missing at load time
pub const MISSING_FILES_GROUP: &str = "⁉ Missing Files";

/// A user-defined sound button
///
/// `file_path` is kept exactly as entered (possibly relative to the install
/// directory); resolve it with [`crate::paths::PathResolver`] before touching
/// the file system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundButton {
    pub id: Uuid,
    pub label: String,
    pub file_path: String,
    pub group: String,
    /// Position within `group`, zero-based
    pub order: u32,
}

impl SoundButton {
    pub fn new(
        label: impl Into<String>,
        file_path: impl Into<String>,
        group: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            file_path: file_path.into(),
            group: group.into(),
            order,
        }
    }

    /// Copies the editable fields of `values`, keeping this record's id
    pub fn apply(&mut self, values: &SoundButton) {
        self.label.clone_from(&values.label);
        self.file_path.clone_from(&values.file_path);
        self.group.clone_from(&values.group);
        self.order = values.order;
    }
}

impl Default for SoundButton {
    fn default() -> Self {
        Self::new(String::new(), String::new(), DEFAULT_GROUP, 0)
    }
}
