// Dialogue d'édition d'un bouton (création ou modification)

use crate::paths::PathResolver;
use crate::store::ordering::SUPPORTED_EXTENSIONS;
use crate::store::{DEFAULT_GROUP, SoundButton};
use eframe::egui;
use uuid::Uuid;

/// Outcome of one frame of the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Save,
    Cancel,
}

pub struct ButtonEditor {
    /// Button being edited, `None` when creating one
    target: Option<Uuid>,
    pub label: String,
    pub file_path: String,
    pub group: String,
    pub order: u32,
    error: Option<String>,
}

impl ButtonEditor {
    pub fn create() -> Self {
        Self {
            target: None,
            label: String::new(),
            file_path: String::new(),
            group: DEFAULT_GROUP.to_string(),
            order: 0,
            error: None,
        }
    }

    pub fn edit(button: &SoundButton) -> Self {
        Self {
            target: Some(button.id),
            label: button.label.clone(),
            file_path: button.file_path.clone(),
            group: button.group.clone(),
            order: button.order,
            error: None,
        }
    }

    pub fn target(&self) -> Option<Uuid> {
        self.target
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Check the form and build the values to store
    ///
    /// `path_in_use(path, excluding)` reports whether another button already
    /// references `path`.
    pub fn validate(
        &self,
        path_in_use: impl Fn(&str, Option<Uuid>) -> bool,
    ) -> Result<SoundButton, String> {
        let label = self.label.trim();
        if label.is_empty() {
            return Err("Please enter a label.".to_string());
        }

        let file_path = self.file_path.trim();
        if file_path.is_empty() {
            return Err("Please select an audio file.".to_string());
        }

        if path_in_use(file_path, self.target) {
            return Err("This file is already assigned to another button.".to_string());
        }

        let group = match self.group.trim() {
            "" => DEFAULT_GROUP,
            group => group,
        };

        let mut values = SoundButton::new(label, file_path, group, self.order);
        if let Some(id) = self.target {
            values.id = id;
        }
        Ok(values)
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        groups: &[String],
        resolver: &PathResolver,
    ) -> EditorAction {
        let mut action = EditorAction::None;
        let title = if self.target.is_some() {
            "Edit button"
        } else {
            "New button"
        };

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                egui::Grid::new("button_editor_grid")
                    .num_columns(2)
                    .spacing([8.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Label:");
                        ui.text_edit_singleline(&mut self.label);
                        ui.end_row();

                        ui.label("File:");
                        ui.horizontal(|ui| {
                            ui.text_edit_singleline(&mut self.file_path);
                            if ui.button("Browse…").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("Audio", &SUPPORTED_EXTENSIONS[..])
                                    .pick_file()
                                {
                                    self.file_path = resolver
                                        .to_relative_if_possible(&path)
                                        .to_string_lossy()
                                        .into_owned();
                                }
                            }
                        });
                        ui.end_row();

                        ui.label("Group:");
                        ui.horizontal(|ui| {
                            ui.text_edit_singleline(&mut self.group);
                            egui::ComboBox::from_id_salt("button_editor_groups")
                                .selected_text("Existing")
                                .show_ui(ui, |ui| {
                                    for group in groups {
                                        if ui.selectable_label(*group == self.group, group.as_str()).clicked() {
                                            self.group = group.clone();
                                        }
                                    }
                                });
                        });
                        ui.end_row();

                        ui.label("Order:");
                        ui.add(egui::DragValue::new(&mut self.order).range(0..=9999));
                        ui.end_row();
                    });

                if let Some(error) = &self.error {
                    ui.colored_label(egui::Color32::RED, error.as_str());
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        action = EditorAction::Save;
                    }
                    if ui.button("Cancel").clicked() {
                        action = EditorAction::Cancel;
                    }
                });
            });

        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never_used(_: &str, _: Option<Uuid>) -> bool {
        false
    }

    #[test]
    fn test_rejects_blank_label() {
        let mut editor = ButtonEditor::create();
        editor.label = "   ".to_string();
        editor.file_path = "horn.wav".to_string();

        assert!(editor.validate(never_used).is_err());
    }

    #[test]
    fn test_rejects_blank_path() {
        let mut editor = ButtonEditor::create();
        editor.label = "Horn".to_string();

        assert!(editor.validate(never_used).is_err());
    }

    #[test]
    fn test_rejects_duplicate_path() {
        let existing = SoundButton::new("Horn", "horn.wav", "Effects", 0);
        let mut editor = ButtonEditor::create();
        editor.label = "Other horn".to_string();
        editor.file_path = "horn.wav".to_string();

        let in_use = |path: &str, excluding: Option<Uuid>| {
            path == existing.file_path && excluding != Some(existing.id)
        };
        assert!(editor.validate(in_use).is_err());

        // Editing the owner of the path is allowed
        let editor = ButtonEditor::edit(&existing);
        assert!(editor.validate(in_use).is_ok());
    }

    #[test]
    fn test_blank_group_becomes_default() {
        let existing = SoundButton::new("Horn", "horn.wav", "Effects", 3);
        let mut editor = ButtonEditor::edit(&existing);
        editor.group = " ".to_string();
        editor.label = "  Big horn ".to_string();

        let values = editor.validate(never_used).unwrap();
        assert_eq!(values.id, existing.id);
        assert_eq!(values.label, "Big horn");
        assert_eq!(values.group, DEFAULT_GROUP);
        assert_eq!(values.order, 3);
    }
}
