// Main UI App - fenêtre du soundboard

use crate::audio::device::AudioDeviceInfo;
use crate::audio::engine::SoundEngine;
use crate::messaging::channels::{NotificationConsumer, SharedNotifier, notify};
use crate::messaging::notification::{Notification, NotificationCategory, NotificationLevel};
use crate::paths::PathResolver;
use crate::settings::SettingsStore;
use crate::store::{ButtonStore, SoundButton, StoreError, ordering};
use crate::ui::device_worker::{DeviceCommand, DeviceWorker};
use crate::ui::edit_dialog::{ButtonEditor, EditorAction};
use eframe::egui;
use ringbuf::traits::Consumer;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Buttons bucketed by group name, each bucket sorted by order
pub fn group_buttons(buttons: &[SoundButton]) -> Vec<(String, Vec<SoundButton>)> {
    let mut groups: BTreeMap<String, Vec<SoundButton>> = BTreeMap::new();
    for button in buttons {
        groups
            .entry(button.group.clone())
            .or_default()
            .push(button.clone());
    }
    for members in groups.values_mut() {
        members.sort_by_key(|b| b.order);
    }
    groups.into_iter().collect()
}

pub struct SoundboardApp {
    store: Arc<ButtonStore>,
    engine: Arc<SoundEngine>,
    settings: Arc<SettingsStore>,
    resolver: PathResolver,
    buttons: Vec<SoundButton>,
    selected_button: Option<Uuid>,
    editor: Option<ButtonEditor>,
    // Device management
    output_devices: Vec<AudioDeviceInfo>,
    input_devices: Vec<AudioDeviceInfo>,
    selected_output: Option<usize>,
    selected_microphone: Option<usize>,
    devices: DeviceWorker,
    web_url: String,
    // Notification system
    notifier: SharedNotifier,
    notification_rx: NotificationConsumer,
    notification_queue: VecDeque<Notification>,
    max_notifications: usize,
}

impl SoundboardApp {
    pub fn new(
        store: Arc<ButtonStore>,
        engine: Arc<SoundEngine>,
        settings: Arc<SettingsStore>,
        resolver: PathResolver,
        notifier: SharedNotifier,
        notification_rx: NotificationConsumer,
        web_url: String,
    ) -> Self {
        let selected_output = engine.output_device();
        let selected_microphone = engine.microphone_device();
        let devices = spawn_device_worker(Arc::clone(&engine), Arc::clone(&notifier));

        let mut app = Self {
            store,
            engine,
            settings,
            resolver,
            buttons: Vec::new(),
            selected_button: None,
            editor: None,
            output_devices: Vec::new(),
            input_devices: Vec::new(),
            selected_output,
            selected_microphone,
            devices,
            web_url,
            notifier,
            notification_rx,
            notification_queue: VecDeque::new(),
            max_notifications: 10,
        };
        app.refresh_devices();
        app.refresh_buttons();
        app
    }

    fn refresh_devices(&mut self) {
        self.output_devices = self.engine.output_devices();
        self.input_devices = self.engine.input_devices();
    }

    fn refresh_buttons(&mut self) {
        self.buttons = self.store.get_all();
        if let Some(id) = self.selected_button {
            if !self.buttons.iter().any(|b| b.id == id) {
                self.selected_button = None;
            }
        }
    }

    /// Lit les nouvelles notifications depuis le ringbuffer et les ajoute à la queue
    fn update_notifications(&mut self) {
        while let Some(notification) = self.notification_rx.try_pop() {
            self.notification_queue.push_back(notification);

            if self.notification_queue.len() > self.max_notifications {
                self.notification_queue.pop_front();
            }
        }
    }

    /// Récupère toutes les notifications récentes (moins de 5 secondes)
    fn get_recent_notifications(&self) -> Vec<&Notification> {
        self.notification_queue
            .iter()
            .filter(|n| n.is_recent(5000))
            .collect()
    }

    fn report_store_result<T>(&self, action: &str, result: Result<T, StoreError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("{} failed: {}", action, e);
                notify(
                    &self.notifier,
                    Notification::error(NotificationCategory::Storage, format!("{} failed: {}", action, e)),
                );
                None
            }
        }
    }

    /// Play on a worker thread: the engine may sleep between attempts
    fn play(&self, button: &SoundButton) {
        let engine = Arc::clone(&self.engine);
        let notifier = Arc::clone(&self.notifier);
        let file_path = button.file_path.clone();
        let label = button.label.clone();

        let spawned = std::thread::Builder::new()
            .name("soundboard-play".to_string())
            .spawn(move || {
                if let Err(e) = engine.play(&file_path) {
                    notify(
                        &notifier,
                        Notification::error(NotificationCategory::Playback, format!("Cannot play '{}': {}", label, e)),
                    );
                }
            });
        if let Err(e) = spawned {
            log::error!("Cannot spawn playback thread: {}", e);
        }
    }

    fn stop(&self) {
        let engine = Arc::clone(&self.engine);
        std::thread::spawn(move || engine.stop());
    }

    fn select_output(&mut self, device: Option<usize>) {
        self.selected_output = device;
        self.settings.set_selected_audio_device(device);
        self.send_device_command(DeviceCommand::Output(device));
    }

    fn select_microphone(&mut self, device: Option<usize>) {
        self.selected_microphone = device;
        self.settings.set_selected_microphone_device(device);
        self.send_device_command(DeviceCommand::Microphone(device));
    }

    fn send_device_command(&self, command: DeviceCommand) {
        if !self.devices.send(command) {
            notify(
                &self.notifier,
                Notification::error(NotificationCategory::Device, "Device changes are unavailable"),
            );
        }
    }

    fn delete_selected(&mut self) {
        if let Some(id) = self.selected_button {
            let result = ordering::delete_button(&self.store, id);
            self.report_store_result("Delete", result);
            self.selected_button = None;
            self.refresh_buttons();
        }
    }

    fn move_selected(&mut self, up: bool) {
        if let Some(id) = self.selected_button {
            let result = if up {
                ordering::move_up(&self.store, id)
            } else {
                ordering::move_down(&self.store, id)
            };
            self.report_store_result("Move", result);
            self.refresh_buttons();
        }
    }

    fn import_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if dropped.is_empty() {
            return;
        }

        let result = ordering::import_files(&self.store, &self.resolver, &dropped);
        if let Some(created) = self.report_store_result("Import", result) {
            if !created.is_empty() {
                notify(
                    &self.notifier,
                    Notification::info(NotificationCategory::Storage, format!("Imported {} sounds", created.len())),
                );
            }
        }
        self.refresh_buttons();
    }

    fn save_editor(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };

        let store = &self.store;
        let values = match editor.validate(|path, excluding| store.contains_file_path(path, excluding)) {
            Ok(values) => values,
            Err(message) => {
                editor.set_error(message);
                return;
            }
        };

        let result = match editor.target() {
            Some(id) => ordering::edit_button(store, id, &values).map(|_| id),
            None => ordering::add_button(store, values).map(|created| created.id),
        };

        match result {
            Ok(id) => {
                self.selected_button = Some(id);
                self.editor = None;
                self.refresh_buttons();
            }
            Err(e) => editor.set_error(format!("Could not save: {}", e)),
        }
    }

    fn draw_device_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Audio Output:");
            let mut output = self.selected_output;
            egui::ComboBox::from_id_salt("audio_device_selector")
                .selected_text(device_label(&self.output_devices, output, "(Default)"))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut output, None, "(Default)");
                    for device in &self.output_devices {
                        ui.selectable_value(&mut output, Some(device.index), describe_device(device));
                    }
                });
            if output != self.selected_output {
                self.select_output(output);
            }

            ui.add_space(20.0);

            ui.label("Microphone:");
            let mut microphone = self.selected_microphone;
            egui::ComboBox::from_id_salt("microphone_device_selector")
                .selected_text(device_label(&self.input_devices, microphone, "(Disabled)"))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut microphone, None, "(Disabled)");
                    for device in &self.input_devices {
                        ui.selectable_value(&mut microphone, Some(device.index), describe_device(device));
                    }
                });
            if microphone != self.selected_microphone {
                self.select_microphone(microphone);
            }

            if ui.button("🔄").on_hover_text("Refresh devices").clicked() {
                self.refresh_devices();
            }
        });
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        let has_selection = self.selected_button.is_some();

        ui.horizontal(|ui| {
            if ui.button("➕ Add").clicked() {
                self.editor = Some(ButtonEditor::create());
            }
            if ui.add_enabled(has_selection, egui::Button::new("✏ Edit")).clicked() {
                let selected = self
                    .selected_button
                    .and_then(|id| self.buttons.iter().find(|b| b.id == id));
                if let Some(button) = selected {
                    self.editor = Some(ButtonEditor::edit(button));
                }
            }
            if ui.add_enabled(has_selection, egui::Button::new("🗑 Delete")).clicked() {
                self.delete_selected();
            }
            if ui.add_enabled(has_selection, egui::Button::new("⬆")).on_hover_text("Move up").clicked() {
                self.move_selected(true);
            }
            if ui.add_enabled(has_selection, egui::Button::new("⬇")).on_hover_text("Move down").clicked() {
                self.move_selected(false);
            }

            ui.separator();
            if ui.button("⏹ Stop").clicked() {
                self.stop();
            }
            if ui.button("🌐 Open web interface").on_hover_text(self.web_url.as_str()).clicked() {
                ui.ctx().open_url(egui::OpenUrl::new_tab(&self.web_url));
            }
            if self.engine.is_playing() {
                ui.colored_label(egui::Color32::GREEN, "● Playing");
            }
        });
    }

    fn draw_buttons(&mut self, ui: &mut egui::Ui) {
        if self.buttons.is_empty() {
            ui.label("No sounds yet. Click Add or drop audio files here.");
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (group, members) in group_buttons(&self.buttons) {
                egui::CollapsingHeader::new(format!("{} ({})", group, members.len()))
                    .id_salt(&group)
                    .default_open(true)
                    .show(ui, |ui| {
                        for button in members {
                            let selected = self.selected_button == Some(button.id);
                            let response = ui
                                .selectable_label(selected, format!("🔊 {}", button.label))
                                .on_hover_text(button.file_path.as_str());
                            if response.clicked() {
                                clicked = Some(button);
                            }
                        }
                    });
            }
        });

        if let Some(button) = clicked {
            self.selected_button = Some(button.id);
            self.play(&button);
        }
    }

    /// Affiche la barre de statut en bas de la fenêtre
    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            // Afficher les notifications récentes (moins de 5s)
            let recent_notifications = self.get_recent_notifications();

            if recent_notifications.is_empty() {
                ui.label("Ready");
            } else {
                for notification in recent_notifications {
                    // Couleur selon le niveau
                    let (icon, color) = match notification.level {
                        NotificationLevel::Info => ("ℹ", egui::Color32::from_rgb(100, 150, 255)),
                        NotificationLevel::Warning => ("⚠", egui::Color32::from_rgb(255, 165, 0)),
                        NotificationLevel::Error => ("✖", egui::Color32::RED),
                    };

                    ui.colored_label(color, icon);
                    ui.colored_label(color, notification.message.as_str());
                    ui.add_space(10.0);
                }
            }
        });
    }
}

/// Device commands run on one thread so quick successive picks apply in order
fn spawn_device_worker(engine: Arc<SoundEngine>, notifier: SharedNotifier) -> DeviceWorker {
    DeviceWorker::spawn(move |command| match command {
        DeviceCommand::Output(device) => engine.set_output_device(device),
        DeviceCommand::Microphone(device) => {
            engine.set_microphone_device(device);
            if device.is_some() && engine.microphone_device().is_none() {
                notify(
                    &notifier,
                    Notification::warning(NotificationCategory::Device, "Microphone unavailable, continuing without it"),
                );
            }
        }
    })
}

fn describe_device(device: &AudioDeviceInfo) -> String {
    if device.is_default {
        format!("{} (default)", device.name)
    } else {
        device.name.clone()
    }
}

fn device_label(devices: &[AudioDeviceInfo], selected: Option<usize>, none_label: &str) -> String {
    match selected {
        None => none_label.to_string(),
        Some(index) => devices
            .iter()
            .find(|d| d.index == index)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| format!("Device {}", index)),
    }
}

impl eframe::App for SoundboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll notifications from worker threads
        ctx.request_repaint_after(Duration::from_millis(250));

        self.update_notifications();
        self.import_dropped_files(ctx);

        egui::TopBottomPanel::top("devices").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_device_bar(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.draw_status_bar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Soundboard");
            self.draw_toolbar(ui);
            ui.separator();
            self.draw_buttons(ui);
        });

        let action = match self.editor.as_mut() {
            Some(editor) => {
                let groups = self.store.list_groups();
                editor.show(ctx, &groups, &self.resolver)
            }
            None => EditorAction::None,
        };
        match action {
            EditorAction::Save => self.save_editor(),
            EditorAction::Cancel => self.editor = None,
            EditorAction::None => {}
        }
    }
}
