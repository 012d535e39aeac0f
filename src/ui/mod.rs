// Module UI - fenêtre egui du soundboard

pub mod app;
pub mod device_worker;
pub mod edit_dialog;
