// Gestion des devices audio CPAL

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceInfo {
    /// Position in the enumeration, used as the device id everywhere else
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Liste tous les périphériques de sortie audio disponibles
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        match self.host.output_devices() {
            Ok(devices) => describe(devices, &default_name),
            Err(e) => {
                log::warn!("Could not enumerate output devices: {}", e);
                Vec::new()
            }
        }
    }

    /// Liste tous les périphériques d'entrée (micros)
    pub fn list_input_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        match self.host.input_devices() {
            Ok(devices) => describe(devices, &default_name),
            Err(e) => {
                log::warn!("Could not enumerate input devices: {}", e);
                Vec::new()
            }
        }
    }

    /// Périphérique de sortie par index, ou celui par défaut
    pub fn output_device(&self, index: Option<usize>) -> Option<Device> {
        match index {
            None => self.host.default_output_device(),
            Some(index) => self.host.output_devices().ok()?.nth(index),
        }
    }

    pub fn input_device(&self, index: usize) -> Option<Device> {
        self.host.input_devices().ok()?.nth(index)
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

// Devices whose name cannot be read keep their slot so indices stay aligned
// with `output_device` / `input_device`.
fn describe(devices: impl Iterator<Item = Device>, default_name: &str) -> Vec<AudioDeviceInfo> {
    devices
        .enumerate()
        .map(|(index, device)| {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("Unknown device {}", index));
            AudioDeviceInfo {
                index,
                is_default: !default_name.is_empty() && name == default_name,
                name,
            }
        })
        .collect()
}
