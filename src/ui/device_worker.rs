// Thread unique pour les changements de périphérique, appliqués dans l'ordre

use log::{debug, warn};
use std::sync::mpsc::{Sender, channel};
use std::thread::{self, JoinHandle};

/// Device selection requested from the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Output(Option<usize>),
    Microphone(Option<usize>),
}

/// Applies device commands one at a time, in the order they were sent
///
/// Opening a device can block for a while; the window only enqueues.
pub struct DeviceWorker {
    commands: Option<Sender<DeviceCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl DeviceWorker {
    pub fn spawn(mut apply: impl FnMut(DeviceCommand) + Send + 'static) -> Self {
        let (commands, rx) = channel::<DeviceCommand>();

        let worker = thread::Builder::new()
            .name("soundboard-devices".to_string())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    debug!("Applying {:?}", command);
                    apply(command);
                }
            });

        match worker {
            Ok(worker) => Self {
                commands: Some(commands),
                worker: Some(worker),
            },
            Err(e) => {
                warn!("Cannot spawn device thread, device changes are disabled: {}", e);
                Self {
                    commands: None,
                    worker: None,
                }
            }
        }
    }

    /// Queue `command`; false when the worker is gone
    pub fn send(&self, command: DeviceCommand) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok())
    }
}

impl Drop for DeviceWorker {
    fn drop(&mut self) {
        // Fermer le canal termine la boucle après les commandes en attente
        self.commands = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
