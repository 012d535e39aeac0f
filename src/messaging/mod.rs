// Messagerie UI - notifications envoyées par les threads de travail

pub mod channels;
pub mod notification;
