// Module audio - backend CPAL, décodage, mixage et moteur de lecture

pub mod backend;
pub mod cpal_backend;
pub mod decoder;
pub mod device;
pub mod engine;
pub mod format_conversion;
pub mod mixer;
pub mod retry;
pub mod source;
