//! GuitarCabinet control panel library
//! BLE client for the GuitarCabinet humidity cabinet: wire codec, connection
//! lifecycle and the command line handlers built on top of them.

// Module declarations
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod utils;

pub use error::PanelError;
