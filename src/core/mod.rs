//! Core functionality for the GuitarCabinet control panel
//! Bluetooth plumbing, the wire codec and the per-connection session state

pub mod bluetooth;
pub mod protocol;
pub mod session;

// Re-export commonly used types
pub use bluetooth::CabinetManager;
pub use session::{CabinetState, SaveOutcome, Session, SessionEvent};
