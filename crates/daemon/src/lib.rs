//! stripwm driver
//!
//! Feeds host events through the layout engine against a simulated host and
//! answers with the resulting placements. The `stripwm` binary wraps
//! [`AppState`] in a JSON-lines loop over stdin and stdout.

mod actions;
pub mod client_state;
pub mod config;
pub mod presets;
pub mod rules;
pub mod sim_host;
pub mod state;

pub use client_state::{ClientState, Timer};
pub use config::Config;
pub use presets::PresetWidths;
pub use sim_host::{PinManager, SimHost};
pub use state::{AppState, DriverError, Outcome, INITIAL_DESKTOP};
