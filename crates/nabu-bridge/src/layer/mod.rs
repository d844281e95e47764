mod config;
mod controller;
mod state;
mod teardown;

pub use config::LayerConfig;
pub use controller::GuestLayer;
pub use state::{FrameOutcome, LayerSession, LayerState, SkipReason};
pub use teardown::{TEARDOWN_ORDER, TeardownStep};
