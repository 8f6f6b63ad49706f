//! Receive session: configure, start, receive N buffers, stop

mod controller;
mod state;

pub use controller::CaptureSession;
pub use state::OverflowPolicy;
