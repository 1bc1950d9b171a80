pub mod config;
pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod log_io;
pub mod model;
pub mod reference;
pub mod roster;
pub mod session;
pub mod state;
pub mod triggers;
