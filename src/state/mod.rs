// State module - per-session bookkeeping shared by the reporters

pub mod errors;
pub mod session;

pub use errors::ErrorLog;
pub use session::SessionClock;
