// Commands module - handles CLI command execution

pub mod listen;
pub mod replay;

pub use listen::handle_listen;
pub use replay::handle_replay;
