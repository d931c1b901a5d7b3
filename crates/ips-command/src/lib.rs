//! Streaming external commands for ips-common
//!
//! Provides:
//! - [`StreamingCommand`]: a shell command whose merged stdout/stderr is read
//!   one line at a time, with exit status tracking and forced termination
//! - [`call_external_command`]: run a command to completion and collect its output
//! - Network address discovery built on top of the above

mod call;
mod error;
mod network;
mod process;

pub use call::*;
pub use error::*;
pub use network::*;
pub use process::*;
