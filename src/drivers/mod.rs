//! Device collaborator interfaces: the console and machine power control.
//!
//! The concrete drivers live in the outer kernel; the boundary layer only
//! needs these two capabilities.

pub mod console;
pub mod shutdown;

pub use console::Console;
pub use shutdown::Machine;
