//! Machine Power Control Collaborator
//!
//! Used by exactly one caller: the `halt` syscall.

/// Machine-level power control.
pub trait Machine {
    /// Power the machine off. Does not return.
    fn power_off(&self) -> !;
}
