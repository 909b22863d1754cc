//! Process State and Lifecycle Collaborator
//!
//! [`Process`] is the slice of per-process state the boundary layer needs:
//! a name for exit reporting, the write-once exit status, the address-space
//! mapping, and the open-file table. Creation, scheduling, and teardown
//! mechanics belong to the outer kernel behind [`ProcessManager`].

use alloc::string::String;

use crate::syscall::fd::OpenFileTable;
use crate::syscall::validate::AddressSpace;

/// Process identifier, as returned by `exec` and consumed by `wait`.
pub type Pid = i32;

/// Process creation, waiting, and teardown, implemented by the outer
/// kernel's scheduler.
pub trait ProcessManager {
    /// Start a new process from a command line. `None` if creation failed.
    fn exec(&self, cmdline: &str) -> Option<Pid>;

    /// Block until the process named by `pid` exits and return its exit
    /// status, or -1 if `pid` does not name a waitable child.
    fn wait(&self, pid: Pid) -> i32;

    /// Tear down the calling process. The exit status has already been
    /// recorded on the [`Process`] by the time this runs.
    fn exit(&self, status: i32);
}

/// Boundary-layer view of the process currently trapping into the kernel.
pub struct Process<A: AddressSpace> {
    name: String,
    exit_status: Option<i32>,
    /// The process's address-space mapping, consulted for every user access.
    pub aspace: A,
    pub(crate) files: OpenFileTable,
}

impl<A: AddressSpace> Process<A> {
    /// Create the boundary-layer state for a new process.
    pub fn new(name: impl Into<String>, aspace: A) -> Self {
        Self {
            name: name.into(),
            exit_status: None,
            aspace,
            files: OpenFileTable::new(),
        }
    }

    /// Process name, used in the exit report.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exit status, once the process has terminated.
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Record the exit status. Written exactly once, by the terminating
    /// trap path.
    ///
    /// # Panics
    /// Panics if a status was already recorded.
    pub(crate) fn set_exit_status(&mut self, status: i32) {
        assert!(
            self.exit_status.is_none(),
            "exit status recorded twice for {}",
            self.name
        );
        self.exit_status = Some(status);
    }

    /// The process's open-file table (for teardown by the outer kernel).
    pub fn open_files(&self) -> &OpenFileTable {
        &self.files
    }

    /// Mutable access to the open-file table.
    pub fn open_files_mut(&mut self) -> &mut OpenFileTable {
        &mut self.files
    }
}
