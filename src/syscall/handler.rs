//! Syscall Dispatch
//!
//! One trap, one pass: read the syscall number at the user stack pointer,
//! decode it, read exactly as many argument words as the syscall's arity,
//! run the handler, store the result in the trap frame. Any validation
//! failure along the way terminates the calling process with status -1
//! before its handler runs; there is no retry.
//!
//! [`Kernel`] is built once at boot and handed to the trap stub; it owns
//! the filesystem lock, the descriptor counter, and the collaborator
//! handles. Nothing here is ambient static state.

use core::cmp::min;

use alloc::format;
use alloc::string::String;
use spin::Mutex;

use crate::drivers::{Console, Machine};
use crate::fs::FileSys;
use crate::mm::address::VirtAddr;
use crate::process::{Process, ProcessManager};
use crate::syscall::fd::{FdAllocator, CONSOLE_IN_FD, CONSOLE_OUT_FD};
use crate::syscall::table::Syscall;
use crate::syscall::validate::{self, AddressSpace};

/// Size of one argument word on the user stack.
const WORD: usize = 4;

/// Bytes staged per step when shuttling user buffers through the kernel.
const COPY_CHUNK: usize = 512;

/// The user state a trap delivers: where the syscall number and arguments
/// live, and where the result goes.
#[derive(Debug, Clone, Copy)]
pub struct TrapFrame {
    /// User stack pointer at trap time. The syscall number sits here,
    /// argument k at `sp + 4 * (k + 1)`.
    pub sp: VirtAddr,
    /// Result register slot, written back to the process on return.
    pub result: i32,
}

impl TrapFrame {
    pub fn new(sp: VirtAddr) -> Self {
        Self { sp, result: 0 }
    }
}

/// What became of the trapping process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// The syscall completed; the result is in the frame.
    Resumed,
    /// The process terminated with the given status, either voluntarily
    /// (`exit`) or forcibly (validation failure).
    Exited(i32),
}

/// Handler short-circuit: the calling process must die with this status.
/// Propagated with `?` so a rejected syscall never reaches its handler.
struct Terminate(i32);

/// Kills the call with status -1; used on every bad user access.
fn bad_access<E>(_: E) -> Terminate {
    Terminate(-1)
}

/// The syscall boundary.
///
/// Generic over its collaborators: the process lifecycle, the filesystem,
/// the console, and machine power control. The filesystem sits behind a
/// single lock — namespace calls are fully serialized, by design.
pub struct Kernel<P, F, C, M> {
    procs: P,
    fs: Mutex<F>,
    console: C,
    machine: M,
    fds: FdAllocator,
}

impl<P, F, C, M> Kernel<P, F, C, M>
where
    P: ProcessManager,
    F: FileSys,
    C: Console,
    M: Machine,
{
    /// Assemble the boundary layer around its collaborators. Called once
    /// at boot.
    pub fn new(procs: P, fs: F, console: C, machine: M) -> Self {
        Self {
            procs,
            fs: Mutex::new(fs),
            console,
            machine,
            fds: FdAllocator::new(),
        }
    }

    /// Entry point for one trap.
    ///
    /// On success the return value is stored in `frame.result`. On any
    /// validation failure, or an `exit` call, the exit path runs: the
    /// status is recorded on the process, the exit report goes to the
    /// console, and [`ProcessManager::exit`] tears the process down.
    pub fn handle_trap<A: AddressSpace>(
        &self,
        proc: &mut Process<A>,
        frame: &mut TrapFrame,
    ) -> TrapOutcome {
        match self.dispatch(proc, frame) {
            Ok(value) => {
                frame.result = value;
                TrapOutcome::Resumed
            }
            Err(Terminate(status)) => {
                self.terminate(proc, status);
                TrapOutcome::Exited(status)
            }
        }
    }

    fn dispatch<A: AddressSpace>(
        &self,
        proc: &mut Process<A>,
        frame: &TrapFrame,
    ) -> Result<i32, Terminate> {
        let number = validate::read_user_u32(&proc.aspace, frame.sp).map_err(bad_access)?;
        let Some(syscall) = Syscall::from_number(number) else {
            log::warn!("{}: bad syscall number {}", proc.name(), number);
            return Err(Terminate(-1));
        };

        // Exactly `arity` words, argument 0 closest to the number. A
        // single unreadable word kills the call before the handler runs.
        let mut args = [0i32; 3];
        for (k, arg) in args.iter_mut().take(syscall.arity()).enumerate() {
            let at = frame.sp.add(WORD * (k + 1));
            *arg = validate::read_user_u32(&proc.aspace, at).map_err(bad_access)? as i32;
        }

        log::debug!("{}: {}{:?}", proc.name(), syscall.name(), &args[..syscall.arity()]);

        match syscall {
            Syscall::Halt => self.sys_halt(),
            Syscall::Exit => Err(Terminate(args[0])),
            Syscall::Exec => self.sys_exec(proc, args[0]),
            Syscall::Wait => Ok(self.procs.wait(args[0])),
            Syscall::Create => self.sys_create(proc, args[0], args[1]),
            Syscall::Remove => self.sys_remove(proc, args[0]),
            Syscall::Open => self.sys_open(proc, args[0]),
            Syscall::Filesize => Ok(self.sys_filesize(proc, args[0])),
            Syscall::Read => self.sys_read(proc, args[0], args[1], args[2]),
            Syscall::Write => self.sys_write(proc, args[0], args[1], args[2]),
            Syscall::Seek => Ok(self.sys_seek(proc, args[0], args[1])),
            Syscall::Tell => Ok(self.sys_tell(proc, args[0])),
            Syscall::Close => Ok(self.sys_close(proc, args[0])),
        }
    }

    /// The exit path, shared by voluntary `exit` and forced termination.
    ///
    /// No filesystem-lock release is needed here: handlers hold the lock
    /// only through scoped RAII guards, and every handler has returned by
    /// the time this runs.
    fn terminate<A: AddressSpace>(&self, proc: &mut Process<A>, status: i32) {
        proc.set_exit_status(status);
        let report = format!("{}: exit({})\n", proc.name(), status);
        self.console.write(report.as_bytes());
        log::debug!("{} terminated with status {}", proc.name(), status);
        self.procs.exit(status);
    }

    fn sys_halt(&self) -> Result<i32, Terminate> {
        log::info!("halt: powering off");
        self.machine.power_off()
    }

    fn sys_exec<A: AddressSpace>(
        &self,
        proc: &Process<A>,
        cmdline: i32,
    ) -> Result<i32, Terminate> {
        let cmdline = self.user_str(proc, cmdline)?;
        match self.procs.exec(&cmdline) {
            Some(pid) => Ok(pid),
            None => Ok(-1),
        }
    }

    fn sys_create<A: AddressSpace>(
        &self,
        proc: &Process<A>,
        name: i32,
        initial_size: i32,
    ) -> Result<i32, Terminate> {
        let name = self.user_str(proc, name)?;
        let created = self.fs.lock().create(&name, initial_size as u32);
        Ok(created as i32)
    }

    fn sys_remove<A: AddressSpace>(&self, proc: &Process<A>, name: i32) -> Result<i32, Terminate> {
        let name = self.user_str(proc, name)?;
        let removed = self.fs.lock().remove(&name);
        Ok(removed as i32)
    }

    fn sys_open<A: AddressSpace>(
        &self,
        proc: &mut Process<A>,
        name: i32,
    ) -> Result<i32, Terminate> {
        let name = self.user_str(proc, name)?;
        let handle = self.fs.lock().open(&name);
        match handle {
            Some(handle) => {
                let fd = self.fds.allocate();
                proc.files.insert(fd, handle);
                Ok(fd)
            }
            None => Ok(-1),
        }
    }

    fn sys_filesize<A: AddressSpace>(&self, proc: &mut Process<A>, fd: i32) -> i32 {
        match proc.files.get_mut(fd) {
            Some(handle) => handle.size() as i32,
            None => self.unknown_fd(proc, "filesize", fd),
        }
    }

    fn sys_read<A: AddressSpace>(
        &self,
        proc: &mut Process<A>,
        fd: i32,
        buf: i32,
        len: i32,
    ) -> Result<i32, Terminate> {
        let len = len as u32 as usize;
        let dst = user_addr(buf);

        if fd == CONSOLE_IN_FD {
            let console = &self.console;
            return copy_out_chunks(&proc.aspace, dst, len, |chunk| console.read(chunk));
        }
        match proc.files.get_mut(fd) {
            Some(handle) => copy_out_chunks(&proc.aspace, dst, len, |chunk| handle.read(chunk)),
            None => Ok(self.unknown_fd(proc, "read", fd)),
        }
    }

    fn sys_write<A: AddressSpace>(
        &self,
        proc: &mut Process<A>,
        fd: i32,
        buf: i32,
        len: i32,
    ) -> Result<i32, Terminate> {
        let len = len as u32 as usize;
        let src = user_addr(buf);

        if fd == CONSOLE_OUT_FD {
            let console = &self.console;
            return copy_in_chunks(&proc.aspace, src, len, |chunk| {
                console.write(chunk);
                chunk.len()
            });
        }
        match proc.files.get_mut(fd) {
            Some(handle) => copy_in_chunks(&proc.aspace, src, len, |chunk| handle.write(chunk)),
            None => Ok(self.unknown_fd(proc, "write", fd)),
        }
    }

    fn sys_seek<A: AddressSpace>(&self, proc: &mut Process<A>, fd: i32, position: i32) -> i32 {
        match proc.files.get_mut(fd) {
            Some(handle) => {
                handle.seek(position as u32);
                0
            }
            None => self.unknown_fd(proc, "seek", fd),
        }
    }

    fn sys_tell<A: AddressSpace>(&self, proc: &mut Process<A>, fd: i32) -> i32 {
        match proc.files.get_mut(fd) {
            Some(handle) => handle.tell() as i32,
            None => self.unknown_fd(proc, "tell", fd),
        }
    }

    fn sys_close<A: AddressSpace>(&self, proc: &mut Process<A>, fd: i32) -> i32 {
        match proc.files.remove(fd) {
            Some(_handle) => 0,
            None => self.unknown_fd(proc, "close", fd),
        }
    }

    /// Stage a user string into kernel memory, or kill the call.
    fn user_str<A: AddressSpace>(
        &self,
        proc: &Process<A>,
        addr: i32,
    ) -> Result<String, Terminate> {
        validate::read_user_cstring(&proc.aspace, user_addr(addr)).map_err(bad_access)
    }

    fn unknown_fd<A: AddressSpace>(&self, proc: &Process<A>, op: &str, fd: i32) -> i32 {
        log::debug!("{}: {} on unknown descriptor {}", proc.name(), op, fd);
        -1
    }
}

/// Reinterpret an argument word as a user address. Addresses are unsigned;
/// the word must not sign-extend.
fn user_addr(arg: i32) -> VirtAddr {
    VirtAddr::new(arg as u32 as usize)
}

/// Shuttle up to `len` bytes produced by `fill` out to user memory at
/// `dst`, a chunk at a time. Stops early when `fill` runs dry; a copy
/// failure kills the call.
fn copy_out_chunks<A: AddressSpace>(
    aspace: &A,
    dst: VirtAddr,
    len: usize,
    mut fill: impl FnMut(&mut [u8]) -> usize,
) -> Result<i32, Terminate> {
    let mut done = 0;
    while done < len {
        let want = min(COPY_CHUNK, len - done);
        let mut chunk = [0u8; COPY_CHUNK];
        let got = fill(&mut chunk[..want]);
        validate::copy_to_user(aspace, dst.add(done), &chunk[..got]).map_err(bad_access)?;
        done += got;
        if got < want {
            break;
        }
    }
    Ok(done as i32)
}

/// Shuttle up to `len` bytes of user memory at `src` into `sink`, a chunk
/// at a time. Stops early when `sink` stops accepting (storage full); a
/// copy failure kills the call before the current chunk reaches the sink.
fn copy_in_chunks<A: AddressSpace>(
    aspace: &A,
    src: VirtAddr,
    len: usize,
    mut sink: impl FnMut(&[u8]) -> usize,
) -> Result<i32, Terminate> {
    let mut done = 0;
    while done < len {
        let take = min(COPY_CHUNK, len - done);
        let mut chunk = [0u8; COPY_CHUNK];
        validate::copy_from_user(aspace, &mut chunk[..take], src.add(done)).map_err(bad_access)?;
        let accepted = sink(&chunk[..take]);
        done += accepted;
        if accepted < take {
            break;
        }
    }
    Ok(done as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FileHandle;
    use crate::syscall::validate::mock::MockUserSpace;
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec::Vec;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex as StdMutex};

    /// In-memory filesystem whose contents outlive the kernel, so tests
    /// can inspect them afterwards.
    #[derive(Default, Clone)]
    struct MemFs {
        files: Arc<StdMutex<BTreeMap<String, Vec<u8>>>>,
    }

    struct MemFile {
        name: String,
        pos: usize,
        files: Arc<StdMutex<BTreeMap<String, Vec<u8>>>>,
    }

    impl FileHandle for MemFile {
        fn size(&self) -> u32 {
            self.files.lock().unwrap()[&self.name].len() as u32
        }

        fn read(&mut self, buf: &mut [u8]) -> usize {
            let files = self.files.lock().unwrap();
            let data = &files[&self.name];
            let n = buf.len().min(data.len().saturating_sub(self.pos));
            buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
            drop(files);
            self.pos += n;
            n
        }

        fn write(&mut self, buf: &[u8]) -> usize {
            let mut files = self.files.lock().unwrap();
            let data = files.get_mut(&self.name).unwrap();
            if data.len() < self.pos + buf.len() {
                data.resize(self.pos + buf.len(), 0);
            }
            data[self.pos..self.pos + buf.len()].copy_from_slice(buf);
            drop(files);
            self.pos += buf.len();
            buf.len()
        }

        fn seek(&mut self, position: u32) {
            self.pos = position as usize;
        }

        fn tell(&self) -> u32 {
            self.pos as u32
        }
    }

    impl FileSys for MemFs {
        fn create(&mut self, name: &str, initial_size: u32) -> bool {
            let mut files = self.files.lock().unwrap();
            if files.contains_key(name) {
                return false;
            }
            files.insert(name.into(), vec![0; initial_size as usize]);
            true
        }

        fn open(&mut self, name: &str) -> Option<Box<dyn FileHandle>> {
            if !self.files.lock().unwrap().contains_key(name) {
                return None;
            }
            Some(Box::new(MemFile {
                name: name.into(),
                pos: 0,
                files: Arc::clone(&self.files),
            }))
        }

        fn remove(&mut self, name: &str) -> bool {
            self.files.lock().unwrap().remove(name).is_some()
        }
    }

    #[derive(Default, Clone)]
    struct MockConsole {
        out: Arc<StdMutex<Vec<u8>>>,
        input: Arc<StdMutex<Vec<u8>>>,
    }

    impl MockConsole {
        fn output(&self) -> String {
            String::from_utf8(self.out.lock().unwrap().clone()).unwrap()
        }

        fn feed_input(&self, bytes: &[u8]) {
            self.input.lock().unwrap().extend_from_slice(bytes);
        }
    }

    impl Console for MockConsole {
        fn write(&self, bytes: &[u8]) {
            self.out.lock().unwrap().extend_from_slice(bytes);
        }

        fn read(&self, buf: &mut [u8]) -> usize {
            let mut input = self.input.lock().unwrap();
            let n = buf.len().min(input.len());
            buf[..n].copy_from_slice(&input[..n]);
            input.drain(..n);
            n
        }
    }

    #[derive(Default, Clone)]
    struct MockProcs {
        exits: Arc<StdMutex<Vec<i32>>>,
        exec_log: Arc<StdMutex<Vec<String>>>,
        children: Arc<StdMutex<BTreeMap<i32, i32>>>,
    }

    impl ProcessManager for MockProcs {
        fn exec(&self, cmdline: &str) -> Option<i32> {
            self.exec_log.lock().unwrap().push(cmdline.into());
            if cmdline.starts_with("nonexistent") {
                None
            } else {
                Some(100)
            }
        }

        fn wait(&self, pid: i32) -> i32 {
            self.children.lock().unwrap().get(&pid).copied().unwrap_or(-1)
        }

        fn exit(&self, status: i32) {
            self.exits.lock().unwrap().push(status);
        }
    }

    struct MockMachine;

    impl Machine for MockMachine {
        fn power_off(&self) -> ! {
            panic!("machine powered off");
        }
    }

    /// A stack page for the trap arguments, a data page for strings and
    /// buffers.
    const SP: usize = 0x0807_E000;
    const DATA: usize = 0x0804_0000;

    struct Harness {
        kernel: Kernel<MockProcs, MemFs, MockConsole, MockMachine>,
        console: MockConsole,
        procs: MockProcs,
        proc: Process<MockUserSpace>,
    }

    impl Harness {
        fn new() -> Self {
            let console = MockConsole::default();
            let procs = MockProcs::default();
            let kernel = Kernel::new(
                procs.clone(),
                MemFs::default(),
                console.clone(),
                MockMachine,
            );
            let mut aspace = MockUserSpace::new();
            aspace.map_page(VirtAddr::new(SP));
            aspace.map_page(VirtAddr::new(DATA));
            Self {
                kernel,
                console,
                procs,
                proc: Process::new("init", aspace),
            }
        }

        /// Lay out number and arguments at the stack pointer and take one
        /// trap.
        fn trap(&mut self, number: u32, args: &[u32]) -> (TrapOutcome, i32) {
            let sp = VirtAddr::new(SP);
            self.proc.aspace.store_u32(sp, number);
            for (k, &arg) in args.iter().enumerate() {
                self.proc.aspace.store_u32(sp.add(WORD * (k + 1)), arg);
            }
            let mut frame = TrapFrame::new(sp);
            let outcome = self.kernel.handle_trap(&mut self.proc, &mut frame);
            (outcome, frame.result)
        }

        fn put_cstring(&mut self, at: usize, s: &str) -> u32 {
            self.proc.aspace.store_cstring(VirtAddr::new(at), s);
            at as u32
        }
    }

    #[test]
    fn create_then_open_hands_out_increasing_descriptors() {
        let mut h = Harness::new();
        let name = h.put_cstring(DATA, "foo.txt");

        let (outcome, created) = h.trap(4, &[name, 0]);
        assert_eq!(outcome, TrapOutcome::Resumed);
        assert_eq!(created, 1);

        let (_, fd1) = h.trap(6, &[name]);
        let (_, fd2) = h.trap(6, &[name]);
        assert!(fd1 >= 2);
        assert!(fd2 > fd1);
    }

    #[test]
    fn open_of_missing_file_fails_without_consuming_a_descriptor() {
        let mut h = Harness::new();
        let missing = h.put_cstring(DATA, "missing.txt");
        let (outcome, result) = h.trap(6, &[missing]);
        assert_eq!(outcome, TrapOutcome::Resumed);
        assert_eq!(result, -1);

        // The next successful open still gets the first file descriptor.
        let name = h.put_cstring(DATA + 64, "real.txt");
        h.trap(4, &[name, 0]);
        let (_, fd) = h.trap(6, &[name]);
        assert_eq!(fd, 2);
    }

    #[test]
    fn create_of_existing_file_fails() {
        let mut h = Harness::new();
        let name = h.put_cstring(DATA, "foo.txt");
        let (_, first) = h.trap(4, &[name, 16]);
        let (_, second) = h.trap(4, &[name, 16]);
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[test]
    fn remove_drops_the_file_from_the_namespace() {
        let mut h = Harness::new();
        let name = h.put_cstring(DATA, "gone.txt");
        h.trap(4, &[name, 0]);
        let (_, removed) = h.trap(5, &[name]);
        let (_, again) = h.trap(5, &[name]);
        assert_eq!(removed, 1);
        assert_eq!(again, 0);
        let (_, reopened) = h.trap(6, &[name]);
        assert_eq!(reopened, -1);
    }

    #[test]
    fn console_write_delivers_exact_bytes() {
        let mut h = Harness::new();
        h.proc.aspace.store(VirtAddr::new(DATA), b"hi");
        let (outcome, written) = h.trap(9, &[1, DATA as u32, 2]);
        assert_eq!(outcome, TrapOutcome::Resumed);
        assert_eq!(written, 2);
        assert_eq!(h.console.output(), "hi");
    }

    #[test]
    fn console_read_fills_the_user_buffer() {
        let mut h = Harness::new();
        h.console.feed_input(b"ab");
        let (outcome, got) = h.trap(8, &[0, DATA as u32, 8]);
        assert_eq!(outcome, TrapOutcome::Resumed);
        assert_eq!(got, 2);
        assert_eq!(h.proc.aspace.fetch(VirtAddr::new(DATA), 2), b"ab");
    }

    #[test]
    fn file_write_seek_read_round_trip() {
        let mut h = Harness::new();
        let name = h.put_cstring(DATA, "log.txt");
        h.trap(4, &[name, 0]);
        let (_, fd) = h.trap(6, &[name]);
        let fd = fd as u32;

        let buf = DATA + 256;
        h.proc.aspace.store(VirtAddr::new(buf), b"hello");
        let (_, wrote) = h.trap(9, &[fd, buf as u32, 5]);
        assert_eq!(wrote, 5);

        let (_, size) = h.trap(7, &[fd]);
        assert_eq!(size, 5);
        let (_, pos) = h.trap(11, &[fd]);
        assert_eq!(pos, 5);

        let (_, seeked) = h.trap(10, &[fd, 0]);
        assert_eq!(seeked, 0);
        let dst = DATA + 512;
        let (_, read) = h.trap(8, &[fd, dst as u32, 16]);
        assert_eq!(read, 5);
        assert_eq!(h.proc.aspace.fetch(VirtAddr::new(dst), 5), b"hello");
    }

    #[test]
    fn close_retires_the_descriptor_for_good() {
        let mut h = Harness::new();
        let name = h.put_cstring(DATA, "foo.txt");
        h.trap(4, &[name, 0]);
        let (_, fd) = h.trap(6, &[name]);

        let (_, closed) = h.trap(12, &[fd as u32]);
        assert_eq!(closed, 0);
        let (_, closed_again) = h.trap(12, &[fd as u32]);
        assert_eq!(closed_again, -1);
        let (_, size_after) = h.trap(7, &[fd as u32]);
        assert_eq!(size_after, -1);

        // The value never comes back, even for a fresh open.
        let (_, fd2) = h.trap(6, &[name]);
        assert!(fd2 > fd);
    }

    #[test]
    fn descriptor_ops_on_unknown_fd_fail_cleanly() {
        let mut h = Harness::new();
        for (number, args) in [
            (7u32, vec![99u32]),
            (8, vec![99, DATA as u32, 4]),
            (9, vec![99, DATA as u32, 4]),
            (10, vec![99, 0]),
            (11, vec![99]),
            (12, vec![99]),
        ] {
            let (outcome, result) = h.trap(number, &args);
            assert_eq!(outcome, TrapOutcome::Resumed);
            assert_eq!(result, -1, "syscall {} should fail with -1", number);
        }
    }

    #[test]
    fn exit_records_status_and_reports_on_console() {
        let mut h = Harness::new();
        let (outcome, _) = h.trap(1, &[7]);
        assert_eq!(outcome, TrapOutcome::Exited(7));
        assert_eq!(h.proc.exit_status(), Some(7));
        assert_eq!(h.console.output(), "init: exit(7)\n");
        assert_eq!(*h.procs.exits.lock().unwrap(), vec![7]);
    }

    #[test]
    fn wait_returns_the_child_status() {
        let mut h = Harness::new();
        h.procs.children.lock().unwrap().insert(5, 7);
        let (_, status) = h.trap(3, &[5]);
        assert_eq!(status, 7);
        let (_, unknown) = h.trap(3, &[9]);
        assert_eq!(unknown, -1);
    }

    #[test]
    fn exec_passes_the_command_line_through() {
        let mut h = Harness::new();
        let cmd = h.put_cstring(DATA, "echo hello");
        let (_, pid) = h.trap(2, &[cmd]);
        assert_eq!(pid, 100);
        assert_eq!(*h.procs.exec_log.lock().unwrap(), vec!["echo hello"]);

        let bad = h.put_cstring(DATA + 64, "nonexistent prog");
        let (_, failed) = h.trap(2, &[bad]);
        assert_eq!(failed, -1);
    }

    #[test]
    fn unreadable_syscall_number_terminates_the_process() {
        let mut h = Harness::new();
        let mut frame = TrapFrame::new(VirtAddr::new(0x0700_0000)); // unmapped
        let outcome = h.kernel.handle_trap(&mut h.proc, &mut frame);
        assert_eq!(outcome, TrapOutcome::Exited(-1));
        assert_eq!(h.proc.exit_status(), Some(-1));
        assert_eq!(h.console.output(), "init: exit(-1)\n");
    }

    #[test]
    fn out_of_range_syscall_number_terminates_the_process() {
        let mut h = Harness::new();
        let (outcome, _) = h.trap(13, &[]);
        assert_eq!(outcome, TrapOutcome::Exited(-1));
        assert_eq!(*h.procs.exits.lock().unwrap(), vec![-1]);
    }

    #[test]
    fn unreadable_argument_word_terminates_before_the_handler() {
        let mut h = Harness::new();
        // Number in the last mapped word of the stack page; argument 0
        // would sit on the unmapped page that follows.
        let sp = VirtAddr::new(SP + crate::mm::address::PAGE_SIZE - 4);
        h.proc.aspace.store_u32(sp, 11); // tell, arity 1
        let mut frame = TrapFrame::new(sp);
        let outcome = h.kernel.handle_trap(&mut h.proc, &mut frame);
        assert_eq!(outcome, TrapOutcome::Exited(-1));
    }

    #[test]
    #[should_panic(expected = "machine powered off")]
    fn halt_reads_no_arguments_and_powers_off() {
        let mut h = Harness::new();
        // Same layout as above: any argument read would fault and exit
        // instead of reaching power_off.
        let sp = VirtAddr::new(SP + crate::mm::address::PAGE_SIZE - 4);
        h.proc.aspace.store_u32(sp, 0); // halt, arity 0
        let mut frame = TrapFrame::new(sp);
        h.kernel.handle_trap(&mut h.proc, &mut frame);
    }

    #[test]
    fn bad_string_pointer_terminates_the_process() {
        let mut h = Harness::new();
        let (outcome, _) = h.trap(2, &[0x0700_0000]); // exec, unmapped string
        assert_eq!(outcome, TrapOutcome::Exited(-1));
    }

    #[test]
    fn unterminated_string_terminates_the_process() {
        let mut h = Harness::new();
        // Fill from DATA to the end of its page with no NUL; the next
        // page is unmapped.
        let fill = vec![b'x'; crate::mm::address::PAGE_SIZE];
        h.proc.aspace.store(VirtAddr::new(DATA), &fill);
        let (outcome, _) = h.trap(4, &[DATA as u32, 0]);
        assert_eq!(outcome, TrapOutcome::Exited(-1));
    }

    #[test]
    fn write_from_partially_unmapped_buffer_terminates() {
        let mut h = Harness::new();
        // Buffer straddles the end of the data page into unmapped space.
        let buf = DATA + crate::mm::address::PAGE_SIZE - 2;
        h.proc.aspace.store(VirtAddr::new(buf), b"ab");
        let (outcome, _) = h.trap(9, &[1, buf as u32, 8]);
        assert_eq!(outcome, TrapOutcome::Exited(-1));
    }
}
