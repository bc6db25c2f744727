//! In-memory operating system for running userland code on the host.
//!
//! Processes run synchronously: `fork` runs the child's body to completion
//! before returning to the parent, and `exec` runs a registered program in
//! place and returns its exit status. Exited children queue up for `wait`
//! in exit order. Everything observable is recorded as [`Event`]s.
//!
//! Two simplifications follow from running children to completion: reading
//! an empty pipe returns end of input, and reading a console with no
//! scripted input left returns end of input.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::ffi::CString;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::ffi::CStr;

use konsoli_common::console::CONSOLE_MAJOR;
use konsoli_common::fcntl::OpenFlags;
use konsoli_common::SysError;

use crate::system::{Fd, Pid, System};

/// Descriptor table size of a simulated process.
pub const NOFILE: usize = 16;

/// Pid of the first process; orphans are handed to it.
pub const INIT_PID: Pid = Pid(1);

/// A program that can be exec'd by name.
pub type Program = Rc<dyn Fn(&mut SimSystem, &[&CStr]) -> i32>;

/// What a descriptor refers to, as seen from a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdTarget {
    /// A regular file, by absolute path.
    File(String),
    /// A console device, by minor number.
    Console(u16),
    /// Read end of pipe `n`.
    PipeRead(usize),
    /// Write end of pipe `n`.
    PipeWrite(usize),
}

/// Something that happened in the simulated system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `parent` forked `child`.
    Fork {
        /// The forking process.
        parent: Pid,
        /// The new process.
        child: Pid,
    },
    /// `pid` exec'd a program.
    Exec {
        /// The process.
        pid: Pid,
        /// Argument vector, program name first.
        argv: Vec<String>,
        /// Descriptor table at the time of the exec.
        fds: Vec<Option<FdTarget>>,
    },
    /// `pid` exited.
    Exit {
        /// The process.
        pid: Pid,
        /// Its exit status.
        status: i32,
    },
    /// `pid` called wait.
    Wait {
        /// The waiting process.
        pid: Pid,
        /// The reaped child, if there was one.
        reaped: Option<Pid>,
    },
}

#[derive(Debug)]
enum Node {
    Dir,
    File(Vec<u8>),
    Device { major: u16, minor: u16 },
}

#[derive(Debug)]
enum Object {
    File { path: String, offset: usize },
    Console(u16),
    PipeRead(usize),
    PipeWrite(usize),
}

#[derive(Debug)]
struct OpenFile {
    object: Object,
    flags: OpenFlags,
    refs: usize,
}

#[derive(Debug, Default)]
struct Pipe {
    buf: VecDeque<u8>,
}

#[derive(Debug)]
struct Process {
    fds: [Option<usize>; NOFILE],
    cwd: String,
    exited_children: VecDeque<Pid>,
    status: Option<i32>,
}

impl Process {
    fn new(cwd: String) -> Self {
        Self {
            fds: [None; NOFILE],
            cwd,
            exited_children: VecDeque::new(),
            status: None,
        }
    }
}

#[derive(Debug, Default)]
struct ConsoleIo {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

/// The simulated operating system.
pub struct SimSystem {
    nodes: BTreeMap<String, Node>,
    files: Vec<Option<OpenFile>>,
    pipes: Vec<Pipe>,
    consoles: BTreeMap<u16, ConsoleIo>,
    programs: BTreeMap<String, Program>,
    procs: BTreeMap<Pid, Process>,
    current: Pid,
    next_pid: i32,
    forks_left: Option<usize>,
    events: Vec<Event>,
}

impl Default for SimSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SimSystem {
    /// A system with an empty root directory, running [`INIT_PID`] with no
    /// descriptors open.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        let mut procs = BTreeMap::new();
        procs.insert(INIT_PID, Process::new("/".to_string()));
        Self {
            nodes,
            files: Vec::new(),
            pipes: Vec::new(),
            consoles: BTreeMap::new(),
            programs: BTreeMap::new(),
            procs,
            current: INIT_PID,
            next_pid: INIT_PID.0 + 1,
            forks_left: None,
            events: Vec::new(),
        }
    }

    /// Registers `program` under `name` for `exec`.
    pub fn add_program<F>(&mut self, name: &str, program: F)
    where
        F: Fn(&mut SimSystem, &[&CStr]) -> i32 + 'static,
    {
        self.programs.insert(name.to_string(), Rc::new(program));
    }

    /// Creates a directory.
    pub fn add_dir(&mut self, path: &str) {
        self.nodes.insert(path.to_string(), Node::Dir);
    }

    /// Creates or replaces a regular file.
    pub fn add_file(&mut self, path: &str, contents: &[u8]) {
        self.nodes.insert(path.to_string(), Node::File(contents.to_vec()));
    }

    /// Contents of a regular file.
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(path) {
            Some(Node::File(data)) => Some(data),
            _ => None,
        }
    }

    /// Whether `path` exists.
    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// Queues bytes to be read from console `minor`.
    pub fn push_input(&mut self, minor: u16, bytes: &[u8]) {
        self.consoles.entry(minor).or_default().input.extend(bytes);
    }

    /// Everything written to console `minor` so far.
    pub fn console_output(&self, minor: u16) -> Vec<u8> {
        self.consoles
            .get(&minor)
            .map(|io| io.output.clone())
            .unwrap_or_default()
    }

    /// Makes the console node for `minor` (if absent) and opens it
    /// read/write in the current process.
    pub fn attach_console(&mut self, minor: u16) -> Fd {
        let path = alloc::format!("/console{minor}");
        self.nodes.entry(path.clone()).or_insert(Node::Device {
            major: CONSOLE_MAJOR,
            minor,
        });
        let handle = self.new_file(Object::Console(minor), OpenFlags::RDWR);
        match self.install(handle) {
            Ok(fd) => fd,
            Err(_) => panic!("descriptor table full"),
        }
    }

    /// Lets `n` more forks succeed; later ones fail.
    pub fn fail_forks_after(&mut self, n: usize) {
        self.forks_left = Some(n);
    }

    /// The running process.
    pub fn current(&self) -> Pid {
        self.current
    }

    /// Working directory of `pid`.
    pub fn cwd(&self, pid: Pid) -> Option<&str> {
        self.procs.get(&pid).map(|p| p.cwd.as_str())
    }

    /// Exit status of `pid`, once it has exited.
    pub fn exit_status(&self, pid: Pid) -> Option<i32> {
        self.procs.get(&pid).and_then(|p| p.status)
    }

    /// Everything recorded so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Argument vectors of every exec, in order.
    pub fn execs(&self) -> Vec<Vec<String>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Exec { argv, .. } => Some(argv.clone()),
                _ => None,
            })
            .collect()
    }

    /// Descriptor table of the current process.
    pub fn fds(&self) -> Vec<Option<FdTarget>> {
        self.fd_snapshot(self.current)
    }

    fn fd_snapshot(&self, pid: Pid) -> Vec<Option<FdTarget>> {
        let Some(proc) = self.procs.get(&pid) else {
            return Vec::new();
        };
        proc.fds
            .iter()
            .map(|slot| {
                let file = slot.and_then(|h| self.files[h].as_ref())?;
                Some(match &file.object {
                    Object::File { path, .. } => FdTarget::File(path.clone()),
                    Object::Console(minor) => FdTarget::Console(*minor),
                    Object::PipeRead(id) => FdTarget::PipeRead(*id),
                    Object::PipeWrite(id) => FdTarget::PipeWrite(*id),
                })
            })
            .collect()
    }

    fn proc_mut(&mut self) -> &mut Process {
        match self.procs.get_mut(&self.current) {
            Some(proc) => proc,
            None => panic!("no current process"),
        }
    }

    fn resolve(&self, path: &CStr) -> Result<String, SysError> {
        let path = path.to_str().map_err(|_| SysError::InvalidArgument)?;
        if path.starts_with('/') {
            return Ok(path.to_string());
        }
        let cwd = self.procs.get(&self.current).map_or("/", |p| p.cwd.as_str());
        if cwd.ends_with('/') {
            Ok(alloc::format!("{cwd}{path}"))
        } else {
            Ok(alloc::format!("{cwd}/{path}"))
        }
    }

    fn new_file(&mut self, object: Object, flags: OpenFlags) -> usize {
        let file = OpenFile {
            object,
            flags,
            refs: 1,
        };
        match self.files.iter().position(Option::is_none) {
            Some(handle) => {
                self.files[handle] = Some(file);
                handle
            }
            None => {
                self.files.push(Some(file));
                self.files.len() - 1
            }
        }
    }

    /// Puts `handle` on the lowest free descriptor.
    fn install(&mut self, handle: usize) -> Result<Fd, SysError> {
        let proc = self.proc_mut();
        match proc.fds.iter().position(Option::is_none) {
            Some(fd) => {
                proc.fds[fd] = Some(handle);
                Ok(fd as Fd)
            }
            None => {
                self.release(handle);
                Err(SysError::TooManyOpen)
            }
        }
    }

    fn release(&mut self, handle: usize) {
        if let Some(file) = self.files[handle].as_mut() {
            file.refs -= 1;
            if file.refs == 0 {
                self.files[handle] = None;
            }
        }
    }

    fn handle(&self, fd: Fd) -> Result<usize, SysError> {
        usize::try_from(fd)
            .ok()
            .and_then(|fd| self.procs.get(&self.current)?.fds.get(fd).copied().flatten())
            .ok_or(SysError::BadDescriptor)
    }

    fn exit_current(&mut self, status: i32) {
        let pid = self.current;
        let (fds, orphans) = {
            let proc = self.proc_mut();
            proc.status = Some(status);
            let fds = core::mem::replace(&mut proc.fds, [None; NOFILE]);
            (fds, core::mem::take(&mut proc.exited_children))
        };
        for handle in fds.into_iter().flatten() {
            self.release(handle);
        }
        if let Some(init) = self.procs.get_mut(&INIT_PID) {
            init.exited_children.extend(orphans);
        }
        self.events.push(Event::Exit { pid, status });
    }
}

impl System for SimSystem {
    fn fork<F>(&mut self, child: F) -> Result<Pid, SysError>
    where
        F: FnOnce(&mut Self) -> i32,
    {
        if let Some(left) = self.forks_left.as_mut() {
            if *left == 0 {
                return Err(SysError::TooManyOpen);
            }
            *left -= 1;
        }
        let parent = self.current;
        let pid = Pid(self.next_pid);
        self.next_pid += 1;

        let (fds, cwd) = {
            let proc = self.proc_mut();
            (proc.fds, proc.cwd.clone())
        };
        for handle in fds.iter().flatten() {
            if let Some(file) = self.files[*handle].as_mut() {
                file.refs += 1;
            }
        }
        let mut process = Process::new(cwd);
        process.fds = fds;
        self.procs.insert(pid, process);
        self.events.push(Event::Fork { parent, child: pid });

        self.current = pid;
        let status = child(self);
        self.exit_current(status);
        self.current = parent;
        self.proc_mut().exited_children.push_back(pid);
        Ok(pid)
    }

    fn exec(&mut self, path: &CStr, argv: &[&CStr]) -> Result<i32, SysError> {
        let name = path.to_str().map_err(|_| SysError::NotFound)?;
        let program = self.programs.get(name).cloned().ok_or(SysError::NotFound)?;
        self.events.push(Event::Exec {
            pid: self.current,
            argv: argv
                .iter()
                .map(|a| String::from_utf8_lossy(a.to_bytes()).into_owned())
                .collect(),
            fds: self.fd_snapshot(self.current),
        });
        // The program sees its own copy of argv, as after a real exec.
        let owned: Vec<CString> = argv.iter().map(|a| CString::from(*a)).collect();
        let args: Vec<&CStr> = owned.iter().map(CString::as_c_str).collect();
        Ok((*program)(self, &args))
    }

    fn wait(&mut self) -> Result<Pid, SysError> {
        let pid = self.current;
        let reaped = self.proc_mut().exited_children.pop_front();
        self.events.push(Event::Wait { pid, reaped });
        reaped.ok_or(SysError::NoChild)
    }

    fn pipe(&mut self) -> Result<(Fd, Fd), SysError> {
        self.pipes.push(Pipe::default());
        let id = self.pipes.len() - 1;
        let read = self.new_file(Object::PipeRead(id), OpenFlags::RDONLY);
        let read_fd = self.install(read)?;
        let write = self.new_file(Object::PipeWrite(id), OpenFlags::WRONLY);
        match self.install(write) {
            Ok(write_fd) => Ok((read_fd, write_fd)),
            Err(err) => {
                let _ = self.close(read_fd);
                Err(err)
            }
        }
    }

    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, SysError> {
        let handle = self.handle(fd)?;
        let Some(file) = self.files[handle].as_mut() else {
            return Err(SysError::BadDescriptor);
        };
        if !file.flags.readable() {
            return Err(SysError::BadDescriptor);
        }
        match &mut file.object {
            Object::File { path, offset } => {
                let Some(Node::File(data)) = self.nodes.get(path.as_str()) else {
                    return Err(SysError::NotFound);
                };
                let start = (*offset).min(data.len());
                let n = buf.len().min(data.len() - start);
                buf[..n].copy_from_slice(&data[start..start + n]);
                *offset += n;
                Ok(n)
            }
            Object::Console(minor) => {
                let io = self.consoles.entry(*minor).or_default();
                let mut n = 0;
                while n < buf.len() {
                    let Some(c) = io.input.pop_front() else { break };
                    buf[n] = c;
                    n += 1;
                    if c == b'\n' {
                        break;
                    }
                }
                Ok(n)
            }
            Object::PipeRead(id) => {
                let pipe = &mut self.pipes[*id];
                let n = buf.len().min(pipe.buf.len());
                for (slot, c) in buf.iter_mut().zip(pipe.buf.drain(..n)) {
                    *slot = c;
                }
                Ok(n)
            }
            Object::PipeWrite(_) => Err(SysError::BadDescriptor),
        }
    }

    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize, SysError> {
        let handle = self.handle(fd)?;
        let Some(file) = self.files[handle].as_mut() else {
            return Err(SysError::BadDescriptor);
        };
        if !file.flags.writable() {
            return Err(SysError::BadDescriptor);
        }
        match &mut file.object {
            Object::File { path, offset } => {
                let Some(Node::File(data)) = self.nodes.get_mut(path.as_str()) else {
                    return Err(SysError::NotFound);
                };
                // Overwrites in place; opening never truncates.
                let end = *offset + buf.len();
                if data.len() < end {
                    data.resize(end, 0);
                }
                data[*offset..end].copy_from_slice(buf);
                *offset = end;
                Ok(buf.len())
            }
            Object::Console(minor) => {
                self.consoles.entry(*minor).or_default().output.extend_from_slice(buf);
                Ok(buf.len())
            }
            Object::PipeWrite(id) => {
                self.pipes[*id].buf.extend(buf);
                Ok(buf.len())
            }
            Object::PipeRead(_) => Err(SysError::BadDescriptor),
        }
    }

    fn open(&mut self, path: &CStr, flags: OpenFlags) -> Result<Fd, SysError> {
        let path = self.resolve(path)?;
        let object = match self.nodes.get(&path) {
            Some(Node::File(_)) => Object::File { path, offset: 0 },
            Some(Node::Device { minor, .. }) => Object::Console(*minor),
            Some(Node::Dir) => return Err(SysError::InvalidArgument),
            None if flags.contains(OpenFlags::CREATE) => {
                self.nodes.insert(path.clone(), Node::File(Vec::new()));
                Object::File { path, offset: 0 }
            }
            None => return Err(SysError::NotFound),
        };
        let handle = self.new_file(object, flags);
        self.install(handle)
    }

    fn close(&mut self, fd: Fd) -> Result<(), SysError> {
        let handle = self.handle(fd)?;
        self.proc_mut().fds[fd as usize] = None;
        self.release(handle);
        Ok(())
    }

    fn dup(&mut self, fd: Fd) -> Result<Fd, SysError> {
        let handle = self.handle(fd)?;
        if let Some(file) = self.files[handle].as_mut() {
            file.refs += 1;
        }
        self.install(handle)
    }

    fn mknod(&mut self, path: &CStr, major: u16, minor: u16) -> Result<(), SysError> {
        let path = self.resolve(path)?;
        if self.nodes.contains_key(&path) {
            return Err(SysError::Exists);
        }
        self.nodes.insert(path, Node::Device { major, minor });
        Ok(())
    }

    fn chdir(&mut self, path: &CStr) -> Result<(), SysError> {
        let path = self.resolve(path)?;
        match self.nodes.get(&path) {
            Some(Node::Dir) => {
                self.proc_mut().cwd = path;
                Ok(())
            }
            Some(_) => Err(SysError::InvalidArgument),
            None => Err(SysError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_runs_child_and_queues_it_for_wait() {
        let mut sys = SimSystem::new();
        let child = sys.fork(|sys| {
            assert_eq!(sys.current(), Pid(2));
            7
        });
        assert_eq!(child, Ok(Pid(2)));
        assert_eq!(sys.current(), INIT_PID);
        assert_eq!(sys.exit_status(Pid(2)), Some(7));
        assert_eq!(sys.wait(), Ok(Pid(2)));
        assert_eq!(sys.wait(), Err(SysError::NoChild));
    }

    #[test]
    fn test_descriptors_are_inherited_and_lowest_free() {
        let mut sys = SimSystem::new();
        let fd = sys.attach_console(2);
        assert_eq!(fd, 0);
        assert_eq!(sys.dup(0), Ok(1));
        sys.fork(|sys| {
            assert_eq!(sys.close(0), Ok(()));
            assert_eq!(sys.write(1, b"child\n"), Ok(6));
            assert_eq!(sys.fds()[..2], [None, Some(FdTarget::Console(2))]);
            0
        })
        .unwrap();
        assert_eq!(sys.fds()[0], Some(FdTarget::Console(2)));
        assert_eq!(sys.console_output(2), b"child\n");
    }

    #[test]
    fn test_files_create_and_overwrite_without_truncating() {
        let mut sys = SimSystem::new();
        sys.add_file("/notes", b"0123456789");
        let fd = sys.open(c"notes", OpenFlags::WRONLY).unwrap();
        sys.write(fd, b"ab").unwrap();
        assert_eq!(sys.file("/notes"), Some(&b"ab23456789"[..]));

        assert_eq!(sys.open(c"missing", OpenFlags::RDONLY), Err(SysError::NotFound));
        let fd = sys.open(c"new", OpenFlags::WRONLY | OpenFlags::CREATE).unwrap();
        assert_eq!(sys.read(fd, &mut [0u8; 4]), Err(SysError::BadDescriptor));
        sys.write(fd, b"x").unwrap();
        assert_eq!(sys.file("/new"), Some(&b"x"[..]));
    }

    #[test]
    fn test_pipe_carries_bytes() {
        let mut sys = SimSystem::new();
        let (r, w) = sys.pipe().unwrap();
        assert_eq!((r, w), (0, 1));
        sys.write(w, b"hello").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(sys.read(r, &mut buf), Ok(5));
        assert_eq!(sys.read(r, &mut buf), Ok(0));
    }

    #[test]
    fn test_exec_runs_program_and_records_it() {
        let mut sys = SimSystem::new();
        sys.add_program("true", |_, argv| argv.len() as i32);
        assert_eq!(sys.exec(c"true", &[c"true", c"x"]), Ok(2));
        assert_eq!(sys.exec(c"false", &[c"false"]), Err(SysError::NotFound));
        assert_eq!(sys.execs(), vec![vec!["true".to_string(), "x".to_string()]]);
    }

    #[test]
    fn test_orphans_go_to_init() {
        let mut sys = SimSystem::new();
        let shell = sys
            .fork(|sys| {
                sys.fork(|_| 0).unwrap();
                0
            })
            .unwrap();
        // The grandchild exited first and was never reaped by its parent.
        assert_eq!(sys.wait(), Ok(Pid(3)));
        assert_eq!(sys.wait(), Ok(shell));
    }

    #[test]
    fn test_mknod_and_chdir() {
        let mut sys = SimSystem::new();
        assert_eq!(sys.mknod(c"console1", CONSOLE_MAJOR, 1), Ok(()));
        assert_eq!(sys.mknod(c"console1", CONSOLE_MAJOR, 1), Err(SysError::Exists));
        assert_eq!(sys.open(c"/console1", OpenFlags::RDWR), Ok(0));

        sys.add_dir("/tmp");
        assert_eq!(sys.chdir(c"/tmp"), Ok(()));
        assert_eq!(sys.cwd(INIT_PID), Some("/tmp"));
        assert_eq!(sys.chdir(c"nowhere"), Err(SysError::NotFound));
    }

    #[test]
    fn test_fork_failure() {
        let mut sys = SimSystem::new();
        sys.fail_forks_after(1);
        assert!(sys.fork(|_| 0).is_ok());
        assert_eq!(sys.fork(|_| 0), Err(SysError::TooManyOpen));
    }
}
