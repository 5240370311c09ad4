//! Process isolation using fork(2).
//!
//! Each test runs body and teardown in a child process. The child reports
//! its verdict through a reserved exit status and sends two records back
//! through a pipe: the body's verdict and diagnostic, then the teardown
//! fault. Anything else (a signal, a foreign exit status) is a crash.
//!
//! A child that crashes before sending its verdict record never reached
//! teardown; the parent then tears down its own post-setup copy of the
//! fixture instance.

use std::fs::File;
use std::io::{self, Read, Write};
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::thread;
use std::time::{Duration, Instant};

use libc::{c_int, pid_t};

use super::{
    contain, contain_teardown, flush_std_streams, DiagnosticChannel, Fault, IsolatedRun, Outcome,
    Sandbox, SandboxError, SandboxReport, Teardown, Verdict, DEFAULT_CAPACITY,
};

/// Child exit status: body returned normally.
pub const EXIT_PASSED: i32 = 0;
/// Child exit status: an assertion halted the body.
pub const EXIT_FAILED: i32 = 86;
/// Child exit status: a skip directive halted the body.
pub const EXIT_SKIPPED: i32 = 87;
/// Child exit status: the body panicked.
pub const EXIT_PANICKED: i32 = 88;

const POLL_START: Duration = Duration::from_micros(200);
const POLL_MAX: Duration = Duration::from_millis(10);

const RECORD_VERDICT: u8 = b'V';
const RECORD_TEARDOWN: u8 = b'T';

/// Forks one child process per test.
#[derive(Debug, Default)]
pub struct ForkSandbox {
    timeout: Option<Duration>,
}

impl ForkSandbox {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Sandbox for ForkSandbox {
    fn name(&self) -> &'static str {
        "fork"
    }

    fn execute(
        &self,
        run: &mut dyn IsolatedRun,
        channel: &mut DiagnosticChannel,
    ) -> Result<SandboxReport, SandboxError> {
        let (mut reader, writer) = open_pipe().map_err(SandboxError::Channel)?;

        flush_std_streams();

        // SAFETY: the child only runs the test and then leaves through _exit.
        let pid = unsafe { libc::fork() };
        if pid < 0 {
            return Err(SandboxError::Spawn(io::Error::last_os_error()));
        }
        if pid == 0 {
            drop(reader);
            run_child(run, channel.capacity(), writer);
        }
        drop(writer);
        tracing::trace!(pid, "forked test process");

        let (exit, usage) = match self.timeout {
            None => {
                let (status, usage) = wait_blocking(pid)?;
                (classify(status), usage)
            }
            Some(limit) => match wait_until(pid, Instant::now() + limit)? {
                Some((status, usage)) => (classify(status), usage),
                None => {
                    // SAFETY: pid is our unreaped child.
                    unsafe { libc::kill(pid, libc::SIGKILL) };
                    let (_, usage) = wait_blocking(pid)?;
                    tracing::debug!(pid, "killed test process at deadline");
                    (Outcome::Crashed(Fault::TimedOut(limit)), usage)
                }
            },
        };

        let bytes = drain(&mut reader).map_err(SandboxError::Channel)?;
        let (outcome, teardown) = resolve(exit, decode(&bytes), channel);

        Ok(SandboxReport {
            outcome,
            cpu_time: Some(cpu_time(&usage)),
            teardown,
        })
    }
}

/// CPU time consumed so far by the calling process.
pub(super) fn self_cpu_time() -> Option<Duration> {
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { mem::zeroed() };
    // SAFETY: usage is valid for writes.
    if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) } != 0 {
        return None;
    }
    Some(cpu_time(&usage))
}

/// Child side: run body and teardown, ship both records, exit with the
/// verdict code.
///
/// Only raw descriptor writes happen here. The std stream locks may have
/// been held by another parent thread at fork time.
fn run_child(run: &mut dyn IsolatedRun, capacity: usize, mut writer: File) -> ! {
    let mut channel = DiagnosticChannel::with_capacity(capacity);
    let verdict = contain(&mut || run.run_body(), &mut channel);
    // Both records together stay under the pipe buffer, so writes never block.
    let _ = writer.write_all(&encode_verdict(verdict, channel.as_bytes()));

    let fault = contain_teardown(run);
    let _ = writer.write_all(&encode_teardown(fault.as_deref()));
    drop(writer);

    // SAFETY: _exit skips destructors and atexit handlers owned by the parent.
    unsafe { libc::_exit(exit_code(verdict)) }
}

fn exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Passed => EXIT_PASSED,
        Verdict::Failed => EXIT_FAILED,
        Verdict::Skipped => EXIT_SKIPPED,
        Verdict::Panicked => EXIT_PANICKED,
    }
}

fn verdict_from_code(code: i32) -> Option<Verdict> {
    match code {
        EXIT_PASSED => Some(Verdict::Passed),
        EXIT_FAILED => Some(Verdict::Failed),
        EXIT_SKIPPED => Some(Verdict::Skipped),
        EXIT_PANICKED => Some(Verdict::Panicked),
        _ => None,
    }
}

fn encode_verdict(verdict: Verdict, diagnostic: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(diagnostic.len() + 6);
    record.push(RECORD_VERDICT);
    record.push(exit_code(verdict) as u8);
    record.extend_from_slice(&(diagnostic.len() as u32).to_le_bytes());
    record.extend_from_slice(diagnostic);
    record
}

fn encode_teardown(fault: Option<&str>) -> Vec<u8> {
    let mut bounded = DiagnosticChannel::with_capacity(DEFAULT_CAPACITY);
    if let Some(fault) = fault {
        bounded.write(fault);
    }
    let bytes = bounded.as_bytes();
    let mut record = Vec::with_capacity(bytes.len() + 5);
    record.push(RECORD_TEARDOWN);
    record.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    record.extend_from_slice(bytes);
    record
}

/// What the child managed to send before it ended.
#[derive(Debug, Default, PartialEq, Eq)]
struct ChildRecords {
    verdict: Option<(Verdict, Vec<u8>)>,
    /// `Some` once teardown finished; the inner value is its fault.
    teardown: Option<Option<String>>,
}

/// Decode complete records, ignoring a truncated or unknown tail.
fn decode(mut bytes: &[u8]) -> ChildRecords {
    let mut records = ChildRecords::default();
    while let Some((&kind, rest)) = bytes.split_first() {
        let (code, rest) = match kind {
            RECORD_VERDICT => match rest.split_first() {
                Some((&code, rest)) => (Some(code), rest),
                None => break,
            },
            RECORD_TEARDOWN => (None, rest),
            _ => break,
        };
        let Some((payload, rest)) = split_payload(rest) else {
            break;
        };
        match code {
            Some(code) => match verdict_from_code(i32::from(code)) {
                Some(verdict) => records.verdict = Some((verdict, payload.to_vec())),
                None => break,
            },
            None => {
                records.teardown = Some(if payload.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(payload).into_owned())
                });
            }
        }
        bytes = rest;
    }
    records
}

fn split_payload(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    if bytes.len() < 4 {
        return None;
    }
    let (len, rest) = bytes.split_at(4);
    let len = u32::from_le_bytes(len.try_into().ok()?) as usize;
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

/// Combine the exit classification with the records the child sent.
///
/// A verdict record means the body finished under its own control, so the
/// verdict stands even if the child died later, during teardown.
fn resolve(
    exit: Outcome,
    records: ChildRecords,
    channel: &mut DiagnosticChannel,
) -> (Outcome, Teardown) {
    let Some((verdict, diagnostic)) = records.verdict else {
        return (exit, Teardown::Pending);
    };
    channel.receive(&diagnostic);
    let fault = match (records.teardown, exit) {
        (Some(fault), _) => fault,
        (None, Outcome::Crashed(fault)) => Some(format!("teardown did not finish: {}", fault)),
        (None, Outcome::Completed(_)) => Some("teardown did not report a result".to_string()),
    };
    (Outcome::Completed(verdict), Teardown::Done(fault))
}

fn classify(status: c_int) -> Outcome {
    if libc::WIFEXITED(status) {
        let code = libc::WEXITSTATUS(status);
        match verdict_from_code(code) {
            Some(verdict) => Outcome::Completed(verdict),
            None => Outcome::Crashed(Fault::UnexpectedExit(code)),
        }
    } else if libc::WIFSIGNALED(status) {
        let number = libc::WTERMSIG(status);
        Outcome::Crashed(Fault::Signal {
            number,
            name: signal_name(number),
        })
    } else {
        Outcome::Crashed(Fault::UnexpectedExit(status))
    }
}

fn signal_name(number: c_int) -> &'static str {
    match number {
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGBUS => "SIGBUS",
        libc::SIGABRT => "SIGABRT",
        libc::SIGFPE => "SIGFPE",
        libc::SIGILL => "SIGILL",
        libc::SIGTRAP => "SIGTRAP",
        libc::SIGSYS => "SIGSYS",
        libc::SIGKILL => "SIGKILL",
        libc::SIGTERM => "SIGTERM",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGHUP => "SIGHUP",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGALRM => "SIGALRM",
        libc::SIGUSR1 => "SIGUSR1",
        libc::SIGUSR2 => "SIGUSR2",
        libc::SIGXCPU => "SIGXCPU",
        libc::SIGXFSZ => "SIGXFSZ",
        _ => "unknown signal",
    }
}

fn wait_blocking(pid: pid_t) -> Result<(c_int, libc::rusage), SandboxError> {
    let mut status: c_int = 0;
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { mem::zeroed() };
    loop {
        // SAFETY: both out-pointers are valid for writes.
        let rc = unsafe { libc::wait4(pid, &mut status, 0, &mut usage) };
        if rc == pid {
            return Ok((status, usage));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(SandboxError::Wait(err));
        }
    }
}

/// Poll for the child until `deadline`. `None` means it is still running.
fn wait_until(
    pid: pid_t,
    deadline: Instant,
) -> Result<Option<(c_int, libc::rusage)>, SandboxError> {
    let mut status: c_int = 0;
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { mem::zeroed() };
    let mut backoff = POLL_START;
    loop {
        // SAFETY: both out-pointers are valid for writes.
        let rc = unsafe { libc::wait4(pid, &mut status, libc::WNOHANG, &mut usage) };
        if rc == pid {
            return Ok(Some((status, usage)));
        }
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(SandboxError::Wait(err));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(backoff.min(deadline - now));
        backoff = (backoff * 2).min(POLL_MAX);
    }
}

fn cpu_time(usage: &libc::rusage) -> Duration {
    timeval(&usage.ru_utime) + timeval(&usage.ru_stime)
}

fn timeval(tv: &libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

fn open_pipe() -> io::Result<(File, File)> {
    let mut fds: [c_int; 2] = [-1; 2];
    // SAFETY: fds has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe(2) just returned two fresh descriptors that nothing else owns.
    let (reader, writer) = unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) };
    set_cloexec(reader.as_raw_fd())?;
    set_cloexec(writer.as_raw_fd())?;
    Ok((reader, writer))
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd is an open descriptor owned by the caller.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd is an open descriptor owned by the caller.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Read whatever the child left in the pipe.
///
/// Non-blocking: a grandchild holding the write end must not stall the run.
fn drain(reader: &mut File) -> io::Result<Vec<u8>> {
    set_nonblocking(reader.as_raw_fd())?;
    let mut bytes = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => bytes.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(bytes)
}
