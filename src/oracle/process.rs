//! Oracle run as a `revocation-check` subprocess.
//!
//! Two modes share one launcher:
//!
//! - `detail`: `revocation-check detail <serial> <issuer-key-hash> [logId:ts ...]`
//! - `high`: `revocation-check high` with the end-entity and issuer as PEM on stdin
//!
//! Exit status 0 is `Ok`, any other status is a transport error carrying the
//! code. The oracle's own stdout/stderr go wherever [`OracleCommand`] says.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::certificate::Chain;
use crate::error::{RevocationError, TransportFailure};
use crate::evidence::Evidence;
use crate::oracle::RevocationOracle;
use crate::verdict::Verdict;

pub const DEFAULT_PROGRAM: &str = "revocation-check";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where an oracle output stream goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StreamTarget {
    /// Share this process's stream
    #[default]
    Inherit,
    /// Discard
    Null,
    /// Append to a file
    File(PathBuf),
}

impl StreamTarget {
    fn to_stdio(&self) -> io::Result<Stdio> {
        Ok(match self {
            StreamTarget::Inherit => Stdio::inherit(),
            StreamTarget::Null => Stdio::null(),
            StreamTarget::File(path) => Stdio::from(
                OpenOptions::new().create(true).append(true).open(path)?,
            ),
        })
    }
}

/// How to launch the oracle process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCommand {
    pub program: PathBuf,
    /// Inserted before the mode argument
    pub leading_args: Vec<String>,
    pub stdout: StreamTarget,
    pub stderr: StreamTarget,
    /// Kill the oracle and fail closed after this long
    pub timeout: Option<Duration>,
}

impl Default for OracleCommand {
    fn default() -> Self {
        OracleCommand::new(DEFAULT_PROGRAM)
    }
}

impl OracleCommand {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        OracleCommand {
            program: program.into(),
            leading_args: Vec::new(),
            stdout: StreamTarget::Inherit,
            stderr: StreamTarget::Inherit,
            timeout: None,
        }
    }

    fn prepare(&self, args: &[String], stdin: Stdio) -> io::Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(stdin)
            .stdout(self.stdout.to_stdio()?)
            .stderr(self.stderr.to_stdio()?);
        Ok(cmd)
    }

    fn spawn(&self, args: &[String], stdin: Stdio) -> Result<Child, TransportFailure> {
        let program = self.program.display().to_string();
        debug!(%program, ?args, "starting oracle process");
        let mut cmd = self
            .prepare(args, stdin)
            .map_err(|source| TransportFailure::Io { source })?;
        cmd.spawn()
            .map_err(|source| TransportFailure::Launch { program, source })
    }

    /// Runs the oracle to completion. With `input`, the bytes are written
    /// from a helper thread and stdin is closed once they are out. The
    /// timeout counts from launch, so it also bounds a stuck write.
    pub fn run(&self, args: &[String], input: Option<&[u8]>) -> Verdict {
        let stdin = if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = match self.spawn(args, stdin) {
            Ok(child) => child,
            Err(failure) => return Verdict::TransportError(failure),
        };

        let writer = input.map(|bytes| feed_stdin(&mut child, bytes.to_vec()));

        let status = match wait(&mut child, self.timeout) {
            Ok(status) => status,
            // the writer sees a closed pipe once the child is gone; not joined
            Err(failure) => return Verdict::TransportError(failure),
        };
        let written = match writer {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))
            }),
            None => Ok(()),
        };
        match written {
            Ok(()) => exit_verdict(status),
            Err(source) => {
                warn!(?status, "writing to oracle stdin failed: {}", source);
                Verdict::TransportError(TransportFailure::Io { source })
            }
        }
    }
}

// The pipe handle moves into the thread and is dropped when it returns,
// whether or not the write succeeded.
fn feed_stdin(child: &mut Child, bytes: Vec<u8>) -> JoinHandle<io::Result<()>> {
    let stdin = child.stdin.take();
    thread::spawn(move || {
        let mut stdin = stdin.ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "oracle stdin not captured")
        })?;
        stdin.write_all(&bytes)?;
        stdin.flush()
    })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, TransportFailure> {
    let io_failure = |source| TransportFailure::Io { source };
    let Some(limit) = timeout else {
        return child.wait().map_err(io_failure);
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().map_err(io_failure)? {
            return Ok(status);
        }
        let now = Instant::now();
        if now >= deadline {
            warn!(pid = child.id(), "oracle timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(TransportFailure::Timeout(limit));
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn exit_verdict(status: ExitStatus) -> Verdict {
    match status.code() {
        Some(0) => Verdict::Ok,
        Some(code) => Verdict::TransportError(TransportFailure::ExitCode(code)),
        None => Verdict::TransportError(TransportFailure::Terminated),
    }
}

/// `detail` mode: derived evidence as command arguments.
#[derive(Debug, Clone, Default)]
pub struct ArgumentOracle {
    command: OracleCommand,
}

impl ArgumentOracle {
    pub fn new(command: OracleCommand) -> Self {
        ArgumentOracle { command }
    }

    /// `detail <serial> <issuer-key-hash> [logId:ts ...]`
    pub fn command_args(chain: &Chain) -> Result<Vec<String>, RevocationError> {
        let evidence = Evidence::from_chain(chain)?;
        let mut args = vec!["detail".to_string(), evidence.serial.clone()];
        args.extend(evidence.issuer_key_hash.clone());
        args.extend(evidence.sct_strings());
        Ok(args)
    }
}

impl RevocationOracle for ArgumentOracle {
    fn name(&self) -> &'static str {
        "detail"
    }

    fn check(&self, chain: &Chain) -> Result<Verdict, RevocationError> {
        let args = Self::command_args(chain)?;
        Ok(self.command.run(&args, None))
    }
}

/// `high` mode: end-entity and issuer streamed as PEM on stdin.
#[derive(Debug, Clone, Default)]
pub struct StdinOracle {
    command: OracleCommand,
}

impl StdinOracle {
    pub fn new(command: OracleCommand) -> Self {
        StdinOracle { command }
    }

    /// End-entity then immediate issuer; the rest of the chain is not sent.
    pub fn pem_payload(chain: &Chain) -> Result<Vec<u8>, RevocationError> {
        let issuer = chain.require_issuer()?;
        let mut payload = chain.end_entity().to_pem()?;
        payload.extend(issuer.to_pem()?);
        Ok(payload)
    }
}

impl RevocationOracle for StdinOracle {
    fn name(&self) -> &'static str {
        "high"
    }

    fn check(&self, chain: &Chain) -> Result<Verdict, RevocationError> {
        let payload = Self::pem_payload(chain)?;
        Ok(self.command.run(&["high".to_string()], Some(&payload)))
    }
}
