//! Revocation oracle invocation.
//!
//! Every binding implements [`RevocationOracle`]; callers depend only on the
//! trait. Bindings turn their own transport outcome (FFI result code, process
//! exit status) into a [`Verdict`] and never coerce an unknown answer to `Ok`.
//!
//! # Submodules
//!
//! - `ffi` - in-process library call over borrowed DER buffers
//! - `process` - `revocation-check` subprocess, argument and stdin modes

pub mod ffi;
pub mod process;

use strum_macros::{Display, EnumString};

use crate::certificate::Chain;
use crate::error::RevocationError;
use crate::verdict::Verdict;

pub use ffi::{CertificateDer, CheckRevocationFn, DerLoan, InProcessOracle, ReleaseFn};
pub use process::{ArgumentOracle, OracleCommand, StdinOracle, StreamTarget};

/// Anything that can evaluate a verified chain and answer with a verdict.
///
/// Implementations are stateless per call, so concurrent handshakes may
/// share one oracle.
pub trait RevocationOracle: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Evidence errors come back as `Err`; transport problems as
    /// `Ok(Verdict::TransportError(_))`.
    fn check(&self, chain: &Chain) -> Result<Verdict, RevocationError>;
}

/// Selects an oracle binding by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OracleBinding {
    /// In-process library call
    Ffi,
    /// Subprocess with evidence on the command line
    Detail,
    /// Subprocess with PEM certificates on stdin
    High,
}

/// Builds the oracle for `binding`. The subprocess bindings share `command`.
pub fn build(
    binding: OracleBinding,
    command: OracleCommand,
) -> Result<Box<dyn RevocationOracle>, RevocationError> {
    Ok(match binding {
        OracleBinding::Ffi => Box::new(InProcessOracle::linked()?),
        OracleBinding::Detail => Box::new(ArgumentOracle::new(command)),
        OracleBinding::High => Box::new(StdinOracle::new(command)),
    })
}
