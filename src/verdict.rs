//! Oracle verdicts and the fail-closed resolution policy.

use strum_macros::{Display, IntoStaticStr};
use tracing::{info, warn};

use crate::error::{RevocationError, TransportFailure};

/// Result codes shared by every oracle binding.
pub mod code {
    pub const OK: i32 = 0;
    pub const NOT_COVERED: i32 = 1;
    pub const REVOKED: i32 = 2;
    pub const NOT_REVOKED: i32 = 3;
}

/// Answer from one oracle invocation.
#[derive(Debug, Display, IntoStaticStr)]
pub enum Verdict {
    #[strum(serialize = "ok")]
    Ok,
    #[strum(serialize = "not covered")]
    NotCovered,
    #[strum(serialize = "revoked")]
    Revoked,
    #[strum(serialize = "not revoked")]
    NotRevoked,
    #[strum(serialize = "transport error")]
    TransportError(TransportFailure),
}

impl Verdict {
    /// Maps an oracle result code. Unknown codes are transport errors.
    pub fn from_code(result: i32) -> Verdict {
        match result {
            code::OK => Verdict::Ok,
            code::NOT_COVERED => Verdict::NotCovered,
            code::REVOKED => Verdict::Revoked,
            code::NOT_REVOKED => Verdict::NotRevoked,
            other => Verdict::TransportError(TransportFailure::ResultCode(other)),
        }
    }

    /// Whether the handshake may proceed on this verdict.
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Verdict::Ok | Verdict::NotCovered | Verdict::NotRevoked)
    }

    /// Stable label, used for metrics and JSON output.
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// Turns an oracle outcome into an accept (the verdict) or a reject (the
/// reason). Anything other than an explicit non-revoked answer rejects.
pub fn resolve(outcome: Result<Verdict, RevocationError>) -> Result<Verdict, RevocationError> {
    match outcome {
        Ok(verdict) if verdict.is_acceptable() => {
            info!("Revocation check: {}", verdict);
            Ok(verdict)
        }
        Ok(Verdict::TransportError(failure)) => {
            warn!(code = ?failure.code(), "Revocation check failed: {}", failure);
            Err(RevocationError::Transport(failure))
        }
        Ok(_) => {
            warn!("Revocation check: revoked");
            Err(RevocationError::Revoked)
        }
        Err(err) => {
            warn!("Revocation check rejected chain: {}", err);
            Err(err)
        }
    }
}
