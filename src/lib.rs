//! Revocation evidence extraction and oracle invocation for TLS chain
//! verification.
//!
//! After the TLS stack has validated a certificate chain, [`verify_chain`]
//! pulls revocation evidence out of it (serial, issuer key hash, embedded
//! SCTs), asks a [`RevocationOracle`] about it and turns the answer into an
//! accept/reject decision. Anything short of an explicit non-revoked answer
//! rejects the chain.
//!
//! ```no_run
//! use revocheck::{verify_chain, ArgumentOracle, OracleCommand};
//!
//! # fn chain_from_tls_stack() -> Vec<Vec<u8>> { Vec::new() }
//! let oracle = ArgumentOracle::new(OracleCommand::default());
//! let ders = chain_from_tls_stack();
//! match verify_chain(&oracle, &ders) {
//!     Ok(verdict) => println!("accepted: {}", verdict),
//!     Err(reason) => eprintln!("rejected: {}", reason),
//! }
//! ```

pub mod certificate;
pub mod config;
pub mod error;
pub mod evidence;
pub mod logging;
pub mod oracle;
pub mod sct;
pub mod tls;
pub mod verdict;

#[cfg(test)]
pub(crate) mod testutil;

use tracing::info;

pub use certificate::{Certificate, Chain, Extension};
pub use error::{RevocationError, TransportFailure};
pub use evidence::Evidence;
pub use oracle::{
    ArgumentOracle, InProcessOracle, OracleBinding, OracleCommand, RevocationOracle, StdinOracle,
    StreamTarget,
};
pub use sct::Sct;
pub use verdict::{resolve, Verdict};

/// Verification callback body: parse the verified chain, consult the oracle,
/// apply the fail-closed policy.
///
/// `ders` is the chain as the TLS stack verified it, end-entity first.
pub fn verify_chain<B: AsRef<[u8]>>(
    oracle: &dyn RevocationOracle,
    ders: &[B],
) -> Result<Verdict, RevocationError> {
    let chain = Chain::from_ders(ders)?;
    check_chain(oracle, &chain)
}

/// [`verify_chain`] for an already parsed chain.
pub fn check_chain(
    oracle: &dyn RevocationOracle,
    chain: &Chain,
) -> Result<Verdict, RevocationError> {
    info!(oracle = oracle.name(), "Certificate chain has {} certificate(s)", chain.len());
    for (index, cert) in chain.iter().enumerate() {
        info!("  [{}] {}", index, cert.common_name().unwrap_or("<no common name>"));
    }
    resolve(oracle.check(chain))
}
