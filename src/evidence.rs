//! Canonical identifiers handed to the revocation oracle.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openssl::sha::sha256;
use serde::Serialize;

use crate::certificate::{Certificate, Chain};
use crate::error::RevocationError;
use crate::sct::{extract_scts, Sct};

/// Revocation evidence for one chain. Built per verification, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    /// base64 of the end-entity serial, big-endian unsigned
    pub serial: String,
    /// base64(SHA-256(issuer SPKI)); absent for serial-only evidence
    pub issuer_key_hash: Option<String>,
    /// Embedded SCTs of the end-entity, in certificate order
    pub scts: Vec<Sct>,
}

impl Evidence {
    /// Full evidence. Needs the end-entity's immediate issuer at index 1.
    pub fn from_chain(chain: &Chain) -> Result<Evidence, RevocationError> {
        let issuer = chain.require_issuer()?;
        let mut evidence = Self::serial_only(chain)?;
        evidence.issuer_key_hash = Some(issuer_key_hash(issuer));
        Ok(evidence)
    }

    /// Evidence derivable from the end-entity alone.
    pub fn serial_only(chain: &Chain) -> Result<Evidence, RevocationError> {
        let leaf = chain.end_entity();
        Ok(Evidence {
            serial: STANDARD.encode(leaf.serial()),
            issuer_key_hash: None,
            scts: extract_scts(leaf)?,
        })
    }

    /// SCTs rendered as `logId:timestampMillis`.
    pub fn sct_strings(&self) -> Vec<String> {
        self.scts.iter().map(Sct::evidence_string).collect()
    }
}

/// Identifies the signing key rather than a particular issuer certificate,
/// so it is stable across reissuance of the issuer with the same key.
pub fn issuer_key_hash(issuer: &Certificate) -> String {
    STANDARD.encode(sha256(issuer.spki()))
}
