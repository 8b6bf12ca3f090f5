//! Embedded Signed Certificate Timestamp extraction.
//!
//! The extension `1.3.6.1.4.1.11129.2.4.2` carries an octet string whose
//! content is a TLS-encoded `SignedCertificateTimestampList` (RFC 6962 §3.3):
//!
//! ```text
//! u16 list_len
//!   u16 sct_len | version(1) log_id(32) timestamp(8) ...   (repeated)
//! ```
//!
//! Length prefixes are structural and a short buffer is an error. Individual
//! records shorter than the fixed 41-byte header are skipped: they belong to
//! SCT versions this parser does not understand.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, trace};
use x509_parser::der_parser::der::parse_der_octetstring;

use crate::certificate::Certificate;
use crate::error::RevocationError;

/// OID of the embedded SCT list extension.
pub const SCT_LIST_OID: &str = "1.3.6.1.4.1.11129.2.4.2";

/// version + log id + timestamp
pub const SCT_HEADER_LEN: usize = 41;

const LOG_ID_LEN: usize = 32;

/// A single decoded SCT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sct {
    pub version: u8,
    #[serde(serialize_with = "serialize_log_id")]
    pub log_id: [u8; LOG_ID_LEN],
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Everything after the fixed header, left uninterpreted
    #[serde(skip)]
    pub trailing: Vec<u8>,
}

impl Sct {
    fn from_record(record: &[u8]) -> Option<Sct> {
        if record.len() < SCT_HEADER_LEN {
            return None;
        }
        let mut log_id = [0u8; LOG_ID_LEN];
        log_id.copy_from_slice(&record[1..1 + LOG_ID_LEN]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&record[1 + LOG_ID_LEN..SCT_HEADER_LEN]);

        Some(Sct {
            version: record[0],
            log_id,
            timestamp: u64::from_be_bytes(timestamp),
            trailing: record[SCT_HEADER_LEN..].to_vec(),
        })
    }

    /// `base64(log_id):timestamp`, the form the oracle accepts on its command line.
    pub fn evidence_string(&self) -> String {
        format!("{}:{}", STANDARD.encode(self.log_id), self.timestamp)
    }
}

fn serialize_log_id<S>(log_id: &[u8; LOG_ID_LEN], s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&STANDARD.encode(log_id))
}

fn read_u16(bytes: &[u8], at: usize) -> Option<usize> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]) as usize)
}

/// Parses a TLS-encoded SCT list (already unwrapped from its octet string).
///
/// Bytes beyond the declared list length are ignored.
pub fn parse_sct_list(bytes: &[u8]) -> Result<Vec<Sct>, RevocationError> {
    let declared = read_u16(bytes, 0).ok_or(RevocationError::TruncatedList {
        declared: 2,
        available: bytes.len(),
    })?;
    let body = &bytes[2..];
    if declared > body.len() {
        return Err(RevocationError::TruncatedList {
            declared,
            available: body.len(),
        });
    }
    if body.len() > declared {
        trace!(ignored = body.len() - declared, "bytes after SCT list");
    }
    let list = &body[..declared];

    let mut scts = Vec::new();
    let mut offset = 0;
    while let Some(len) = read_u16(list, offset) {
        let start = offset + 2;
        let available = list.len() - start;
        if len > available {
            return Err(RevocationError::TruncatedRecord {
                offset,
                declared: len,
                available,
            });
        }
        match Sct::from_record(&list[start..start + len]) {
            Some(sct) => scts.push(sct),
            None => debug!(offset, len, "skipping SCT record shorter than header"),
        }
        offset = start + len;
    }
    Ok(scts)
}

/// SCTs embedded in `cert`, in extension order. No extension means no SCTs.
pub fn extract_scts(cert: &Certificate) -> Result<Vec<Sct>, RevocationError> {
    let ext = match cert.extension(SCT_LIST_OID) {
        Some(ext) => ext,
        None => {
            debug!("certificate has no embedded SCT list");
            return Ok(Vec::new());
        }
    };

    let (rest, wrapped) = parse_der_octetstring(&ext.value).map_err(|e| {
        RevocationError::ExtensionEncoding {
            reason: e.to_string(),
        }
    })?;
    if !rest.is_empty() {
        return Err(RevocationError::ExtensionEncoding {
            reason: format!("{} trailing byte(s) after octet string", rest.len()),
        });
    }
    let list = wrapped
        .as_slice()
        .map_err(|e| RevocationError::ExtensionEncoding {
            reason: e.to_string(),
        })?;

    let scts = parse_sct_list(list)?;
    debug!(count = scts.len(), "extracted embedded SCTs");
    Ok(scts)
}
