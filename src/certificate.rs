//! Typed, read-only view over a verified certificate chain.
//!
//! The TLS stack hands over raw DER buffers that it has already validated.
//! Nothing here re-checks signatures or validity periods; parsing only pulls
//! out the fields revocation evidence is derived from. The caller's buffers
//! are copied, never modified.

use openssl::x509::X509;
use x509_parser::prelude::*;

use crate::error::RevocationError;

/// A single X.509 extension as it appears in the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Dotted-decimal object identifier
    pub oid: String,
    pub critical: bool,
    /// Contents of the `extnValue` octet string
    pub value: Vec<u8>,
}

/// One DER-encoded certificate and the fields derived from it.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    common_name: Option<String>,
    serial: Vec<u8>,
    spki: Vec<u8>,
    extensions: Vec<Extension>,
}

impl Certificate {
    /// Parses a standalone DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Certificate, RevocationError> {
        Self::parse(der, 0)
    }

    fn parse(der: &[u8], index: usize) -> Result<Certificate, RevocationError> {
        let malformed = |reason: String| RevocationError::MalformedCertificate { index, reason };

        let (rest, cert) = X509Certificate::from_der(der).map_err(|e| malformed(e.to_string()))?;
        if !rest.is_empty() {
            return Err(malformed(format!(
                "{} trailing byte(s) after certificate",
                rest.len()
            )));
        }

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(String::from);

        let extensions = cert
            .extensions()
            .iter()
            .map(|ext| Extension {
                oid: ext.oid.to_id_string(),
                critical: ext.critical,
                value: ext.value.to_vec(),
            })
            .collect();

        Ok(Certificate {
            der: der.to_vec(),
            common_name,
            serial: unsigned_be(cert.tbs_certificate.raw_serial()),
            spki: cert.public_key().raw.to_vec(),
            extensions,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject common name, for display only.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Serial number as minimal big-endian unsigned bytes.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// Raw SubjectPublicKeyInfo exactly as encoded in the certificate.
    pub fn spki(&self) -> &[u8] {
        &self.spki
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// First extension with the given dotted OID.
    pub fn extension(&self, oid: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.oid == oid)
    }

    /// PEM `CERTIFICATE` armor of the DER bytes.
    pub fn to_pem(&self) -> Result<Vec<u8>, RevocationError> {
        Ok(X509::from_der(&self.der)?.to_pem()?)
    }
}

// DER INTEGER content is two's complement; serials are positive, so a
// leading zero is sign padding only.
fn unsigned_be(raw: &[u8]) -> Vec<u8> {
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    if start == raw.len() {
        vec![0]
    } else {
        raw[start..].to_vec()
    }
}

/// Verified chain, index 0 is the end-entity, ancestors follow in order.
#[derive(Debug, Clone)]
pub struct Chain {
    certificates: Vec<Certificate>,
}

impl Chain {
    /// Parses every buffer in order. An empty chain is rejected.
    pub fn from_ders<I, B>(ders: I) -> Result<Chain, RevocationError>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let certificates = ders
            .into_iter()
            .enumerate()
            .map(|(index, der)| Certificate::parse(der.as_ref(), index))
            .collect::<Result<Vec<_>, _>>()?;

        if certificates.is_empty() {
            return Err(RevocationError::InsufficientChain {
                required: 1,
                actual: 0,
            });
        }
        Ok(Chain { certificates })
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn end_entity(&self) -> &Certificate {
        &self.certificates[0]
    }

    /// The immediate issuer of the end-entity, if the chain carries one.
    pub fn issuer(&self) -> Option<&Certificate> {
        self.certificates.get(1)
    }

    /// The issuer, or `InsufficientChain` for a lone end-entity.
    pub fn require_issuer(&self) -> Result<&Certificate, RevocationError> {
        self.issuer().ok_or(RevocationError::InsufficientChain {
            required: 2,
            actual: self.len(),
        })
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.iter()
    }
}
