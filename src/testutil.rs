//! Certificate fixtures for unit tests, built with OpenSSL.

use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{BasicConstraints, SubjectAlternativeName};
use openssl::x509::{X509Builder, X509Extension, X509NameBuilder, X509};

use crate::sct::SCT_LIST_OID;

pub(crate) fn test_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

pub(crate) struct CertSpec {
    common_name: String,
    serial: u32,
    ca: bool,
    dns_name: Option<String>,
    extensions: Vec<(String, Vec<u8>)>,
}

impl CertSpec {
    pub(crate) fn new(common_name: &str, serial: u32) -> Self {
        CertSpec {
            common_name: common_name.to_string(),
            serial,
            ca: false,
            dns_name: None,
            extensions: Vec::new(),
        }
    }

    pub(crate) fn as_ca(mut self) -> Self {
        self.ca = true;
        self
    }

    pub(crate) fn with_dns_name(mut self, dns_name: &str) -> Self {
        self.dns_name = Some(dns_name.to_string());
        self
    }

    /// `value` is the raw extnValue content.
    pub(crate) fn with_extension(mut self, oid: &str, value: Vec<u8>) -> Self {
        self.extensions.push((oid.to_string(), value));
        self
    }

    /// Embeds a TLS-encoded SCT list the way CAs do: wrapped in an octet string.
    pub(crate) fn with_sct_list(self, list: &[u8]) -> Self {
        self.with_extension(SCT_LIST_OID, der_octet_string(list))
    }
}

pub(crate) fn issue(
    spec: &CertSpec,
    key: &PKey<Private>,
    issuer: Option<(&X509, &PKey<Private>)>,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", &spec.common_name).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(spec.serial)
        .unwrap()
        .to_asn1_integer()
        .unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(90).unwrap())
        .unwrap();
    builder.set_pubkey(key).unwrap();

    if spec.ca {
        let constraints = BasicConstraints::new().critical().ca().build().unwrap();
        builder.append_extension(constraints).unwrap();
    }
    if let Some(dns_name) = &spec.dns_name {
        let san = {
            let context = builder.x509v3_context(issuer.map(|(cert, _)| &**cert), None);
            SubjectAlternativeName::new()
                .dns(dns_name)
                .build(&context)
                .unwrap()
        };
        builder.append_extension(san).unwrap();
    }
    for (oid, value) in &spec.extensions {
        let object = Asn1Object::from_str(oid).unwrap();
        let contents = Asn1OctetString::new_from_bytes(value).unwrap();
        let ext = X509Extension::new_from_der(&object, false, &contents).unwrap();
        builder.append_extension(ext).unwrap();
    }

    match issuer {
        Some((issuer_cert, issuer_key)) => {
            builder.set_issuer_name(issuer_cert.subject_name()).unwrap();
            builder.sign(issuer_key, MessageDigest::sha256()).unwrap();
        }
        None => {
            builder.set_issuer_name(&name).unwrap();
            builder.sign(key, MessageDigest::sha256()).unwrap();
        }
    }
    builder.build()
}

pub(crate) fn leaf_with_serial(serial: u32) -> Vec<u8> {
    issue(&CertSpec::new("leaf.example.com", serial), &test_key(), None)
        .to_der()
        .unwrap()
}

/// A root, an intermediate and a leaf carrying `leaf_spec`; returned
/// end-entity first along with the intermediate's key.
pub(crate) fn three_chain(leaf_spec: &CertSpec) -> (Vec<Vec<u8>>, PKey<Private>) {
    let root_key = test_key();
    let root = issue(&CertSpec::new("Test Root", 100), &root_key, None);
    let inter_key = test_key();
    let inter = issue(
        &CertSpec::new("Test Intermediate", 101),
        &inter_key,
        Some((&root, &root_key)),
    );
    let leaf = issue(leaf_spec, &test_key(), Some((&inter, &inter_key)));

    (
        vec![
            leaf.to_der().unwrap(),
            inter.to_der().unwrap(),
            root.to_der().unwrap(),
        ],
        inter_key,
    )
}

/// Root, intermediate and leaf that OpenSSL accepts for `dns_name`, with the
/// leaf's key. Root and intermediate are marked as CAs.
pub(crate) struct ServerChain {
    pub(crate) root: X509,
    pub(crate) intermediate: X509,
    pub(crate) leaf: X509,
    pub(crate) leaf_key: PKey<Private>,
}

pub(crate) fn server_chain(dns_name: &str) -> ServerChain {
    let root_key = test_key();
    let root = issue(&CertSpec::new("Test Root", 200).as_ca(), &root_key, None);
    let inter_key = test_key();
    let intermediate = issue(
        &CertSpec::new("Test Intermediate", 201).as_ca(),
        &inter_key,
        Some((&root, &root_key)),
    );
    let leaf_key = test_key();
    let leaf = issue(
        &CertSpec::new(dns_name, 202).with_dns_name(dns_name),
        &leaf_key,
        Some((&intermediate, &inter_key)),
    );
    ServerChain {
        root,
        intermediate,
        leaf,
        leaf_key,
    }
}

/// SCT v1 body: version, log id, timestamp, no extensions, a dummy signature.
pub(crate) fn sct_record(log_id: [u8; 32], timestamp: u64) -> Vec<u8> {
    let mut record = vec![0u8];
    record.extend_from_slice(&log_id);
    record.extend_from_slice(&timestamp.to_be_bytes());
    record.extend_from_slice(&[0x00, 0x00]);
    record.extend_from_slice(&[0x04, 0x03, 0x00, 0x04, 0xde, 0xad, 0xbe, 0xef]);
    record
}

/// Length-prefixes every record and the list as a whole.
pub(crate) fn sct_list(records: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    for record in records {
        body.extend_from_slice(&(record.len() as u16).to_be_bytes());
        body.extend_from_slice(record);
    }
    let mut list = (body.len() as u16).to_be_bytes().to_vec();
    list.extend_from_slice(&body);
    list
}

pub(crate) fn der_octet_string(content: &[u8]) -> Vec<u8> {
    let mut out = vec![0x04];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}
