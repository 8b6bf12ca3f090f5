//! Chains and SCT lists for integration tests.

#![allow(dead_code)]

use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Builder, X509Extension, X509NameBuilder, X509};

pub const SCT_LIST_OID: &str = "1.3.6.1.4.1.11129.2.4.2";

pub fn key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn cert(
    common_name: &str,
    serial: u32,
    key: &PKey<Private>,
    issuer: Option<(&X509, &PKey<Private>)>,
    sct_list: Option<&[u8]>,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(90).unwrap())
        .unwrap();
    builder.set_pubkey(key).unwrap();

    if let Some(list) = sct_list {
        let wrapped = octet_string(list);
        let object = Asn1Object::from_str(SCT_LIST_OID).unwrap();
        let contents = Asn1OctetString::new_from_bytes(&wrapped).unwrap();
        builder
            .append_extension(X509Extension::new_from_der(&object, false, &contents).unwrap())
            .unwrap();
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

fn octet_string(content: &[u8]) -> Vec<u8> {
    let len = content.len();
    let mut out = match len {
        0..=0x7f => vec![0x04, len as u8],
        0x80..=0xff => vec![0x04, 0x81, len as u8],
        _ => vec![0x04, 0x82, (len >> 8) as u8, len as u8],
    };
    out.extend_from_slice(content);
    out
}

/// End-entity first: leaf, intermediate, root.
pub struct TestChain {
    pub ders: Vec<Vec<u8>>,
    pub certs: Vec<X509>,
}

pub fn chain(leaf_serial: u32, sct_list: Option<&[u8]>) -> TestChain {
    let root_key = key();
    let root = cert("Integration Root", 1000, &root_key, None, None);
    let inter_key = key();
    let inter = cert(
        "Integration Intermediate",
        1001,
        &inter_key,
        Some((&root, &root_key)),
        None,
    );
    let leaf = cert(
        "service.example.com",
        leaf_serial,
        &key(),
        Some((&inter, &inter_key)),
        sct_list,
    );

    let certs = vec![leaf, inter, root];
    TestChain {
        ders: certs.iter().map(|c| c.to_der().unwrap()).collect(),
        certs,
    }
}

pub fn sct_list(entries: &[([u8; 32], u64)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (log_id, timestamp) in entries {
        let mut record = vec![0u8];
        record.extend_from_slice(log_id);
        record.extend_from_slice(&timestamp.to_be_bytes());
        record.extend_from_slice(&[0x00, 0x00, 0x04, 0x03, 0x00, 0x02, 0xab, 0xcd]);
        body.extend_from_slice(&(record.len() as u16).to_be_bytes());
        body.extend_from_slice(&record);
    }
    let mut list = (body.len() as u16).to_be_bytes().to_vec();
    list.extend_from_slice(&body);
    list
}
