// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

use openssl::bn::BigNumContext;
use openssl::ec::{EcGroup, EcKey, PointConversionForm};
use openssl::nid::Nid;
use openssl::x509::X509;

use crate::cert::*;
use crate::key::PIV_ALGO_ECCP256;
use crate::pkcs11::*;
use crate::tests::tlv;

fn ec_pubkey_blob() -> Vec<u8> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let eckey = EcKey::generate(&group).unwrap();
    let mut bnctx = BigNumContext::new().unwrap();
    let point = eckey
        .public_key()
        .to_bytes(&group, PointConversionForm::UNCOMPRESSED, &mut bnctx)
        .unwrap();
    tlv(0x86, &point)
}

fn placeholder_der(cn: &str) -> Vec<u8> {
    let blob = ec_pubkey_blob();
    let cert = make_placeholder_cert(&blob, PIV_ALGO_ECCP256, cn).unwrap();
    let mut slot = CertSlot::new();
    slot.store(cert);
    let len = slot.serialize_raw(None).unwrap();
    let mut der = vec![0u8; len];
    assert_eq!(slot.serialize_raw(Some(&mut der)).unwrap(), len);
    der
}

#[test]
fn placeholder_cert_shape() {
    let der = placeholder_der("PIV Attestation");
    let cert = X509::from_der(&der).unwrap();

    let cn = cert
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap();
    assert_eq!(cn.data().as_slice(), b"PIV Attestation");
    let issuer_cn = cert
        .issuer_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap();
    assert_eq!(issuer_cn.data().as_slice(), b"PIV Attestation");

    /* a zero serial serializes to no magnitude bytes at all */
    let serial = cert.serial_number().to_bn().unwrap();
    assert!(serial.to_vec().is_empty());
}

#[test]
fn placeholder_cert_capacity() {
    let blob = ec_pubkey_blob();
    let cert = make_placeholder_cert(&blob, PIV_ALGO_ECCP256, "x").unwrap();
    let mut slot = CertSlot::new();
    slot.store(cert);

    /* the fill pass must agree with the measure pass byte for byte;
     * the ECDSA signature is fixed once the certificate is built */
    let len = slot.serialize_raw(None).unwrap();
    let mut exact = vec![0u8; len];
    assert_eq!(slot.serialize_raw(Some(&mut exact)).unwrap(), len);
    assert_eq!(slot.serialize_raw(None).unwrap(), len);

    let mut short = vec![0u8; len - 1];
    let err = slot.serialize_raw(Some(&mut short)).unwrap_err();
    assert_eq!(err.rv(), CKR_BUFFER_TOO_SMALL);
    assert_eq!(short, vec![0u8; len - 1]);
}

#[test]
fn store_raw_der_round_trip() {
    let der = placeholder_der("roundtrip");
    let mut slot = CertSlot::new();

    /* trailing garbage past the SEQUENCE must be ignored */
    let mut padded = der.clone();
    padded.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    slot.store_from_bytes(&padded).unwrap();

    let len = slot.serialize_raw(None).unwrap();
    assert_eq!(len, der.len());
    let err = slot.serialize_raw(Some(&mut [])).unwrap_err();
    assert_eq!(err.rv(), CKR_BUFFER_TOO_SMALL);
    let mut out = vec![0u8; len];
    assert_eq!(slot.serialize_raw(Some(&mut out)).unwrap(), len);
    assert_eq!(out, der);
}

#[test]
fn store_piv_wrapped_round_trip() {
    let der = placeholder_der("wrapped");
    let wrapped = tlv(0x70, &der);

    let mut slot = CertSlot::new();
    slot.store_from_bytes(&wrapped).unwrap();
    let mut out = vec![0u8; slot.serialize_raw(None).unwrap()];
    slot.serialize_raw(Some(&mut out)).unwrap();
    assert_eq!(out, der);
}

#[test]
fn store_rejects_truncated_input() {
    let der = placeholder_der("short");
    let mut slot = CertSlot::new();

    let err = slot.store_from_bytes(&der[..der.len() - 1]).unwrap_err();
    assert_eq!(err.rv(), CKR_ARGUMENTS_BAD);

    let wrapped = tlv(0x70, &der);
    let err = slot
        .store_from_bytes(&wrapped[..wrapped.len() - 1])
        .unwrap_err();
    assert_eq!(err.rv(), CKR_ARGUMENTS_BAD);

    /* bytes that are no certificate at all */
    let err = slot.store_from_bytes(&[0x30, 0x02, 0x05, 0x00]).unwrap_err();
    assert_eq!(err.rv(), CKR_FUNCTION_FAILED);

    /* a declared length so large the structure size would wrap */
    let huge = [0x30, 0x88, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    let err = slot.store_from_bytes(&huge).unwrap_err();
    assert_eq!(err.rv(), CKR_DATA_INVALID);
}

#[test]
fn store_replaces_previous_cert() {
    let first = placeholder_der("first");
    let second = placeholder_der("second");

    let mut slot = CertSlot::new();
    slot.store_from_bytes(&first).unwrap();
    slot.store_from_bytes(&second).unwrap();
    let mut out = vec![0u8; slot.serialize_raw(None).unwrap()];
    slot.serialize_raw(Some(&mut out)).unwrap();
    assert_eq!(out, second);

    slot.dispose();
    slot.dispose();
    assert_eq!(slot.serialize_raw(None).unwrap_err().rv(), CKR_GENERAL_ERROR);
}

#[test]
fn check_cert_reports_true_length() {
    let der = placeholder_der("check");
    let mut padded = der.clone();
    padded.extend_from_slice(&[0u8; 16]);
    assert_eq!(check_cert(&padded).unwrap(), der.len());

    let err = check_cert(&der[..10]).unwrap_err();
    assert_eq!(err.rv(), CKR_ARGUMENTS_BAD);
}

#[test]
fn certificate_subfields() {
    let der = placeholder_der("fields");
    let mut slot = CertSlot::new();
    slot.store_from_bytes(&der).unwrap();

    let mut subject = vec![0u8; slot.serialize_subject_name(None).unwrap()];
    slot.serialize_subject_name(Some(&mut subject)).unwrap();
    assert_eq!(subject[0], 0x30);
    let mut issuer = vec![0u8; slot.serialize_issuer_name(None).unwrap()];
    slot.serialize_issuer_name(Some(&mut issuer)).unwrap();
    assert_eq!(issuer, subject);

    let mut serial = vec![0u8; slot.serialize_serial(None).unwrap()];
    slot.serialize_serial(Some(&mut serial)).unwrap();
    assert_eq!(serial, vec![0x02, 0x01, 0x00]);

    let pubkey = slot.public_key().unwrap();
    assert_eq!(pubkey.key_type(), CKK_EC);
    assert_eq!(pubkey.key_bits(), 256);
}
