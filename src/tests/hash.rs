// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

use openssl::hash::{hash, MessageDigest};

use crate::hash::*;
use crate::pkcs11::*;

#[test]
fn digest_sizes() {
    assert_eq!(HashAlg::Sha1.digest_size(), 20);
    assert_eq!(HashAlg::Sha256.digest_size(), 32);
    assert_eq!(HashAlg::Sha384.digest_size(), 48);
    assert_eq!(HashAlg::Sha512.digest_size(), 64);
}

#[test]
fn no_hash_selector_creates_no_context() {
    let err = DigestContext::init(None).unwrap_err();
    assert_eq!(err.rv(), CKR_FUNCTION_FAILED);
}

#[test]
fn empty_message_digest() {
    let ctx = DigestContext::init(Some(HashAlg::Sha256)).unwrap();
    let (digest, alg) = ctx.finalize().unwrap();
    assert_eq!(alg, HashAlg::Sha256);
    assert_eq!(
        digest,
        hex::decode(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        )
        .unwrap()
    );
}

#[test]
fn chunked_updates_match_one_shot() {
    let mut ctx = DigestContext::init(Some(HashAlg::Sha1)).unwrap();
    ctx.update(b"a").unwrap();
    ctx.update(b"").unwrap();
    ctx.update(b"bc").unwrap();
    let (digest, alg) = ctx.finalize().unwrap();
    assert_eq!(alg, HashAlg::Sha1);
    assert_eq!(
        digest,
        hash(MessageDigest::sha1(), b"abc").unwrap().to_vec()
    );
}

#[test]
fn every_selector_produces_its_digest() {
    for alg in [HashAlg::Sha1, HashAlg::Sha256, HashAlg::Sha384, HashAlg::Sha512]
    {
        let mut ctx = DigestContext::init(Some(alg)).unwrap();
        ctx.update(b"pivcs11").unwrap();
        let (digest, out_alg) = ctx.finalize().unwrap();
        assert_eq!(out_alg, alg);
        assert_eq!(digest.len(), alg.digest_size());
    }
}
