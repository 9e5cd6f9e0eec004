// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! This module prepares a digest for a raw RSA private key operation
//! on the token: PKCS #1 v1.5 type 1 block padding, PKCS #1 v1.5
//! DigestInfo prefixing, and EMSA-PSS encoding (RFC 8017 sect. 9.1.1)
//! with MGF1 over the same hash. The token performs the modular
//! exponentiation; only the exact byte layout is produced here.

use openssl::hash::Hasher;

use crate::error::Result;
use crate::hash::HashAlg;
use crate::kasn1::DigestInfo;
use crate::key::PivKey;
use crate::map_err;
use crate::pkcs11::*;
use crate::rng;

/* 0x00 || 0x01 || PS(>= 8 bytes of 0xff) || 0x00 */
const PKCS1_PADDING_OVERHEAD: usize = 11;

/// Applies PKCS #1 v1.5 type 1 padding, producing exactly `em_len`
/// bytes: `00 01 FF..FF 00 message`. The 0xFF run fills all remaining
/// space and must be at least 8 bytes long; a message too long to
/// leave room for it fails with [CKR_FUNCTION_FAILED].
pub fn pad_pkcs1_type1(message: &[u8], em_len: usize) -> Result<Vec<u8>> {
    log::trace!(
        "pkcs1 type 1 padding {} bytes into {}",
        message.len(),
        em_len
    );
    if message.len() + PKCS1_PADDING_OVERHEAD > em_len {
        return Err(CKR_FUNCTION_FAILED)?;
    }
    let mut em = vec![0xffu8; em_len];
    em[0] = 0x00;
    em[1] = 0x01;
    let start = em_len - message.len();
    em[start - 1] = 0x00;
    em[start..].copy_from_slice(message);
    Ok(em)
}

/// Wraps a raw digest in the DER DigestInfo structure carrying the
/// digest algorithm OID, the conventional PKCS #1 v1.5 signature input
/// before padding
pub fn digest_info(digest: &[u8], alg: HashAlg) -> Result<Vec<u8>> {
    DigestInfo::new(alg.oid(), digest)?.serialize()
}

/// EMSA-PSS encodes a digest for the given RSA key, producing a block
/// exactly the key's byte size.
///
/// MGF1 runs over the same hash as the digest, and the salt takes all
/// the space the modulus leaves (the legacy "maximum salt length"
/// default). Fails with [CKR_FUNCTION_FAILED] when the key is not RSA,
/// the modulus is too small for the digest plus its salt, or no hash
/// algorithm is supplied; hash-less PSS is not supported.
pub fn pad_pss(
    key: &PivKey,
    digest: &[u8],
    alg: Option<HashAlg>,
) -> Result<Vec<u8>> {
    let alg = match alg {
        Some(a) => a,
        None => return Err(CKR_FUNCTION_FAILED)?,
    };
    let k = key.rsa_modulus_len()?;
    let mod_bits = key.rsa_modulus_bits()?;
    let h_len = alg.digest_size();
    if digest.len() != h_len {
        return Err(CKR_FUNCTION_FAILED)?;
    }
    log::trace!("pss padding {} byte digest into {}", h_len, k);

    // The encoding operates on modBits - 1 bits. For byte aligned
    // moduli that means clearing one bit of the leading octet; for a
    // modulus with exactly one significant bit in its leading octet
    // the whole first output byte stays zero instead.
    let msbits = (mod_bits - 1) & 7;
    let offset = if msbits == 0 { 1 } else { 0 };
    let em_len = k - offset;
    if em_len < h_len + 2 {
        return Err(CKR_FUNCTION_FAILED)?;
    }
    let s_len = em_len - h_len - 2;
    let db_len = em_len - h_len - 1;
    let ps_len = db_len - s_len - 1;

    let mut out = vec![0u8; k];
    let em = &mut out[offset..];
    em[ps_len] = 0x01;
    rng::generate_random(&mut em[ps_len + 1..ps_len + 1 + s_len])?;
    em[em_len - 1] = 0xbc;

    // H = Hash(00 00 00 00 00 00 00 00 || mHash || salt)
    let mut hasher = map_err!(Hasher::new(alg.md()), CKR_FUNCTION_FAILED)?;
    map_err!(hasher.update(&[0u8; 8]), CKR_FUNCTION_FAILED)?;
    map_err!(hasher.update(digest), CKR_FUNCTION_FAILED)?;
    map_err!(
        hasher.update(&em[ps_len + 1..ps_len + 1 + s_len]),
        CKR_FUNCTION_FAILED
    )?;
    let h = map_err!(hasher.finish(), CKR_FUNCTION_FAILED)?;
    em[db_len..db_len + h_len].copy_from_slice(&h);

    let (db, tail) = em.split_at_mut(db_len);
    mgf1_xor(alg, &tail[..h_len], db)?;
    if msbits != 0 {
        db[0] &= 0xffu8 >> (8 - msbits);
    }
    Ok(out)
}

/// MGF1 (RFC 8017 appendix B.2.1) XORed in place over `mask`
pub(crate) fn mgf1_xor(
    alg: HashAlg,
    seed: &[u8],
    mut mask: &mut [u8],
) -> Result<()> {
    let h_len = alg.digest_size();
    let mut counter: u32 = 0;
    while !mask.is_empty() {
        let take = std::cmp::min(h_len, mask.len());
        let (chunk, rest) = std::mem::take(&mut mask).split_at_mut(take);
        let mut hasher = map_err!(Hasher::new(alg.md()), CKR_FUNCTION_FAILED)?;
        map_err!(hasher.update(seed), CKR_FUNCTION_FAILED)?;
        map_err!(
            hasher.update(&counter.to_be_bytes()),
            CKR_FUNCTION_FAILED
        )?;
        let digest = map_err!(hasher.finish(), CKR_FUNCTION_FAILED)?;
        for (x, y) in chunk.iter_mut().zip(digest.iter()) {
            *x ^= *y;
        }
        counter = counter.wrapping_add(1);
        mask = rest;
    }
    Ok(())
}
