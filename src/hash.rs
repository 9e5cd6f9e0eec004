// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! This module implements the running digest a signing operation feeds
//! before padding. A [DigestContext] is a single use resource: it is
//! created fully initialized, consumed by [DigestContext::finalize],
//! and simply dropped on the abandon path.

use std::fmt;

use openssl::hash::{Hasher, MessageDigest};

use crate::error::Result;
use crate::map_err;
use crate::pkcs11::*;

/// The hash algorithms PIV signing mechanisms can select
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashAlg {
    /// SHA-1
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

/// Descriptor tying a hash selector to its digest size and OID.
/// Resolved at call time through [HASH_ALG_SET]; there is no mutable
/// process wide registry.
#[derive(Debug)]
pub struct HashBasedOp {
    /// The hash algorithm
    pub alg: HashAlg,
    /// Digest output size in bytes
    pub digest_size: usize,
    /// The algorithm OID used in DigestInfo structures
    pub oid: asn1::ObjectIdentifier,
}

/// The supported hash algorithms and their parameters
pub static HASH_ALG_SET: [HashBasedOp; 4] = [
    HashBasedOp {
        alg: HashAlg::Sha1,
        digest_size: 20,
        oid: crate::kasn1::SHA1_OID,
    },
    HashBasedOp {
        alg: HashAlg::Sha256,
        digest_size: 32,
        oid: crate::kasn1::SHA256_OID,
    },
    HashBasedOp {
        alg: HashAlg::Sha384,
        digest_size: 48,
        oid: crate::kasn1::SHA384_OID,
    },
    HashBasedOp {
        alg: HashAlg::Sha512,
        digest_size: 64,
        oid: crate::kasn1::SHA512_OID,
    },
];

impl HashAlg {
    fn desc(self) -> &'static HashBasedOp {
        match self {
            HashAlg::Sha1 => &HASH_ALG_SET[0],
            HashAlg::Sha256 => &HASH_ALG_SET[1],
            HashAlg::Sha384 => &HASH_ALG_SET[2],
            HashAlg::Sha512 => &HASH_ALG_SET[3],
        }
    }

    /// Digest output size in bytes
    pub fn digest_size(self) -> usize {
        self.desc().digest_size
    }

    /// The algorithm OID used in DigestInfo structures
    pub fn oid(self) -> asn1::ObjectIdentifier {
        self.desc().oid.clone()
    }

    pub(crate) fn md(self) -> MessageDigest {
        match self {
            HashAlg::Sha1 => MessageDigest::sha1(),
            HashAlg::Sha256 => MessageDigest::sha256(),
            HashAlg::Sha384 => MessageDigest::sha384(),
            HashAlg::Sha512 => MessageDigest::sha512(),
        }
    }
}

/// A running hash owned by a single signing operation for its whole
/// lifetime
pub struct DigestContext {
    /// None once an update failed; the context is then unusable
    hasher: Option<Hasher>,
    alg: HashAlg,
}

impl fmt::Debug for DigestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestContext")
            .field("alg", &self.alg)
            .field("live", &self.hasher.is_some())
            .finish()
    }
}

impl DigestContext {
    /// Creates a context for the selected algorithm.
    ///
    /// A missing selector ("no hash") fails with [CKR_FUNCTION_FAILED]
    /// and creates no context at all.
    pub fn init(alg: Option<HashAlg>) -> Result<DigestContext> {
        let alg = match alg {
            Some(a) => a,
            None => return Err(CKR_FUNCTION_FAILED)?,
        };
        Ok(DigestContext {
            hasher: Some(map_err!(Hasher::new(alg.md()), CKR_FUNCTION_FAILED)?),
            alg: alg,
        })
    }

    /// Appends bytes to the running hash.
    ///
    /// On an underlying failure the context disposes its state; any
    /// further update or finalize fails with [CKR_FUNCTION_FAILED].
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        let hasher = match &mut self.hasher {
            Some(h) => h,
            None => return Err(CKR_FUNCTION_FAILED)?,
        };
        if let Err(e) = hasher.update(data) {
            self.hasher = None;
            return Err(crate::error::Error::ck_rv_from_error(
                CKR_FUNCTION_FAILED,
                e,
            ));
        }
        Ok(())
    }

    /// Emits the digest and the algorithm it was computed with (needed
    /// later for DigestInfo prefixing). Consumes the context, success
    /// or failure.
    pub fn finalize(mut self) -> Result<(Vec<u8>, HashAlg)> {
        let mut hasher = match self.hasher.take() {
            Some(h) => h,
            None => return Err(CKR_FUNCTION_FAILED)?,
        };
        let digest = map_err!(hasher.finish(), CKR_FUNCTION_FAILED)?;
        Ok((digest.to_vec(), self.alg))
    }
}
