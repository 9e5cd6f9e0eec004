// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! This module turns the raw key component blobs a PIV token emits on
//! key generation into public key objects, and extracts the PKCS #11
//! attribute byte layouts (modulus, exponent, EC point, EC params) back
//! out of them. Each exporter follows the measure/fill discipline of
//! [crate::misc::fill_buffer].

use std::fmt;

use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{Asn1Flag, EcGroup, EcKey, EcPoint, PointConversionForm};
use openssl::nid::Nid;
use openssl::pkey::{Id, PKey, PKeyRef, Private, Public};

use crate::error::Result;
use crate::kasn1;
use crate::map_err;
use crate::misc::fill_buffer;
use crate::pkcs11::*;
use crate::tlv::{
    decode_length, Cursor, TAG_EC_POINT, TAG_RSA_EXPONENT, TAG_RSA_MODULUS,
};

/// PIV algorithm tag for 1024 bit RSA keys
pub const PIV_ALGO_RSA1024: CK_BYTE = 0x06;
/// PIV algorithm tag for 2048 bit RSA keys
pub const PIV_ALGO_RSA2048: CK_BYTE = 0x07;
/// PIV algorithm tag for EC keys on P-256
pub const PIV_ALGO_ECCP256: CK_BYTE = 0x11;
/// PIV algorithm tag for EC keys on P-384
pub const PIV_ALGO_ECCP384: CK_BYTE = 0x14;

/// The named elliptic curves a PIV token can hold keys on
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Curve {
    /// secp256r1 / prime256v1
    P256,
    /// secp384r1
    P384,
}

impl Curve {
    /// Maps a PIV algorithm tag to a curve; RSA tags and unknown values
    /// return [None]
    pub fn from_piv_algorithm(algorithm: CK_BYTE) -> Option<Curve> {
        match algorithm {
            PIV_ALGO_ECCP256 => Some(Curve::P256),
            PIV_ALGO_ECCP384 => Some(Curve::P384),
            _ => None,
        }
    }

    fn from_nid(nid: Nid) -> Result<Curve> {
        match nid {
            Nid::X9_62_PRIME256V1 => Ok(Curve::P256),
            Nid::SECP384R1 => Ok(Curve::P384),
            _ => Err(CKR_ARGUMENTS_BAD)?,
        }
    }

    fn nid(&self) -> Nid {
        match self {
            Curve::P256 => Nid::X9_62_PRIME256V1,
            Curve::P384 => Nid::SECP384R1,
        }
    }

    fn oid(&self) -> asn1::ObjectIdentifier {
        match self {
            Curve::P256 => kasn1::EC_SECP256R1,
            Curve::P384 => kasn1::EC_SECP384R1,
        }
    }

    fn group(&self) -> Result<EcGroup> {
        let mut group =
            map_err!(EcGroup::from_curve_name(self.nid()), CKR_HOST_MEMORY)?;
        group.set_asn1_flag(Asn1Flag::NAMED_CURVE);
        Ok(group)
    }
}

/// A public key assembled from token supplied components.
///
/// Owns the underlying key handle exclusively; replacing the key held
/// by a containing slot drops the previous handle.
pub struct PivKey {
    pkey: PKey<Public>,
}

impl PivKey {
    /// Builds a public key object from a PIV "generate asymmetric key
    /// pair" response blob.
    ///
    /// For RSA algorithms the blob must carry tag 0x81 (modulus) then
    /// tag 0x82 (public exponent); for EC algorithms tag 0x86 (the
    /// uncompressed point). An unknown algorithm tag is a
    /// [CKR_FUNCTION_FAILED], a wrong component tag [CKR_GENERAL_ERROR],
    /// an empty component or undecodable point [CKR_ARGUMENTS_BAD].
    pub fn from_piv_components(
        blob: &[u8],
        algorithm: CK_BYTE,
    ) -> Result<PivKey> {
        match algorithm {
            PIV_ALGO_RSA1024 | PIV_ALGO_RSA2048 => (),
            PIV_ALGO_ECCP256 | PIV_ALGO_ECCP384 => (),
            _ => return Err(CKR_FUNCTION_FAILED)?,
        }
        let mut cur = Cursor::new(blob);
        match Curve::from_piv_algorithm(algorithm) {
            None => {
                if cur.take_u8()? != TAG_RSA_MODULUS {
                    return Err(CKR_GENERAL_ERROR)?;
                }
                let (len, _) = decode_length(&mut cur)?;
                if len == 0 {
                    return Err(CKR_ARGUMENTS_BAD)?;
                }
                let modulus = cur.take(len)?;

                if cur.take_u8()? != TAG_RSA_EXPONENT {
                    return Err(CKR_GENERAL_ERROR)?;
                }
                let (len, _) = decode_length(&mut cur)?;
                if len == 0 {
                    return Err(CKR_ARGUMENTS_BAD)?;
                }
                let exponent = cur.take(len)?;

                PivKey::from_rsa_components(modulus, exponent)
            }
            Some(curve) => {
                if cur.take_u8()? != TAG_EC_POINT {
                    return Err(CKR_GENERAL_ERROR)?;
                }
                let (len, _) = decode_length(&mut cur)?;
                if len == 0 {
                    return Err(CKR_ARGUMENTS_BAD)?;
                }
                PivKey::from_ec_point(curve, cur.take(len)?)
            }
        }
    }

    /// Builds an RSA public key from raw big endian modulus and
    /// exponent bytes
    pub fn from_rsa_components(
        modulus: &[u8],
        exponent: &[u8],
    ) -> Result<PivKey> {
        if modulus.len() == 0 || exponent.len() == 0 {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let n = map_err!(BigNum::from_slice(modulus), CKR_HOST_MEMORY)?;
        let e = map_err!(BigNum::from_slice(exponent), CKR_HOST_MEMORY)?;
        let rsa = map_err!(
            openssl::rsa::Rsa::from_public_components(n, e),
            CKR_GENERAL_ERROR
        )?;
        Ok(PivKey {
            pkey: map_err!(PKey::from_rsa(rsa), CKR_GENERAL_ERROR)?,
        })
    }

    /// Builds an EC public key from an uncompressed point on the named
    /// curve
    pub fn from_ec_point(curve: Curve, point: &[u8]) -> Result<PivKey> {
        let group = curve.group()?;
        let mut bnctx = map_err!(BigNumContext::new(), CKR_HOST_MEMORY)?;
        let ecpoint = map_err!(
            EcPoint::from_bytes(&group, point, &mut bnctx),
            CKR_ARGUMENTS_BAD
        )?;
        let eckey = map_err!(
            EcKey::from_public_key(&group, &ecpoint),
            CKR_GENERAL_ERROR
        )?;
        Ok(PivKey {
            pkey: map_err!(PKey::from_ec_key(eckey), CKR_GENERAL_ERROR)?,
        })
    }

    /// Wraps a public key extracted from a certificate
    pub(crate) fn from_pkey(pkey: PKey<Public>) -> PivKey {
        PivKey { pkey: pkey }
    }

    pub(crate) fn as_pkey(&self) -> &PKeyRef<Public> {
        &self.pkey
    }

    /// Returns the PKCS #11 key type, or [CKK_VENDOR_DEFINED] for an
    /// algorithm family PIV has no notion of (the caller must treat
    /// that value as an error)
    pub fn key_type(&self) -> CK_KEY_TYPE {
        match self.pkey.id() {
            Id::RSA => CKK_RSA,
            Id::EC => CKK_EC,
            _ => CKK_VENDOR_DEFINED,
        }
    }

    /// Returns the key size in bits
    pub fn key_bits(&self) -> usize {
        usize::try_from(self.pkey.bits()).unwrap_or(0)
    }

    /// Maps the key family and bit length to the PIV algorithm tag, or
    /// 0 for a combination PIV cannot represent (the caller must treat
    /// 0 as an error, not a valid algorithm)
    pub fn piv_algorithm(&self) -> CK_BYTE {
        match (self.pkey.id(), self.key_bits()) {
            (Id::RSA, 1024) => PIV_ALGO_RSA1024,
            (Id::RSA, 2048) => PIV_ALGO_RSA2048,
            (Id::EC, 256) => PIV_ALGO_ECCP256,
            (Id::EC, 384) => PIV_ALGO_ECCP384,
            _ => 0,
        }
    }

    /// Size of the RSA modulus in bytes; fails on non RSA keys
    pub(crate) fn rsa_modulus_len(&self) -> Result<usize> {
        let rsa = map_err!(self.pkey.rsa(), CKR_FUNCTION_FAILED)?;
        Ok(usize::try_from(rsa.size())?)
    }

    /// RSA modulus bit length; fails on non RSA keys
    pub(crate) fn rsa_modulus_bits(&self) -> Result<usize> {
        let rsa = map_err!(self.pkey.rsa(), CKR_FUNCTION_FAILED)?;
        Ok(usize::try_from(rsa.n().num_bits())?)
    }

    /// Exports the modulus as minimal big endian bytes (CKA_MODULUS).
    /// Valid only for RSA keys.
    pub fn export_modulus(&self, out: Option<&mut [u8]>) -> Result<usize> {
        let rsa = map_err!(self.pkey.rsa(), CKR_FUNCTION_FAILED)?;
        fill_buffer(&rsa.n().to_vec(), out)
    }

    /// Exports the public exponent as minimal big endian bytes
    /// (CKA_PUBLIC_EXPONENT). Valid only for RSA keys.
    pub fn export_public_exponent(
        &self,
        out: Option<&mut [u8]>,
    ) -> Result<usize> {
        let rsa = map_err!(self.pkey.rsa(), CKR_FUNCTION_FAILED)?;
        fill_buffer(&rsa.e().to_vec(), out)
    }

    /// Exports the public key blob the PIV import/attest flow expects:
    /// the DER `RSAPublicKey` structure for RSA keys, or for EC keys an
    /// octet string header `{0x04, len}` followed by the uncompressed
    /// point. The output buffer must fit the 2 byte header in addition
    /// to the point.
    pub fn export_public_key(&self, out: Option<&mut [u8]>) -> Result<usize> {
        match self.pkey.id() {
            Id::RSA => {
                let rsa = map_err!(self.pkey.rsa(), CKR_FUNCTION_FAILED)?;
                let der = kasn1::RsaPublicKey::new(
                    &rsa.n().to_vec(),
                    &rsa.e().to_vec(),
                )?
                .serialize()?;
                fill_buffer(&der, out)
            }
            Id::EC => {
                let eckey =
                    map_err!(self.pkey.ec_key(), CKR_FUNCTION_FAILED)?;
                let mut bnctx =
                    map_err!(BigNumContext::new(), CKR_HOST_MEMORY)?;
                let point = map_err!(
                    eckey.public_key().to_bytes(
                        eckey.group(),
                        PointConversionForm::UNCOMPRESSED,
                        &mut bnctx
                    ),
                    CKR_FUNCTION_FAILED
                )?;
                if point.len() > usize::from(u8::MAX) {
                    return Err(CKR_FUNCTION_FAILED)?;
                }
                let mut blob = Vec::with_capacity(point.len() + 2);
                blob.push(0x04);
                blob.push(point.len() as u8);
                blob.extend_from_slice(&point);
                fill_buffer(&blob, out)
            }
            _ => Err(CKR_FUNCTION_FAILED)?,
        }
    }

    /// Exports the DER encoding of the named curve domain parameters
    /// (CKA_EC_PARAMS). Valid only for EC keys.
    pub fn export_ec_params(&self, out: Option<&mut [u8]>) -> Result<usize> {
        let eckey = map_err!(self.pkey.ec_key(), CKR_FUNCTION_FAILED)?;
        let nid = match eckey.group().curve_name() {
            Some(nid) => nid,
            None => return Err(CKR_FUNCTION_FAILED)?,
        };
        let der = kasn1::encode_curve_oid(Curve::from_nid(nid)?.oid())?;
        fill_buffer(&der, out)
    }
}

impl fmt::Debug for PivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PivKey")
            .field("key_type", &self.key_type())
            .field("bits", &self.pkey.bits())
            .finish()
    }
}

/// A throwaway EC key pair minted to sign placeholder certificates.
///
/// The private half never leaves this crate; it is used once by the
/// certificate synthesizer and dropped.
pub struct EphemeralKey {
    pkey: PKey<Private>,
}

impl EphemeralKey {
    /// Generates a fresh key pair on the named curve
    pub fn generate(curve: Curve) -> Result<EphemeralKey> {
        let group = curve.group()?;
        let eckey = map_err!(EcKey::generate(&group), CKR_GENERAL_ERROR)?;
        Ok(EphemeralKey {
            pkey: map_err!(PKey::from_ec_key(eckey), CKR_GENERAL_ERROR)?,
        })
    }

    pub(crate) fn signing_key(&self) -> &PKeyRef<Private> {
        &self.pkey
    }
}

/// The key object slot of a PKCS #11 object.
///
/// Holds at most one key; storing a new key drops the previous one, so
/// a slot can never leak or double free a handle.
#[derive(Default)]
pub struct KeySlot {
    key: Option<PivKey>,
}

impl KeySlot {
    /// Creates an empty slot
    pub fn new() -> KeySlot {
        KeySlot { key: None }
    }

    /// Stores a key, dropping any previously held one
    pub fn store(&mut self, key: PivKey) {
        self.key = Some(key);
    }

    /// Returns the held key or [CKR_GENERAL_ERROR] when the slot is
    /// empty
    pub fn get(&self) -> Result<&PivKey> {
        match &self.key {
            Some(k) => Ok(k),
            None => Err(CKR_GENERAL_ERROR)?,
        }
    }

    /// Empties the slot; idempotent
    pub fn clear(&mut self) {
        self.key = None;
    }
}
