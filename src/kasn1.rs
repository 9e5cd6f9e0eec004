// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! Helper routines and structures to use with rust/asn1 for the few DER
//! objects this crate encodes itself: PKCS #1 `RSAPublicKey`, PKCS #1
//! `DigestInfo`, DER INTEGERs and named curve parameters.

use std::borrow::Cow;

use crate::error::Result;
use crate::pkcs11::*;

use asn1;
use zeroize::Zeroize;

/// SHA-1 algorithm OID
pub const SHA1_OID: asn1::ObjectIdentifier = asn1::oid!(1, 3, 14, 3, 2, 26);
/// SHA-256 algorithm OID
pub const SHA256_OID: asn1::ObjectIdentifier =
    asn1::oid!(2, 16, 840, 1, 101, 3, 4, 2, 1);
/// SHA-384 algorithm OID
pub const SHA384_OID: asn1::ObjectIdentifier =
    asn1::oid!(2, 16, 840, 1, 101, 3, 4, 2, 2);
/// SHA-512 algorithm OID
pub const SHA512_OID: asn1::ObjectIdentifier =
    asn1::oid!(2, 16, 840, 1, 101, 3, 4, 2, 3);

/// secp256r1 (prime256v1) named curve OID
pub const EC_SECP256R1: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 10045, 3, 1, 7);
/// secp384r1 named curve OID
pub const EC_SECP384R1: asn1::ObjectIdentifier = asn1::oid!(1, 3, 132, 0, 34);

/// A big endian unsigned integer with the sign and leading zero
/// adjustments DER INTEGERs require
pub struct DerEncBigUint<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> DerEncBigUint<'a> {
    /// Wraps raw big endian magnitude bytes, prepending a NULL byte when
    /// the top bit is set, or skipping redundant leading zeroes
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() == 0 {
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let mut de = DerEncBigUint {
            data: Cow::from(data),
        };
        if de.data[0] & 0x80 == 0x80 {
            let mut v = Vec::with_capacity(de.data.len() + 1);
            v.push(0);
            v.extend_from_slice(&de.data);
            de = DerEncBigUint {
                data: Cow::Owned(v),
            };
        } else {
            // Skip leading zeroes that do not affect the sign of the
            // resulting integer
            let mut skip = 0;
            while de.data[skip] == 0
                && skip + 1 < de.data.len()
                && de.data[skip + 1] & 0x80 == 0
            {
                skip += 1;
            }
            de = DerEncBigUint {
                data: Cow::from(&data[skip..]),
            };
        }
        /* check it works */
        match asn1::BigUint::new(&de.data) {
            Some(_) => Ok(de),
            None => Err(CKR_GENERAL_ERROR)?,
        }
    }

    /// Returns the adjusted INTEGER content bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for DerEncBigUint<'_> {
    fn drop(&mut self) {
        match &self.data {
            Cow::Owned(_) => self.data.to_mut().zeroize(),
            _ => (),
        }
    }
}

impl<'a> asn1::SimpleAsn1Readable<'a> for DerEncBigUint<'a> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn parse_data(data: &'a [u8]) -> asn1::ParseResult<Self> {
        match DerEncBigUint::new(data) {
            Ok(x) => Ok(x),
            Err(_) => {
                Err(asn1::ParseError::new(asn1::ParseErrorKind::InvalidValue))
            }
        }
    }
}
impl<'a> asn1::SimpleAsn1Writable for DerEncBigUint<'a> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn write_data(&self, dest: &mut asn1::WriteBuf) -> asn1::WriteResult {
        dest.push_slice(self.as_bytes())
    }
}

/// An OCTET STRING borrowing its content
pub struct DerEncOctetString<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> DerEncOctetString<'a> {
    /// Wraps the raw content bytes
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Ok(DerEncOctetString {
            data: Cow::from(data),
        })
    }

    /// Returns the content bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for DerEncOctetString<'_> {
    fn drop(&mut self) {
        match &self.data {
            Cow::Owned(_) => self.data.to_mut().zeroize(),
            _ => (),
        }
    }
}

impl<'a> asn1::SimpleAsn1Readable<'a> for DerEncOctetString<'a> {
    const TAG: asn1::Tag = asn1::Tag::primitive(0x04);
    fn parse_data(data: &'a [u8]) -> asn1::ParseResult<Self> {
        match DerEncOctetString::new(data) {
            Ok(x) => Ok(x),
            Err(_) => {
                Err(asn1::ParseError::new(asn1::ParseErrorKind::InvalidValue))
            }
        }
    }
}
impl<'a> asn1::SimpleAsn1Writable for DerEncOctetString<'a> {
    const TAG: asn1::Tag = asn1::Tag::primitive(0x04);
    fn write_data(&self, dest: &mut asn1::WriteBuf) -> asn1::WriteResult {
        dest.push_slice(self.as_bytes())
    }
}

/// PKCS #1 RSAPublicKey
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct RsaPublicKey<'a> {
    modulus: DerEncBigUint<'a>,
    public_exponent: DerEncBigUint<'a>,
}

impl RsaPublicKey<'_> {
    /// Constructs an `RsaPublicKey` ASN.1 structure from byte slices of
    /// its components
    pub fn new<'a>(
        modulus: &'a [u8],
        public_exponent: &'a [u8],
    ) -> Result<RsaPublicKey<'a>> {
        Ok(RsaPublicKey {
            modulus: DerEncBigUint::new(modulus)?,
            public_exponent: DerEncBigUint::new(public_exponent)?,
        })
    }

    /// DER-encodes the structure
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(asn1::write_single(self)?)
    }
}

/// X.509 AlgorithmIdentifier restricted to digest algorithms, which all
/// take NULL parameters
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct DigestAlgorithmIdentifier {
    /// The digest algorithm OID
    pub algorithm: asn1::ObjectIdentifier,
    /// Always NULL for the digests in use here
    pub parameters: Option<()>,
}

/// PKCS #1 DigestInfo, the DER structure pairing a digest algorithm
/// identifier with a raw hash value
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct DigestInfo<'a> {
    /// The digest algorithm
    pub digest_algorithm: DigestAlgorithmIdentifier,
    /// The raw digest bytes
    pub digest: DerEncOctetString<'a>,
}

impl DigestInfo<'_> {
    /// Pairs a raw digest with its algorithm OID
    pub fn new<'a>(
        oid: asn1::ObjectIdentifier,
        digest: &'a [u8],
    ) -> Result<DigestInfo<'a>> {
        Ok(DigestInfo {
            digest_algorithm: DigestAlgorithmIdentifier {
                algorithm: oid,
                parameters: Some(()),
            },
            digest: DerEncOctetString::new(digest)?,
        })
    }

    /// DER-encodes the structure
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(asn1::write_single(self)?)
    }
}

/// DER-encodes a standalone INTEGER from big endian magnitude bytes
pub fn encode_integer(data: &[u8]) -> Result<Vec<u8>> {
    Ok(asn1::write_single(&DerEncBigUint::new(data)?)?)
}

/// DER-encodes named curve domain parameters, which for the curves PIV
/// supports are just the curve OID
pub fn encode_curve_oid(oid: asn1::ObjectIdentifier) -> Result<Vec<u8>> {
    Ok(asn1::write_single(&oid)?)
}
