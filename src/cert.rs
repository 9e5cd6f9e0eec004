// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! This module owns the certificate objects a PIV token exposes. It
//! parses the two shapes a certificate arrives in (the PIV `0x70`
//! wrapped TLV and raw DER), re-serializes certificates and their
//! subfields for attribute queries, and can synthesize a placeholder
//! self-signed certificate around a bare public key for slots that
//! carry a key but no certificate.

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::x509::{X509Builder, X509NameBuilder, X509};

use crate::error::Result;
use crate::kasn1;
use crate::key::{Curve, EphemeralKey, PivKey};
use crate::map_err;
use crate::misc::fill_buffer;
use crate::pkcs11::*;
use crate::tlv::{decode_length, outer_length, Cursor, TAG_CERT_PIV};

/// The certificate object slot of a PKCS #11 object.
///
/// Holds at most one parsed certificate; storing over it drops the
/// previous handle, so a slot can never leak or double free one.
#[derive(Default)]
pub struct CertSlot {
    cert: Option<X509>,
}

impl CertSlot {
    /// Creates an empty slot
    pub fn new() -> CertSlot {
        CertSlot { cert: None }
    }

    /// Parses and stores a certificate from token supplied bytes.
    ///
    /// Two input shapes are recognized: the PIV format `0x70 len 0x30
    /// len ...` where the inner TLV is the DER certificate, and a raw
    /// DER certificate starting at the SEQUENCE tag. Either way the
    /// true certificate length is recomputed from the encoding itself;
    /// when it exceeds the supplied buffer the input is rejected with
    /// [CKR_ARGUMENTS_BAD]. A certificate that does not parse is
    /// [CKR_FUNCTION_FAILED]. Any previously stored certificate is
    /// dropped.
    pub fn store_from_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut cur = Cursor::new(data);
        let der = if cur.peek_u8()? == TAG_CERT_PIV {
            cur.take_u8()?;
            let (len, _) = decode_length(&mut cur)?;
            if len > cur.remaining() {
                return Err(CKR_ARGUMENTS_BAD)?;
            }
            cur.take(len)?
        } else {
            let len = outer_length(data)?;
            if len > data.len() {
                return Err(CKR_ARGUMENTS_BAD)?;
            }
            &data[..len]
        };
        let cert = map_err!(X509::from_der(der), CKR_FUNCTION_FAILED)?;
        log::debug!("stored certificate ({} bytes of DER)", der.len());
        self.cert = Some(cert);
        Ok(())
    }

    /// Stores an already parsed certificate, dropping any previous one
    pub fn store(&mut self, cert: X509) {
        self.cert = Some(cert);
    }

    /// Returns the held certificate or [CKR_GENERAL_ERROR] when the
    /// slot is empty
    pub fn get(&self) -> Result<&X509> {
        match &self.cert {
            Some(c) => Ok(c),
            None => Err(CKR_GENERAL_ERROR)?,
        }
    }

    /// Re-serializes the stored certificate to DER (CKA_VALUE),
    /// measure/fill
    pub fn serialize_raw(&self, out: Option<&mut [u8]>) -> Result<usize> {
        let der = map_err!(self.get()?.to_der(), CKR_FUNCTION_FAILED)?;
        fill_buffer(&der, out)
    }

    /// Serializes the DER subject Name (CKA_SUBJECT), measure/fill
    pub fn serialize_subject_name(
        &self,
        out: Option<&mut [u8]>,
    ) -> Result<usize> {
        let der = map_err!(
            self.get()?.subject_name().to_der(),
            CKR_FUNCTION_FAILED
        )?;
        fill_buffer(&der, out)
    }

    /// Serializes the DER issuer Name (CKA_ISSUER), measure/fill
    pub fn serialize_issuer_name(
        &self,
        out: Option<&mut [u8]>,
    ) -> Result<usize> {
        let der = map_err!(
            self.get()?.issuer_name().to_der(),
            CKR_FUNCTION_FAILED
        )?;
        fill_buffer(&der, out)
    }

    /// Serializes the serial number as a DER INTEGER
    /// (CKA_SERIAL_NUMBER), measure/fill
    pub fn serialize_serial(&self, out: Option<&mut [u8]>) -> Result<usize> {
        let bn = map_err!(
            self.get()?.serial_number().to_bn(),
            CKR_FUNCTION_FAILED
        )?;
        let magnitude = bn.to_vec();
        // BigNum serializes zero to no bytes at all, DER wants one
        let der = if magnitude.len() == 0 {
            kasn1::encode_integer(&[0])?
        } else {
            kasn1::encode_integer(&magnitude)?
        };
        fill_buffer(&der, out)
    }

    /// Extracts the certified public key as a key object
    pub fn public_key(&self) -> Result<PivKey> {
        let pkey = map_err!(self.get()?.public_key(), CKR_FUNCTION_FAILED)?;
        Ok(PivKey::from_pkey(pkey))
    }

    /// Empties the slot; idempotent
    pub fn dispose(&mut self) {
        self.cert = None;
    }
}

/// Validates that `data` starts with a parseable DER certificate and
/// returns its true length, recomputed from the SEQUENCE header rather
/// than taken from the caller
pub fn check_cert(data: &[u8]) -> Result<usize> {
    let len = outer_length(data)?;
    if len > data.len() {
        return Err(CKR_ARGUMENTS_BAD)?;
    }
    map_err!(X509::from_der(&data[..len]), CKR_FUNCTION_FAILED)?;
    Ok(len)
}

/// Builds a minimal self-signed certificate around a token supplied
/// public key, for slots where the token holds a bare key and no
/// certificate.
///
/// The public key is assembled from the PIV component blob, then signed
/// with a freshly generated P-256 key that is dropped when this call
/// returns. The certificate asserts nothing: serial 0, issuer and
/// subject CN both `common_name`, notBefore equal to notAfter. SHA-1 is
/// the signature digest for compatibility with existing middleware.
///
/// The certificate is built and signed exactly once; the caller stores
/// it in a [CertSlot] and measures/fills through
/// [CertSlot::serialize_raw], so both passes serialize the same
/// signature. Signing anew per pass would change the DER ECDSA
/// signature length between measure and fill.
pub fn make_placeholder_cert(
    pubkey_blob: &[u8],
    algorithm: CK_BYTE,
    common_name: &str,
) -> Result<X509> {
    let pubkey = PivKey::from_piv_components(pubkey_blob, algorithm)?;
    let signer = EphemeralKey::generate(Curve::P256)?;

    let mut name = map_err!(X509NameBuilder::new(), CKR_HOST_MEMORY)?;
    map_err!(
        name.append_entry_by_text("CN", common_name),
        CKR_GENERAL_ERROR
    )?;
    let name = name.build();

    let mut builder = map_err!(X509Builder::new(), CKR_HOST_MEMORY)?;
    builder.set_version(2)?; // Version 3
    builder.set_issuer_name(&name)?;
    builder.set_subject_name(&name)?;
    let zero = map_err!(BigNum::from_u32(0), CKR_HOST_MEMORY)?;
    let serial = map_err!(Asn1Integer::from_bn(&zero), CKR_HOST_MEMORY)?;
    builder.set_serial_number(&serial)?;
    let now = map_err!(Asn1Time::days_from_now(0), CKR_GENERAL_ERROR)?;
    builder.set_not_before(&now)?;
    builder.set_not_after(&now)?;
    builder.set_pubkey(pubkey.as_pkey())?;
    map_err!(
        builder.sign(signer.signing_key(), MessageDigest::sha1()),
        CKR_GENERAL_ERROR
    )?;

    let cert = builder.build();
    log::debug!("synthesized placeholder certificate for CN={}", common_name);
    Ok(cert)
}
