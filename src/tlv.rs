// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! This module implements the minimal BER/DER length decoding needed to
//! locate certificate and key component boundaries inside the opaque
//! buffers a PIV token returns. All reads go through a bounds checked
//! [Cursor]; a read can never run past the end of the source buffer.

use crate::error::Result;
use crate::pkcs11::*;

/// PIV tag wrapping a DER certificate in a GET DATA response
pub const TAG_CERT_PIV: u8 = 0x70;
/// PIV tag preceding the RSA modulus in a generated key blob
pub const TAG_RSA_MODULUS: u8 = 0x81;
/// PIV tag preceding the RSA public exponent in a generated key blob
pub const TAG_RSA_EXPONENT: u8 = 0x82;
/// PIV tag preceding the uncompressed EC point in a generated key blob
pub const TAG_EC_POINT: u8 = 0x86;

/// A bounds checked read position inside a byte buffer.
///
/// Every read returns the requested bytes and advances the position;
/// reads beyond the remaining length fail with [CKR_DATA_INVALID].
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `buf`
    pub fn new(buf: &'a [u8]) -> Cursor<'a> {
        Cursor { buf: buf, pos: 0 }
    }

    /// Number of bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the next byte without consuming it
    pub fn peek_u8(&self) -> Result<u8> {
        match self.buf.get(self.pos) {
            Some(b) => Ok(*b),
            None => Err(CKR_DATA_INVALID)?,
        }
    }

    /// Consumes and returns the next byte
    pub fn take_u8(&mut self) -> Result<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    /// Consumes and returns the next `len` bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CKR_DATA_INVALID)?;
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }
}

/// Decodes a BER/DER length field at the cursor position.
///
/// Returns the length value and the number of octets the length field
/// itself occupied (1 for short form, 1 + N for long form). Long form
/// encodings claiming more octets than remain in the buffer, or more
/// than fit a `usize`, fail with [CKR_DATA_INVALID]. The indefinite
/// length marker (0x80) is not valid DER and is rejected as well.
pub fn decode_length(cur: &mut Cursor) -> Result<(usize, usize)> {
    let first = cur.take_u8()?;
    if first & 0x80 == 0 {
        return Ok((usize::from(first), 1));
    }
    let octets = usize::from(first & 0x7f);
    if octets == 0 || octets > std::mem::size_of::<usize>() {
        return Err(CKR_DATA_INVALID)?;
    }
    let mut val: usize = 0;
    for b in cur.take(octets)? {
        val = (val << 8) | usize::from(*b);
    }
    log::trace!("long form TLV length {} ({} octets)", val, octets);
    Ok((val, 1 + octets))
}

/// Decodes the length field of the DER structure starting at `buf[0]`
/// and returns the total size of that structure, tag and length octets
/// included. This is how the true certificate size is recomputed from a
/// buffer whose declared length is not trusted.
pub fn outer_length(buf: &[u8]) -> Result<usize> {
    let mut cur = Cursor::new(buf);
    let _tag = cur.take_u8()?;
    let (body, width) = decode_length(&mut cur)?;
    match body.checked_add(1 + width) {
        Some(total) => Ok(total),
        None => Err(CKR_DATA_INVALID)?,
    }
}
