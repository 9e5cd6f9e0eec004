// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

#![warn(missing_docs)]

//! This is pivcs11
//!
//! The token-object core of a PKCS #11 module for PIV smart cards.
//! It materializes key and certificate objects from the raw TLV blobs a
//! PIV applet hands back, answers PKCS #11 attribute queries from those
//! objects, and prepares digests for raw on-card signing (PKCS #1 v1.5
//! and PSS padding). Session, slot and APDU transport layers live in the
//! embedding module, not here.

pub mod pkcs11;

pub mod error;

mod misc;

pub mod cert;
pub mod hash;
pub mod kasn1;
pub mod key;
pub mod rng;
pub mod rsa;
pub mod tlv;

mod log;

pub use crate::error::Result;

#[cfg(test)]
mod tests;
