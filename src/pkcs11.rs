// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! The subset of PKCS #11 (Cryptoki) types and constants this crate
//! surfaces to its callers. The embedding module links against the full
//! `pkcs11.h` bindings; only the values exchanged across this crate's
//! boundary are mirrored here.

#![allow(non_camel_case_types)]

use std::os::raw::c_ulong;

/// Unsigned value, at least 32 bits long
pub type CK_ULONG = c_ulong;
/// An unsigned 8-bit value
pub type CK_BYTE = u8;
/// Cryptoki function return value
pub type CK_RV = CK_ULONG;
/// A value that identifies a key type
pub type CK_KEY_TYPE = CK_ULONG;

/// A general failure occurred on the device or library
pub const CKR_GENERAL_ERROR: CK_RV = 0x00000005;
/// The requested function could not be performed
pub const CKR_FUNCTION_FAILED: CK_RV = 0x00000006;
/// Invalid arguments were provided to the function
pub const CKR_ARGUMENTS_BAD: CK_RV = 0x00000007;
/// The library ran out of memory
pub const CKR_HOST_MEMORY: CK_RV = 0x00000002;
/// The plaintext input data to a cryptographic operation is invalid
pub const CKR_DATA_INVALID: CK_RV = 0x00000020;
/// The output of the function is too large to fit in the supplied buffer
pub const CKR_BUFFER_TOO_SMALL: CK_RV = 0x00000150;

/// RSA key type
pub const CKK_RSA: CK_KEY_TYPE = 0x00000000;
/// EC (also related to ECDSA) key type
pub const CKK_EC: CK_KEY_TYPE = 0x00000003;
/// Marker for vendor defined key types
pub const CKK_VENDOR_DEFINED: CK_KEY_TYPE = 0x80000000;
