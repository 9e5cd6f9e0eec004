// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

//! This module implements the error types and helper functions/macros
//! used throughout the crate. Every failure carries the PKCS #11 return
//! value the embedding module must surface to its caller.

use std::error;
use std::fmt;

use crate::pkcs11::*;

/// This is the Result type used throughout the crate, the error type is
/// always [Error]
pub type Result<T> = std::result::Result<T, Error>;

/// The Error object used throughout the crate
#[derive(Debug)]
pub struct Error {
    /// The PKCS #11 error this error maps to
    ckrv: CK_RV,
    /// The originating error, when this error is generated as a
    /// consequence of a lower layer error
    origin: Option<Box<dyn error::Error>>,
    /// An optional error message
    errmsg: Option<String>,
}

impl Error {
    /// Creates an [Error] from a PKCS #11 return value
    pub fn ck_rv(ckrv: CK_RV) -> Error {
        Error {
            ckrv: ckrv,
            origin: None,
            errmsg: None,
        }
    }

    /// Creates an [Error] from a PKCS #11 return value, preserving the
    /// underlying error that caused it
    pub fn ck_rv_from_error<E>(ckrv: CK_RV, error: E) -> Error
    where
        E: Into<Box<dyn error::Error>>,
    {
        Error {
            ckrv: ckrv,
            origin: Some(error.into()),
            errmsg: None,
        }
    }

    /// Creates an [Error] from a PKCS #11 return value with an
    /// additional error message
    pub fn ck_rv_with_errmsg(ckrv: CK_RV, errmsg: String) -> Error {
        Error {
            ckrv: ckrv,
            origin: None,
            errmsg: Some(errmsg),
        }
    }

    /// Returns the PKCS #11 return value of this error
    pub fn rv(&self) -> CK_RV {
        self.ckrv
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref e) = self.errmsg {
            return write!(f, "{}", e);
        }
        if let Some(ref e) = self.origin {
            return e.fmt(f);
        }
        match self.ckrv {
            CKR_GENERAL_ERROR => write!(f, "CKR_GENERAL_ERROR"),
            CKR_FUNCTION_FAILED => write!(f, "CKR_FUNCTION_FAILED"),
            CKR_ARGUMENTS_BAD => write!(f, "CKR_ARGUMENTS_BAD"),
            CKR_HOST_MEMORY => write!(f, "CKR_HOST_MEMORY"),
            CKR_DATA_INVALID => write!(f, "CKR_DATA_INVALID"),
            CKR_BUFFER_TOO_SMALL => write!(f, "CKR_BUFFER_TOO_SMALL"),
            _ => write!(f, "CKR {:#010x}", self.ckrv),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.origin.as_deref()
    }
}

impl From<CK_RV> for Error {
    fn from(ckrv: CK_RV) -> Error {
        Error::ck_rv(ckrv)
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(error: openssl::error::ErrorStack) -> Error {
        Error::ck_rv_from_error(CKR_GENERAL_ERROR, error)
    }
}

impl From<asn1::WriteError> for Error {
    fn from(error: asn1::WriteError) -> Error {
        Error::ck_rv_with_errmsg(
            CKR_GENERAL_ERROR,
            format!("DER encoding failed: {:?}", error),
        )
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::ck_rv_from_error(CKR_GENERAL_ERROR, error)
    }
}

/// Maps the error of a fallible expression to a specific PKCS #11
/// return value, preserving the original error as the source
#[macro_export]
macro_rules! map_err {
    ($map:expr, $err:expr) => {{
        $map.map_err(|e| $crate::error::Error::ck_rv_from_error($err, e))
    }};
}
