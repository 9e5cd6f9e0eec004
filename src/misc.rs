// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

/* misc utilities that do not really belong in any module */

use crate::error::Result;
use crate::pkcs11::*;

/// Implements the measure/fill discipline every exporter in this crate
/// follows: with `out` set to [None] only the required length is
/// reported; with a buffer that is too small [CKR_BUFFER_TOO_SMALL] is
/// returned and the buffer is left untouched; otherwise the payload is
/// copied out and its length returned.
pub fn fill_buffer(src: &[u8], out: Option<&mut [u8]>) -> Result<usize> {
    let buf = match out {
        None => return Ok(src.len()),
        Some(b) => b,
    };
    if buf.len() < src.len() {
        return Err(CKR_BUFFER_TOO_SMALL)?;
    }
    buf[..src.len()].copy_from_slice(src);
    Ok(src.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_buffer_measures_and_fills() {
        let src = [1u8, 2, 3];
        assert_eq!(fill_buffer(&src, None).unwrap(), 3);

        let mut small = [0u8; 2];
        let e = fill_buffer(&src, Some(&mut small)).unwrap_err();
        assert_eq!(e.rv(), CKR_BUFFER_TOO_SMALL);
        assert_eq!(small, [0u8; 2]);

        let mut exact = [0u8; 3];
        assert_eq!(fill_buffer(&src, Some(&mut exact)).unwrap(), 3);
        assert_eq!(exact, src);
    }
}
