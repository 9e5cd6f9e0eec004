// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

mod cert;
mod hash;
mod tlv;

/* encodes a TLV with minimal DER length octets, for test fixtures */
pub fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
    let len = value.len();
    let mut out = vec![tag];
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(0x81);
        out.push(len as u8);
    } else {
        assert!(len <= 0xffff);
        out.push(0x82);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
    out.extend_from_slice(value);
    out
}
