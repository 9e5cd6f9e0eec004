// Copyright 2024 The pivcs11 developers
// See LICENSE.txt file for terms

use crate::pkcs11::*;
use crate::tlv::{decode_length, outer_length, Cursor};

#[test]
fn short_form_lengths() {
    for val in 0u8..=127 {
        let buf = [val, 0xaa];
        let mut cur = Cursor::new(&buf);
        let (len, width) = decode_length(&mut cur).unwrap();
        assert_eq!(len, usize::from(val));
        assert_eq!(width, 1);
        assert_eq!(cur.remaining(), 1);
    }
}

#[test]
fn long_form_lengths() {
    for val in 128u8..=255 {
        let buf = [0x81, val];
        let mut cur = Cursor::new(&buf);
        let (len, width) = decode_length(&mut cur).unwrap();
        assert_eq!(len, usize::from(val));
        assert_eq!(width, 2);
    }

    let buf = [0x82, 0x01, 0x00];
    let mut cur = Cursor::new(&buf);
    assert_eq!(decode_length(&mut cur).unwrap(), (256, 3));

    let buf = [0x82, 0xff, 0xff];
    let mut cur = Cursor::new(&buf);
    assert_eq!(decode_length(&mut cur).unwrap(), (0xffff, 3));
}

#[test]
fn malformed_lengths() {
    /* claims 4 length octets, only 2 present */
    let buf = [0x84, 0x00, 0x01];
    let mut cur = Cursor::new(&buf);
    let e = decode_length(&mut cur).unwrap_err();
    assert_eq!(e.rv(), CKR_DATA_INVALID);

    /* more octets than a usize can hold */
    let buf = [0x89, 1, 1, 1, 1, 1, 1, 1, 1, 1];
    let mut cur = Cursor::new(&buf);
    let e = decode_length(&mut cur).unwrap_err();
    assert_eq!(e.rv(), CKR_DATA_INVALID);

    /* indefinite form is not DER */
    let buf = [0x80, 0x00];
    let mut cur = Cursor::new(&buf);
    let e = decode_length(&mut cur).unwrap_err();
    assert_eq!(e.rv(), CKR_DATA_INVALID);

    /* nothing at all */
    let mut cur = Cursor::new(&[]);
    let e = decode_length(&mut cur).unwrap_err();
    assert_eq!(e.rv(), CKR_DATA_INVALID);
}

#[test]
fn cursor_bounds() {
    let buf = [1u8, 2, 3];
    let mut cur = Cursor::new(&buf);
    assert_eq!(cur.take(2).unwrap(), &[1, 2]);
    assert_eq!(cur.remaining(), 1);
    let e = cur.take(2).unwrap_err();
    assert_eq!(e.rv(), CKR_DATA_INVALID);
    /* a failed read does not consume */
    assert_eq!(cur.take_u8().unwrap(), 3);
}

#[test]
fn outer_length_rejects_overflowing_length() {
    /* 8 length octets of 0xff; adding tag and width octets would wrap */
    let buf = [0x30, 0x88, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    let e = outer_length(&buf).unwrap_err();
    assert_eq!(e.rv(), CKR_DATA_INVALID);
}

#[test]
fn outer_length_recomputes_structure_size() {
    let buf = [0x30, 0x03, 1, 2, 3, 0xee, 0xee];
    assert_eq!(outer_length(&buf).unwrap(), 5);

    let long = crate::tests::tlv(0x30, &[0u8; 200]);
    assert_eq!(outer_length(&long).unwrap(), 203);
}
