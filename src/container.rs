//! Artifact container headers.
//!
//! Every artifact opens with a 4 byte magic identifying the codec that
//! produced it.  Before any decode state is built the header is checked,
//! first against a short list of well-known foreign signatures so that a
//! PNG or JPEG handed to an expander produces a useful message instead
//! of a byte-level decode failure, then against the expected magic.

use crate::Error;

pub const MAGIC_LEN: usize = 4;

pub const HUFFMAN_MAGIC: [u8;4] = *b"HUF1";
pub const RLE_MAGIC: [u8;4] = *b"RLE1";
pub const LZ77_MAGIC: [u8;4] = *b"LZ77";

const PNG_SIG: [u8;4] = [0x89,b'P',b'N',b'G'];
const JPEG_SOI: [u8;2] = [0xFF,0xD8];

/// Verify the artifact magic, rejecting known foreign formats first.
/// Returns the artifact body following the header.
pub fn check_magic<'a>(dat: &'a [u8],expected: &[u8;4],codec: &str) -> Result<&'a [u8],Error> {
    if dat.starts_with(&PNG_SIG) {
        return Err(Error::WrongFormat(format!("PNG image offered to the {} expander",codec)));
    }
    if dat.starts_with(&JPEG_SOI) || dat.starts_with(b"JFIF") {
        return Err(Error::WrongFormat(format!("JPEG image offered to the {} expander",codec)));
    }
    if dat.len() < MAGIC_LEN || dat[0..MAGIC_LEN] != *expected {
        return Err(Error::WrongFormat(format!("not a {} artifact",codec)));
    }
    Ok(&dat[MAGIC_LEN..])
}

#[test]
fn accepts_own_magic() {
    let dat = [b'R',b'L',b'E',b'1',0x00,0x01];
    let body = check_magic(&dat,&RLE_MAGIC,"rle").expect("magic rejected");
    assert_eq!(body,&[0x00,0x01]);
}

#[test]
fn rejects_foreign_signatures() {
    let png = [0x89,0x50,0x4E,0x47,0x0D,0x0A,0x1A,0x0A];
    match check_magic(&png,&HUFFMAN_MAGIC,"huffman") {
        Err(Error::WrongFormat(msg)) => assert!(msg.contains("PNG")),
        _ => panic!("PNG signature accepted")
    }
    let jpeg = [0xFF,0xD8,0xFF,0xE0];
    match check_magic(&jpeg,&LZ77_MAGIC,"lz77") {
        Err(Error::WrongFormat(msg)) => assert!(msg.contains("JPEG")),
        _ => panic!("JPEG signature accepted")
    }
}

#[test]
fn rejects_wrong_codec_and_short_input() {
    let dat = [b'H',b'U',b'F',b'1',0x00];
    assert!(matches!(check_magic(&dat,&RLE_MAGIC,"rle"),Err(Error::WrongFormat(_))));
    assert!(matches!(check_magic(&[b'R'],&RLE_MAGIC,"rle"),Err(Error::WrongFormat(_))));
}
