use std::io::{self, BufRead, ErrorKind, Read};

use crate::Error;
use bytes::{BufMut, Bytes, BytesMut};

// Frame layout
// field([u8; n]) + '\n'

// req layout
// operation frame + operand_a frame + operand_b frame

// rsp layout
// one result or fault line frame

/// the frame terminator, never allowed inside a field
pub const TERMINATOR: u8 = b'\n';

/// max field length in bytes, terminator excluded
pub const FRAME_MAX_LEN: usize = 1024;

/// append one framed field to the buffer
///
/// fields that contain a line boundary are refused, nothing is written in that case
pub fn encode_into(buf: &mut BytesMut, field: &str) -> Result<(), Error> {
    if field.bytes().any(|b| b == TERMINATOR || b == b'\r') {
        return Err(Error::InvalidField(field.to_owned()));
    }
    if field.len() > FRAME_MAX_LEN {
        return Err(Error::InvalidField(format!(
            "field too long. len={}",
            field.len()
        )));
    }

    buf.reserve(field.len() + 1);
    buf.put_slice(field.as_bytes());
    buf.put_u8(TERMINATOR);
    Ok(())
}

/// encode a single field into a standalone frame
pub fn encode(field: &str) -> Result<Bytes, Error> {
    let mut buf = BytesMut::with_capacity(field.len() + 1);
    encode_into(&mut buf, field)?;
    Ok(buf.freeze())
}

/// decode one field from the reader
///
/// returns `Ok(None)` when the stream ends, including the case where it ends
/// in the middle of a frame; the partial bytes are dropped. An empty field is
/// `Ok(Some(""))`.
pub fn decode_from<R: BufRead>(r: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();

    // never buffer more than one max sized frame
    let limit = FRAME_MAX_LEN as u64 + 2;
    let n = Read::take(&mut *r, limit).read_until(TERMINATOR, buf)?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&TERMINATOR) {
        if n as u64 == limit {
            let s = format!("decode too big frame. len>{FRAME_MAX_LEN}");
            error!("{s}");
            return Err(io::Error::new(ErrorKind::InvalidData, s));
        }
        info!("stream closed in the middle of a frame, len={n}");
        return Ok(None);
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    if buf.len() > FRAME_MAX_LEN {
        let s = format!("decode too big frame. len={}", buf.len());
        error!("{s}");
        return Err(io::Error::new(ErrorKind::InvalidData, s));
    }

    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}
