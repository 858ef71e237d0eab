//! Minimal length-delimited record framing for the inter-peer wire
//! protocol: a 4-byte big-endian length prefix per field,
//! followed by that many bytes. Only the response side is framed this
//! way; the request's `group`/`key` travel as URL path segments
//! instead (see `client.rs`/`server.rs`), so there is no request-side
//! encoder here.

use geecache_common::Error;

fn write_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u32).to_be_bytes());
    buf.extend_from_slice(field);
}

fn read_field<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8], Error> {
    if buf.len() < *pos + 4 {
        return Err(Error::BadRequest("truncated field length".into()));
    }
    let len = u32::from_be_bytes(buf[*pos..*pos + 4].try_into().unwrap()) as usize;
    *pos += 4;
    if buf.len() < *pos + len {
        return Err(Error::BadRequest("truncated field body".into()));
    }
    let field = &buf[*pos..*pos + len];
    *pos += len;
    Ok(field)
}

/// Response record: `{value}`, raw bytes.
pub fn encode_response(value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + value.len());
    write_field(&mut buf, value);
    buf
}

pub fn decode_response(buf: &[u8]) -> Result<Vec<u8>, Error> {
    let mut pos = 0;
    let value = read_field(buf, &mut pos)?;
    Ok(value.to_vec())
}
