use crate::models::{CommonHeader, EntryType};
use crate::ParserError;
use bytes::Buf;
use std::io::{ErrorKind, Read};

/// MRT common header [RFC6396][header].
///
/// [header]: https://tools.ietf.org/html/rfc6396#section-4.1
///
/// Records of type `BGP4MP_ET` carry an extra 4-byte microsecond timestamp after the length
/// field. The returned `length` is the message length only, for both forms.
///
/// A clean end of input before the first header byte yields [ParserError::EofExpected]; running
/// out in the middle of a header yields [ParserError::EofError].
pub fn parse_common_header<T: Read>(input: &mut T) -> Result<CommonHeader, ParserError> {
    let mut raw_bytes = [0u8; 12];
    read_header_bytes(input, &mut raw_bytes)?;
    let mut data = &raw_bytes[..];

    let timestamp = data.get_u32();
    let entry_type = data.get_u16();
    let entry_subtype = data.get_u16();
    // the length field does not include the length of the common header
    let mut length = data.get_u32();

    let microsecond_timestamp = if entry_type == EntryType::BGP4MP_ET as u16 {
        if length < 4 {
            return Err(ParserError::ParseError(
                "invalid MRT header length for ET record: length < 4".into(),
            ));
        }
        length -= 4;
        let mut raw_bytes: [u8; 4] = [0; 4];
        input.read_exact(&mut raw_bytes)?;
        Some((&raw_bytes[..]).get_u32())
    } else {
        None
    };

    Ok(CommonHeader {
        timestamp,
        microsecond_timestamp,
        entry_type,
        entry_subtype,
        length,
    })
}

fn read_header_bytes<T: Read>(input: &mut T, buf: &mut [u8]) -> Result<(), ParserError> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Err(ParserError::EofExpected),
            Ok(0) => {
                return Err(ParserError::EofError(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("incomplete MRT header: {} of {} bytes", filled, buf.len()),
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
