use bytes::{Buf, Bytes};

use crate::error::ParserError;
use crate::models::{Afi, AsnLength, BgpMessageType, InnerType, RawEntry};
use crate::parser::attributes::{parse_attributes, AttrContext};
use crate::parser::utils::{parse_nlri_list, ReadUtils};

const BGP_HEADER_LENGTH: usize = 19;

/// BGP message
///
/// Format:
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                                                               +
/// |                                                               |
/// +                                                               +
/// |                           Marker                              |
/// +                                                               +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          Length               |      Type     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Sets `entry.inner_type` from the header and, for UPDATE messages, fills in prefixes and
/// attributes. OPEN, NOTIFICATION, KEEPALIVE and ROUTE-REFRESH bodies are not decoded.
pub fn parse_bgp_message(
    data: &mut Bytes,
    add_path: bool,
    asn_len: &AsnLength,
    entry: &mut RawEntry,
) -> Result<(), ParserError> {
    // https://tools.ietf.org/html/rfc4271#section-4
    data.has_n_remaining(BGP_HEADER_LENGTH)?;
    let marker = data.split_to(16);
    if marker.iter().any(|b| *b != 0xff) {
        return Err(ParserError::ParseError("invalid BGP message marker".to_string()));
    }

    let length = data.read_u16()? as usize;
    if length < BGP_HEADER_LENGTH {
        return Err(ParserError::ParseError(format!(
            "invalid BGP message length {}",
            length
        )));
    }
    let msg_type = BgpMessageType::try_from(data.read_u8()?)?;

    let body_length = length - BGP_HEADER_LENGTH;
    if body_length > data.remaining() {
        return Err(ParserError::TruncatedMsg(format!(
            "BGP message length {} exceeds the {} bytes available",
            length,
            data.remaining() + BGP_HEADER_LENGTH
        )));
    }
    let body = data.split_to(body_length);

    entry.inner_type = Some(InnerType::Message(msg_type));
    if msg_type == BgpMessageType::UPDATE {
        parse_bgp_update_message(body, add_path, asn_len, entry)?;
    }
    Ok(())
}

/// Parse a BGP UPDATE body: withdrawn routes, path attributes and trailing IPv4 NLRI.
///
/// Withdrawn routes come first in `entry.withdrawn`, followed by any MP_UNREACH_NLRI prefixes.
/// MP_REACH_NLRI prefixes come first in `entry.announced`, followed by the IPv4 NLRI.
pub fn parse_bgp_update_message(
    mut input: Bytes,
    add_path: bool,
    asn_len: &AsnLength,
    entry: &mut RawEntry,
) -> Result<(), ParserError> {
    let withdrawn_length = input.read_u16()? as usize;
    input.has_n_remaining(withdrawn_length)?;
    let withdrawn_bytes = input.split_to(withdrawn_length);
    entry
        .withdrawn
        .extend(parse_nlri_list(withdrawn_bytes, add_path, &Afi::Ipv4)?);

    let attribute_length = input.read_u16()? as usize;
    input.has_n_remaining(attribute_length)?;
    let attr_data_slice = input.split_to(attribute_length);
    parse_attributes(
        attr_data_slice,
        asn_len,
        add_path,
        AttrContext::Update,
        entry,
    )?;

    // the rest are NLRI
    entry
        .announced
        .extend(parse_nlri_list(input, add_path, &Afi::Ipv4)?);
    Ok(())
}
