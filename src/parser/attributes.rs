//! BGP path attributes, rendered straight into a [RawEntry].
//!
//! Only the attributes that reach a [Message](crate::Message) are decoded: ORIGIN, AS_PATH,
//! NEXT_HOP, COMMUNITIES, MP_REACH_NLRI and MP_UNREACH_NLRI. Everything else is skipped.
use bytes::{Buf, Bytes};
use itertools::Itertools;
use log::{debug, warn};
use std::net::{IpAddr, Ipv6Addr};

use crate::error::ParserError;
use crate::models::{Afi, AsnLength, AttrFlags, RawEntry};
use crate::parser::utils::{parse_nlri_list, ReadUtils};

const ATTR_ORIGIN: u8 = 1;
const ATTR_AS_PATH: u8 = 2;
const ATTR_NEXT_HOP: u8 = 3;
const ATTR_COMMUNITIES: u8 = 8;
const ATTR_MP_REACH_NLRI: u8 = 14;
const ATTR_MP_UNREACH_NLRI: u8 = 15;

const AS_PATH_AS_SET: u8 = 1;
const AS_PATH_AS_SEQUENCE: u8 = 2;
// https://datatracker.ietf.org/doc/html/rfc5065
const AS_PATH_CONFED_SEQUENCE: u8 = 3;
const AS_PATH_CONFED_SET: u8 = 4;

/// Where an attribute block came from.
///
/// RIB entries may carry MP_REACH_NLRI in the abbreviated form of RFC 6396 section 4.3.4, which
/// holds only the next hop; the prefix comes from the enclosing RIB record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrContext {
    Update,
    Rib(Afi),
}

/// Parse an attribute block and fill in the matching fields of `entry`.
///
/// Prefixes from MP_REACH_NLRI and MP_UNREACH_NLRI are appended to `entry.announced` and
/// `entry.withdrawn`. A next hop from MP_REACH_NLRI replaces the one from NEXT_HOP.
pub fn parse_attributes(
    mut data: Bytes,
    asn_len: &AsnLength,
    add_path: bool,
    context: AttrContext,
    entry: &mut RawEntry,
) -> Result<(), ParserError> {
    // each attribute is at least 3 bytes: flag(1) + type(1) + length(1)
    while data.remaining() >= 3 {
        let flag = AttrFlags::from_bits_retain(data.read_u8()?);
        let attr_type = data.read_u8()?;
        let attr_length = match flag.contains(AttrFlags::EXTENDED) {
            false => data.read_u8()? as usize,
            true => data.read_u16()? as usize,
        };

        debug!(
            "reading attribute: type -- {}, length -- {}",
            attr_type, attr_length
        );
        data.has_n_remaining(attr_length)?;
        let attr_data = data.split_to(attr_length);

        let res = match attr_type {
            ATTR_ORIGIN => parse_origin(attr_data).map(|origin| entry.origin = origin),
            ATTR_AS_PATH => parse_as_path(attr_data, asn_len).map(|path| entry.as_path = path),
            ATTR_NEXT_HOP => parse_next_hop(attr_data).map(|nh| entry.next_hop = Some(nh)),
            ATTR_COMMUNITIES => {
                parse_communities(attr_data).map(|communities| entry.communities = communities)
            }
            ATTR_MP_REACH_NLRI => parse_mp_reach(attr_data, add_path, context, entry),
            ATTR_MP_UNREACH_NLRI => parse_mp_unreach(attr_data, add_path, entry),
            _ => Ok(()),
        };

        match res {
            Ok(()) => {}
            Err(e) if flag.contains(AttrFlags::PARTIAL) => {
                // it's ok to have errors when reading partial bytes
                warn!("PARTIAL: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn parse_origin(mut input: Bytes) -> Result<String, ParserError> {
    let origin = match input.read_u8()? {
        0 => "IGP",
        1 => "EGP",
        2 => "INCOMPLETE",
        _ => "UNKNOWN",
    };
    Ok(origin.to_string())
}

/// Render an AS path the way route collectors usually print it.
///
/// Sequences are space-separated ASNs, sets are `{a,b}`, confederation sequences `(a b)` and
/// confederation sets `[a,b]`. Segments are joined by a single space.
fn parse_as_path(mut input: Bytes, asn_len: &AsnLength) -> Result<String, ParserError> {
    let mut segments: Vec<String> = Vec::with_capacity(2);
    while input.remaining() > 0 {
        let segment_type = input.read_u8()?;
        let count = input.read_u8()? as usize;
        let mut asns = Vec::with_capacity(count);
        for _ in 0..count {
            asns.push(input.read_asn(asn_len)?);
        }
        let rendered = match segment_type {
            AS_PATH_AS_SEQUENCE => asns.iter().join(" "),
            AS_PATH_AS_SET => format!("{{{}}}", asns.iter().join(",")),
            AS_PATH_CONFED_SEQUENCE => format!("({})", asns.iter().join(" ")),
            AS_PATH_CONFED_SET => format!("[{}]", asns.iter().join(",")),
            _ => {
                return Err(ParserError::ParseError(format!(
                    "Invalid AS path segment type: {segment_type}"
                )))
            }
        };
        segments.push(rendered);
    }
    Ok(segments.join(" "))
}

fn parse_next_hop(mut input: Bytes) -> Result<IpAddr, ParserError> {
    match input.len() {
        4 => input.read_address(&Afi::Ipv4),
        16 => input.read_address(&Afi::Ipv6),
        len => Err(ParserError::ParseError(format!(
            "Invalid next hop length: {len}"
        ))),
    }
}

/// Next hop inside MP_REACH_NLRI. A 32-byte value is a global plus link-local pair; the global
/// address is kept.
fn parse_mp_next_hop(mut input: Bytes) -> Result<Option<IpAddr>, ParserError> {
    let next_hop = match input.len() {
        0 => None,
        4 => Some(input.read_address(&Afi::Ipv4)?),
        16 | 32 => Some(IpAddr::V6(Ipv6Addr::from(input.get_u128()))),
        len => {
            debug!("unsupported next hop length {}, ignored", len);
            None
        }
    };
    Ok(next_hop)
}

fn parse_communities(mut input: Bytes) -> Result<String, ParserError> {
    let mut communities = Vec::with_capacity(input.remaining() / 4);
    while input.remaining() > 0 {
        let asn = input.read_u16()?;
        let value = input.read_u16()?;
        communities.push(format!("{}:{}", asn, value));
    }
    Ok(communities.join(" "))
}

/// <https://datatracker.ietf.org/doc/html/rfc4760#section-3>
/// ```text
/// +---------------------------------------------------------+
/// | Address Family Identifier (2 octets)                    |
/// +---------------------------------------------------------+
/// | Subsequent Address Family Identifier (1 octet)          |
/// +---------------------------------------------------------+
/// | Length of Next Hop Network Address (1 octet)            |
/// +---------------------------------------------------------+
/// | Network Address of Next Hop (variable)                  |
/// +---------------------------------------------------------+
/// | Reserved (1 octet)                                      |
/// +---------------------------------------------------------+
/// | Network Layer Reachability Information (variable)       |
/// +---------------------------------------------------------+
/// ```
fn parse_mp_reach(
    mut input: Bytes,
    add_path: bool,
    context: AttrContext,
    entry: &mut RawEntry,
) -> Result<(), ParserError> {
    input.has_n_remaining(1)?;
    let first_byte_zero = input[0] == 0;

    if let AttrContext::Rib(_) = context {
        if !first_byte_zero {
            // abbreviated form: next hop length and next hop only
            let next_hop_length = input.read_u8()? as usize;
            let next_hop_bytes = input.read_n_bytes(next_hop_length)?;
            if let Some(next_hop) = parse_mp_next_hop(next_hop_bytes)? {
                entry.next_hop = Some(next_hop);
            }
            return Ok(());
        }
    }

    let afi = input.read_afi()?;
    let _safi = input.read_u8()?;
    let next_hop_length = input.read_u8()? as usize;
    let next_hop_bytes = input.read_n_bytes(next_hop_length)?;
    if let Some(next_hop) = parse_mp_next_hop(next_hop_bytes)? {
        entry.next_hop = Some(next_hop);
    }
    // skip reserved byte
    if input.read_u8()? != 0 {
        warn!("NLRI reserved byte not 0");
    }

    let prefixes = parse_nlri_list(input, add_path, &afi)?;
    match context {
        AttrContext::Update => entry.announced.extend(prefixes),
        // the enclosing RIB record already supplied the prefix
        AttrContext::Rib(_) => {
            for prefix in prefixes {
                if !entry.announced.contains(&prefix) {
                    entry.announced.push(prefix);
                }
            }
        }
    }
    Ok(())
}

fn parse_mp_unreach(
    mut input: Bytes,
    add_path: bool,
    entry: &mut RawEntry,
) -> Result<(), ParserError> {
    let afi = input.read_afi()?;
    let _safi = input.read_u8()?;
    entry.withdrawn.extend(parse_nlri_list(input, add_path, &afi)?);
    Ok(())
}
