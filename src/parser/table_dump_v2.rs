use bytes::{Buf, Bytes};
use ipnet::IpNet;
use log::warn;
use std::net::IpAddr;

use crate::error::ParserError;
use crate::models::{Afi, AsnLength, CommonHeader, PeerType, RawEntry, TableDumpV2Type};
use crate::parser::attributes::{parse_attributes, AttrContext};
use crate::parser::utils::ReadUtils;

/// A vantage point listed in a PEER_INDEX_TABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub peer_asn: u32,
    pub peer_address: IpAddr,
}

/// Parse the body of a TABLE_DUMP_V2 record.
///
/// A PEER_INDEX_TABLE replaces `peers` and yields a single header-only entry. RIB_IPV4_UNICAST
/// and RIB_IPV6_UNICAST yield one entry per RIB entry, i.e. per peer that has a route for the
/// prefix. Every other subtype yields a header-only entry.
pub fn parse_table_dump_v2(
    header: &CommonHeader,
    mut data: Bytes,
    peers: &mut Vec<Peer>,
) -> Result<Vec<RawEntry>, ParserError> {
    let rib_type = match TableDumpV2Type::try_from(header.entry_subtype) {
        Ok(t) => t,
        Err(_) => return Ok(vec![RawEntry::from_header(header)]),
    };

    match rib_type {
        TableDumpV2Type::PeerIndexTable => {
            *peers = parse_peer_index_table(&mut data)?;
            Ok(vec![RawEntry::from_header(header)])
        }
        TableDumpV2Type::RibIpv4Unicast => parse_rib_afi_entries(header, data, Afi::Ipv4, peers),
        TableDumpV2Type::RibIpv6Unicast => parse_rib_afi_entries(header, data, Afi::Ipv6, peers),
        _ => Ok(vec![RawEntry::from_header(header)]),
    }
}

/// Parses a PEER_INDEX_TABLE body.
///
/// RFC: <https://www.rfc-editor.org/rfc/rfc6396#section-4.3.1>
pub fn parse_peer_index_table(data: &mut Bytes) -> Result<Vec<Peer>, ParserError> {
    let _collector_bgp_id = data.read_u32()?;
    // read and ignore view name
    let view_name_length = data.read_u16()?;
    data.read_n_bytes(view_name_length as usize)?;

    let peer_count = data.read_u16()?;
    let mut peers = Vec::with_capacity(peer_count as usize);
    for _index in 0..peer_count {
        let peer_type = PeerType::from_bits_retain(data.read_u8()?);
        let afi = match peer_type.contains(PeerType::ADDRESS_FAMILY_IPV6) {
            true => Afi::Ipv6,
            false => Afi::Ipv4,
        };
        let asn_len = match peer_type.contains(PeerType::AS_SIZE_32BIT) {
            true => AsnLength::Bits32,
            false => AsnLength::Bits16,
        };

        let _peer_bgp_id = data.read_u32()?;
        let peer_address = data.read_address(&afi)?;
        let peer_asn = data.read_asn(&asn_len)?;
        peers.push(Peer {
            peer_asn,
            peer_address,
        });
    }
    Ok(peers)
}

/// RIB AFI-specific entries
///
/// <https://tools.ietf.org/html/rfc6396#section-4.3>
///
/// A RIB entry that fails to parse ends the record; entries read before it are kept.
fn parse_rib_afi_entries(
    header: &CommonHeader,
    mut data: Bytes,
    afi: Afi,
    peers: &[Peer],
) -> Result<Vec<RawEntry>, ParserError> {
    let _sequence_number = data.read_u32()?;
    let prefix = data.read_nlri_prefix(&afi, false)?;
    let entry_count = data.read_u16()?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _i in 0..entry_count {
        match parse_rib_entry(header, &mut data, afi, prefix, peers) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => {
                warn!("early break due to error {}", e);
                break;
            }
        }
    }
    Ok(entries)
}

/// RIB entry: one prefix per entry
///
/// <https://datatracker.ietf.org/doc/html/rfc6396#section-4.3.4>
/// ```text
///         0                   1                   2                   3
///         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |         Peer Index            |
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                         Originated Time                       |
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |      Attribute Length         |
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                    BGP Attributes... (variable)
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The entry is timestamped with the record header time, not the originated time. Entries that
/// reference a peer missing from the peer index table are skipped.
fn parse_rib_entry(
    header: &CommonHeader,
    input: &mut Bytes,
    afi: Afi,
    prefix: IpNet,
    peers: &[Peer],
) -> Result<Option<RawEntry>, ParserError> {
    if input.remaining() < 8 {
        return Err(ParserError::TruncatedMsg("truncated RIB entry".to_string()));
    }

    let peer_index = input.read_u16()?;
    let _originated_time = input.read_u32()?;
    let attribute_length = input.read_u16()? as usize;
    input.has_n_remaining(attribute_length)?;
    let attr_data_slice = input.split_to(attribute_length);

    let peer = match peers.get(peer_index as usize) {
        Some(peer) => peer,
        None => {
            warn!("RIB entry references unknown peer index {}", peer_index);
            return Ok(None);
        }
    };

    let mut entry = RawEntry::from_header(header);
    entry.peer_asn = peer.peer_asn;
    entry.peer_addr = Some(peer.peer_address);
    entry.announced.push(prefix);
    parse_attributes(
        attr_data_slice,
        &AsnLength::Bits32,
        false,
        AttrContext::Rib(afi),
        &mut entry,
    )?;
    Ok(Some(entry))
}
