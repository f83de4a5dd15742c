//! MRT-level types produced by the entry decoder.
use bitflags::bitflags;
use ipnet::IpNet;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::IpAddr;

/// MRT common header.
///
/// A CommonHeader ([RFC6396 section 2][header-link]) is constructed as the following:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |             Type              |            Subtype            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             Length                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `BGP4MP_ET` records carry an extra 32-bit microsecond timestamp right after the length.
/// `length` always holds the length of the message body, with the microsecond field removed.
///
/// `entry_type` is kept as the raw value: types the decoder does not know still need to flow
/// through to the classifier, which discards them.
///
/// [header-link]: https://datatracker.ietf.org/doc/html/rfc6396#section-2
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommonHeader {
    pub timestamp: u32,
    pub microsecond_timestamp: Option<u32>,
    pub entry_type: u16,
    pub entry_subtype: u16,
    pub length: u32,
}

/// MRT entry type.
///
/// Type 0 to 10 are deprecated and not listed.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
#[repr(u16)]
pub enum EntryType {
    OSPFv2 = 11,
    TABLE_DUMP = 12,
    TABLE_DUMP_V2 = 13,
    BGP4MP = 16,
    BGP4MP_ET = 17,
    ISIS = 32,
    ISIS_ET = 33,
    OSPFv3 = 48,
    OSPFv3_ET = 49,
}

/// BGP4MP message subtypes.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Bgp4MpType {
    StateChange = 0,
    Message = 1,
    MessageAs4 = 4,
    StateChangeAs4 = 5,
    MessageLocal = 6,
    MessageAs4Local = 7,
    MessageAddpath = 8,
    MessageAs4Addpath = 9,
    MessageLocalAddpath = 10,
    MessageLocalAs4Addpath = 11,
}

/// TABLE_DUMP_V2 subtypes.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TableDumpV2Type {
    PeerIndexTable = 1,
    RibIpv4Unicast = 2,
    RibIpv4Multicast = 3,
    RibIpv6Unicast = 4,
    RibIpv6Multicast = 5,
    RibGeneric = 6,
    GeoPeerTable = 7,
    RibIpv4UnicastAddPath = 8,
    RibIpv4MulticastAddPath = 9,
    RibIpv6UnicastAddPath = 10,
    RibIpv6MulticastAddPath = 11,
    RibGenericAddPath = 12,
}

/// BGP message types as carried in the 19-byte BGP header.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
#[repr(u8)]
pub enum BgpMessageType {
    OPEN = 1,
    UPDATE = 2,
    NOTIFICATION = 3,
    KEEPALIVE = 4,
    ROUTE_REFRESH = 5,
}

/// Inner type of a BGP4MP entry.
///
/// State changes are not BGP messages, so they get their own variant instead of sharing a
/// numeric code with ROUTE-REFRESH.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InnerType {
    Message(BgpMessageType),
    StateChange,
}

/// AFI -- Address Family Identifier
#[derive(Debug, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy, Eq, Hash)]
#[repr(u16)]
pub enum Afi {
    Ipv4 = 1,
    Ipv6 = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsnLength {
    Bits16,
    Bits32,
}

bitflags! {
    /// Path attribute flags, see RFC 4271 section 4.3.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct AttrFlags: u8 {
        const OPTIONAL   = 0b10000000;
        const TRANSITIVE = 0b01000000;
        const PARTIAL    = 0b00100000;
        const EXTENDED   = 0b00010000;
    }
}

bitflags! {
    /// Peer type field of a PEER_INDEX_TABLE entry.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct PeerType: u8 {
        const AS_SIZE_32BIT = 0x2;
        const ADDRESS_FAMILY_IPV6 = 0x1;
    }
}

/// One entry emitted by an [EntryDecoder](crate::parser::EntryDecoder).
///
/// This mirrors what a native MRT decoder exposes per entry: the raw header classification,
/// the capture time, the vantage point and the path attributes already rendered to their
/// human-readable form. A RIB record with several peers produces one `RawEntry` per peer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEntry {
    pub entry_type: u16,
    pub entry_subtype: u16,
    pub inner_type: Option<InnerType>,
    pub time: u32,
    pub time_us: u32,
    pub peer_asn: u32,
    pub peer_addr: Option<IpAddr>,
    pub announced: Vec<IpNet>,
    pub withdrawn: Vec<IpNet>,
    pub next_hop: Option<IpAddr>,
    pub as_path: String,
    pub communities: String,
    pub origin: String,
}

impl RawEntry {
    /// Start an entry from a decoded header; everything else is filled in by the body parser.
    pub fn from_header(header: &CommonHeader) -> RawEntry {
        RawEntry {
            entry_type: header.entry_type,
            entry_subtype: header.entry_subtype,
            time: header.timestamp,
            time_us: header.microsecond_timestamp.unwrap_or(0),
            ..Default::default()
        }
    }

    /// Capture time with the microsecond part merged in.
    pub fn timestamp(&self) -> f64 {
        self.time as f64 + self.time_us as f64 / 1_000_000.0
    }
}
