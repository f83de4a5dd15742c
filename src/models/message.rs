use ipnet::IpNet;
use itertools::Itertools;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;

/// Kind of a decoded [Message].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    Open,
    Update,
    Notification,
    Keepalive,
    StateChange,
    RibEntry,
    /// Never produced by the classifier. Used when reading back a pipe-separated line whose
    /// kind letter is not recognized.
    Unknown,
}

impl MessageKind {
    /// Single-letter tag used in the pipe-separated output.
    pub fn letter(&self) -> &'static str {
        match self {
            MessageKind::Open => "O",
            MessageKind::Update => "U",
            MessageKind::Notification => "N",
            MessageKind::Keepalive => "K",
            MessageKind::StateChange => "S",
            MessageKind::RibEntry => "R",
            MessageKind::Unknown => "Unknown",
        }
    }

    fn from_letter(letter: &str) -> MessageKind {
        match letter {
            "O" => MessageKind::Open,
            "U" => MessageKind::Update,
            "N" => MessageKind::Notification,
            "K" => MessageKind::Keepalive,
            "S" => MessageKind::StateChange,
            "R" => MessageKind::RibEntry,
            _ => MessageKind::Unknown,
        }
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One decoded protocol event.
///
/// Prefix lists keep the order in which the decoder produced them. Attributes that the
/// decoder renders as text (origin, AS path, communities) stay opaque strings, empty when the
/// entry did not carry them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub timestamp: f64,
    pub entry_type: u16,
    pub entry_subtype: u16,
    pub kind: MessageKind,
    pub announced: Vec<IpNet>,
    pub withdrawn: Vec<IpNet>,
    pub origin: String,
    pub next_hop: Option<IpAddr>,
    pub as_path: String,
    pub communities: String,
    pub peer_asn: u32,
    pub peer_addr: IpAddr,
}

impl Message {
    /// Header line matching the field order of [Message]'s `Display` output.
    ///
    /// ```
    /// use gillstream::Message;
    /// assert_eq!(
    ///     Message::get_psv_header(),
    ///     "type|timestamp|announced|withdrawn|origin|next_hop|as_path|communities|peer_asn|peer_addr"
    /// );
    /// ```
    pub fn get_psv_header() -> String {
        let fields = [
            "type",
            "timestamp",
            "announced",
            "withdrawn",
            "origin",
            "next_hop",
            "as_path",
            "communities",
            "peer_asn",
            "peer_addr",
        ];
        fields.join("|")
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{:?}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.kind,
            self.timestamp,
            self.announced.iter().join(","),
            self.withdrawn.iter().join(","),
            self.origin,
            self.next_hop.map(|ip| ip.to_string()).unwrap_or_default(),
            self.as_path,
            self.communities,
            self.peer_asn,
            self.peer_addr,
        )
    }
}

/// Parse a line produced by [Message]'s `Display` implementation.
///
/// The raw entry type and subtype are not part of the text form; they are inferred from the
/// kind (BGP4MP_ET / MESSAGE_AS4 for live messages, TABLE_DUMP_V2 / RIB_IPV4_UNICAST or
/// RIB_IPV6_UNICAST for RIB entries) and left at zero for unknown kinds.
impl FromStr for Message {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim_end_matches('\n').split('|').collect();
        if fields.len() != 10 {
            return Err(format!("expected 10 fields, found {}", fields.len()));
        }

        let parse_prefixes = |field: &str| -> Result<Vec<IpNet>, String> {
            field
                .split(',')
                .filter(|p| !p.is_empty())
                .map(|p| IpNet::from_str(p).map_err(|_| format!("invalid prefix {p}")))
                .collect()
        };

        let kind = MessageKind::from_letter(fields[0]);
        let timestamp =
            f64::from_str(fields[1]).map_err(|_| format!("invalid timestamp {}", fields[1]))?;
        let announced = parse_prefixes(fields[2])?;
        let withdrawn = parse_prefixes(fields[3])?;
        let next_hop = match fields[5] {
            "" => None,
            v => Some(IpAddr::from_str(v).map_err(|_| format!("invalid next hop {v}"))?),
        };
        let peer_asn =
            u32::from_str(fields[8]).map_err(|_| format!("invalid peer asn {}", fields[8]))?;
        let peer_addr = IpAddr::from_str(fields[9])
            .map_err(|_| format!("invalid peer address {}", fields[9]))?;

        let (entry_type, entry_subtype) = match kind {
            MessageKind::RibEntry => match announced.first() {
                Some(IpNet::V6(_)) => (13, 4),
                _ => (13, 2),
            },
            MessageKind::StateChange => (17, 5),
            MessageKind::Unknown => (0, 0),
            _ => (17, 4),
        };

        Ok(Message {
            timestamp,
            entry_type,
            entry_subtype,
            kind,
            announced,
            withdrawn,
            origin: fields[4].to_string(),
            next_hop,
            as_path: fields[6].to_string(),
            communities: fields[7].to_string(),
            peer_asn,
            peer_addr,
        })
    }
}
