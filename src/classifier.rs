//! Maps decoded [RawEntry]s to [Message]s.
use crate::models::*;

/// Classify a raw entry, or `None` when it does not map to a [Message].
///
/// | entry type | subtype | inner type | kind |
/// |---|---|---|---|
/// | BGP4MP, BGP4MP_ET | any | OPEN, UPDATE, NOTIFICATION, KEEPALIVE | matching kind |
/// | BGP4MP, BGP4MP_ET | state change | state change | `StateChange` |
/// | TABLE_DUMP_V2 | RIB_IPV4_UNICAST, RIB_IPV6_UNICAST | none | `RibEntry` |
///
/// Anything else is discarded, including ROUTE-REFRESH and entries without a peer address.
pub fn classify(entry: &RawEntry) -> Option<Message> {
    let kind = message_kind(entry)?;
    let peer_addr = entry.peer_addr?;

    Some(Message {
        timestamp: entry.timestamp(),
        entry_type: entry.entry_type,
        entry_subtype: entry.entry_subtype,
        kind,
        announced: entry.announced.clone(),
        withdrawn: entry.withdrawn.clone(),
        origin: entry.origin.clone(),
        next_hop: entry.next_hop,
        as_path: entry.as_path.clone(),
        communities: entry.communities.clone(),
        peer_asn: entry.peer_asn,
        peer_addr,
    })
}

fn message_kind(entry: &RawEntry) -> Option<MessageKind> {
    match EntryType::try_from(entry.entry_type).ok()? {
        EntryType::BGP4MP | EntryType::BGP4MP_ET => match entry.inner_type? {
            InnerType::Message(BgpMessageType::OPEN) => Some(MessageKind::Open),
            InnerType::Message(BgpMessageType::UPDATE) => Some(MessageKind::Update),
            InnerType::Message(BgpMessageType::NOTIFICATION) => Some(MessageKind::Notification),
            InnerType::Message(BgpMessageType::KEEPALIVE) => Some(MessageKind::Keepalive),
            InnerType::Message(BgpMessageType::ROUTE_REFRESH) => None,
            InnerType::StateChange => Some(MessageKind::StateChange),
        },
        EntryType::TABLE_DUMP_V2 => match TableDumpV2Type::try_from(entry.entry_subtype).ok()? {
            TableDumpV2Type::RibIpv4Unicast | TableDumpV2Type::RibIpv6Unicast => {
                Some(MessageKind::RibEntry)
            }
            _ => None,
        },
        _ => None,
    }
}
