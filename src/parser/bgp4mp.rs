use crate::error::ParserError;
use crate::models::*;
use crate::parser::bgp::parse_bgp_message;
use crate::parser::utils::ReadUtils;
use bytes::Bytes;

/// Parse MRT BGP4MP type into `entry`.
///
/// RFC: <https://www.rfc-editor.org/rfc/rfc6396#section-4.4>
///
/// ```text
///   0                   1                   2                   3
///   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |         Peer AS Number        |        Local AS Number        |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |        Interface Index        |        Address Family         |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |                      Peer IP Address (variable)               |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |                      Local IP Address (variable)              |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |          BGP Message, or Old State and New State (variable)
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The AS4 variants use 4-byte AS numbers; the ADDPATH variants prefix every NLRI with a path
/// identifier.
pub fn parse_bgp4mp(mut data: Bytes, entry: &mut RawEntry) -> Result<(), ParserError> {
    let bgp4mp_type = Bgp4MpType::try_from(entry.entry_subtype)?;
    let (asn_len, add_path, state_change) = match bgp4mp_type {
        Bgp4MpType::StateChange => (AsnLength::Bits16, false, true),
        Bgp4MpType::StateChangeAs4 => (AsnLength::Bits32, false, true),
        Bgp4MpType::Message | Bgp4MpType::MessageLocal => (AsnLength::Bits16, false, false),
        Bgp4MpType::MessageAs4 | Bgp4MpType::MessageAs4Local => {
            (AsnLength::Bits32, false, false)
        }
        Bgp4MpType::MessageAddpath | Bgp4MpType::MessageLocalAddpath => {
            (AsnLength::Bits16, true, false)
        }
        Bgp4MpType::MessageAs4Addpath | Bgp4MpType::MessageLocalAs4Addpath => {
            (AsnLength::Bits32, true, false)
        }
    };

    entry.peer_asn = data.read_asn(&asn_len)?;
    let _local_asn = data.read_asn(&asn_len)?;
    let _interface_index = data.read_u16()?;
    let afi = data.read_afi()?;
    entry.peer_addr = Some(data.read_address(&afi)?);
    let _local_addr = data.read_address(&afi)?;

    if state_change {
        let _old_state = data.read_u16()?;
        let _new_state = data.read_u16()?;
        entry.inner_type = Some(InnerType::StateChange);
        return Ok(());
    }

    parse_bgp_message(&mut data, add_path, &asn_len, entry)
}
