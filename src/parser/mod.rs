/*!
MRT dump decoding.

[EntryDecoder] opens a local dump file and hands out an [EntrySource], which yields one
[RawEntry] at a time. [MrtDecoder] is the built-in implementation; it reads plain, gzip or bzip2
compressed files through [oneio].

Decoding is lenient: a record that fails to parse is logged and skipped, and a record cut short
by the end of the file ends the dump.
*/
use bytes::{Bytes, BytesMut};
use log::{debug, error, warn};
use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

pub mod attributes;
pub mod bgp;
pub mod bgp4mp;
pub mod mrt_header;
pub mod table_dump_v2;
pub mod utils;

pub use mrt_header::parse_common_header;
pub use table_dump_v2::Peer;
pub use utils::{parse_nlri_list, ReadUtils};

use crate::error::ParserError;
use crate::models::{EntryType, RawEntry};
use bgp4mp::parse_bgp4mp;
use table_dump_v2::parse_table_dump_v2;

/// Opens local dump files for decoding.
pub trait EntryDecoder: Send {
    /// Open the file at `path`. Failing here means the file is unreadable.
    fn open(&self, path: &Path) -> Result<Box<dyn EntrySource>, ParserError>;
}

/// A dump file opened by an [EntryDecoder].
///
/// Dropping the source closes the underlying file.
pub trait EntrySource: Send {
    /// Next entry, or `None` once the file is exhausted.
    fn next_entry(&mut self) -> Option<RawEntry>;
}

/// Default [EntryDecoder]: native MRT decoding over a [oneio] reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct MrtDecoder;

impl EntryDecoder for MrtDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn EntrySource>, ParserError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ParserError::Unsupported(format!("non UTF-8 path {}", path.display())))?;
        let reader = oneio::get_reader(path_str)?;
        Ok(Box::new(MrtEntryReader::new(reader)))
    }
}

/// Reads MRT records from any [Read] and yields [RawEntry]s.
///
/// The last PEER_INDEX_TABLE seen is kept so that later RIB records can resolve their peers.
pub struct MrtEntryReader<R> {
    reader: R,
    pending: VecDeque<RawEntry>,
    peers: Vec<Peer>,
    finished: bool,
    records_read: u64,
    records_skipped: u64,
}

impl<R: Read> MrtEntryReader<R> {
    pub fn new(reader: R) -> MrtEntryReader<R> {
        MrtEntryReader {
            reader,
            pending: VecDeque::new(),
            peers: vec![],
            finished: false,
            records_read: 0,
            records_skipped: 0,
        }
    }

    /// Read one MRT record and decode it into zero or more entries.
    fn read_record(&mut self) -> Result<Vec<RawEntry>, ParserError> {
        let header = parse_common_header(&mut self.reader)?;

        let mut buffer = BytesMut::zeroed(header.length as usize);
        self.reader.read_exact(&mut buffer)?;
        let data: Bytes = buffer.freeze();
        self.records_read += 1;

        match EntryType::try_from(header.entry_type) {
            Ok(EntryType::BGP4MP) | Ok(EntryType::BGP4MP_ET) => {
                let mut entry = RawEntry::from_header(&header);
                parse_bgp4mp(data, &mut entry)?;
                Ok(vec![entry])
            }
            Ok(EntryType::TABLE_DUMP_V2) => parse_table_dump_v2(&header, data, &mut self.peers),
            _ => {
                debug!(
                    "entry type {} subtype {} not decoded",
                    header.entry_type, header.entry_subtype
                );
                Ok(vec![RawEntry::from_header(&header)])
            }
        }
    }
}

impl<R: Read + Send> EntrySource for MrtEntryReader<R> {
    fn next_entry(&mut self) -> Option<RawEntry> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(entry);
            }
            if self.finished {
                return None;
            }

            match self.read_record() {
                Ok(entries) => self.pending.extend(entries),
                Err(ParserError::EofExpected) => {
                    debug!(
                        "end of dump: {} records read, {} skipped",
                        self.records_read, self.records_skipped
                    );
                    self.finished = true;
                }
                Err(e @ ParserError::EofError(_)) => {
                    warn!("truncated dump, stop reading: {}", e);
                    self.finished = true;
                }
                Err(e @ ParserError::IoError(_)) | Err(e @ ParserError::OneIoError(_)) => {
                    error!("{}", e);
                    self.finished = true;
                }
                Err(e) => {
                    warn!("skipping malformed record: {}", e);
                    self.records_skipped += 1;
                }
            }
        }
    }
}

impl<R: Read + Send> Iterator for MrtEntryReader<R> {
    type Item = RawEntry;

    fn next(&mut self) -> Option<RawEntry> {
        self.next_entry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BgpMessageType, InnerType};

    fn record(entry_type: u16, subtype: u16, body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend(1_700_000_000u32.to_be_bytes());
        bytes.extend(entry_type.to_be_bytes());
        bytes.extend(subtype.to_be_bytes());
        bytes.extend((body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    fn keepalive_body() -> Vec<u8> {
        let mut body = vec![];
        body.extend(65001u32.to_be_bytes());
        body.extend(65000u32.to_be_bytes());
        body.extend([0, 0, 0, 1, 192, 0, 2, 1, 192, 0, 2, 2]);
        body.extend([0xff; 16]);
        body.extend([0, 19, 4]);
        body
    }

    #[test]
    fn test_reader_yields_entries() {
        let mut bytes = record(16, 4, &keepalive_body());
        bytes.extend(record(99, 1, &[1, 2, 3]));

        let entries: Vec<RawEntry> = MrtEntryReader::new(bytes.as_slice()).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].inner_type,
            Some(InnerType::Message(BgpMessageType::KEEPALIVE))
        );
        assert_eq!(entries[0].peer_asn, 65001);
        assert_eq!(entries[1].entry_type, 99);
        assert_eq!(entries[1].peer_addr, None);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let mut broken = keepalive_body();
        broken[20] = 0; // corrupt the BGP marker
        let mut bytes = record(16, 4, &broken);
        bytes.extend(record(16, 4, &keepalive_body()));

        let entries: Vec<RawEntry> = MrtEntryReader::new(bytes.as_slice()).collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_truncated_record_ends_dump() {
        let mut bytes = record(16, 4, &keepalive_body());
        let second = record(16, 4, &keepalive_body());
        bytes.extend(&second[..second.len() - 5]);

        let entries: Vec<RawEntry> = MrtEntryReader::new(bytes.as_slice()).collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_decoder_open_missing_file() {
        assert!(MrtDecoder
            .open(Path::new("/nonexistent/gillstream/missing.mrt.bz2"))
            .is_err());
    }
}
