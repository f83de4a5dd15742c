//! Shared mocks and MRT fixture builders for the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bzip2::write::BzEncoder;
use bzip2::Compression;
use gillstream::{
    Backoff, EntryDecoder, EntrySource, GillError, HttpClient, HttpResponse, ParserError, RawEntry,
    Sleeper, StreamBackends, StreamConfig,
};

pub const BROKER_URL: &str = "http://broker.test/broker";

/////////////
// HTTP mock
/////////////

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Vec<u8>),
    Status(u16),
    Fail,
}

#[derive(Default)]
struct MockHttpState {
    routes: HashMap<String, VecDeque<Reply>>,
    requests: Vec<(String, Duration)>,
}

/// Scripted [HttpClient]. Each route holds a queue of replies matched by URL prefix; the last
/// reply of a queue repeats forever. Unknown URLs fail.
#[derive(Clone, Default)]
pub struct MockHttp {
    state: Arc<Mutex<MockHttpState>>,
}

impl MockHttp {
    pub fn new() -> MockHttp {
        MockHttp::default()
    }

    pub fn route(&self, url_prefix: &str, replies: Vec<Reply>) {
        let mut state = self.state.lock().unwrap();
        state
            .routes
            .insert(url_prefix.to_string(), replies.into_iter().collect());
    }

    pub fn broker_files(&self, json: &str) {
        self.route(BROKER_URL, vec![Reply::Ok(json.as_bytes().to_vec())]);
    }

    /// Timeouts of every request whose URL starts with `url_prefix`.
    pub fn timeouts(&self, url_prefix: &str) -> Vec<u64> {
        let state = self.state.lock().unwrap();
        state
            .requests
            .iter()
            .filter(|(url, _)| url.starts_with(url_prefix))
            .map(|(_, timeout)| timeout.as_secs())
            .collect()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.requests.iter().map(|(url, _)| url.clone()).collect()
    }
}

impl HttpClient for MockHttp {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, GillError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((url.to_string(), timeout));

        let key = state
            .routes
            .keys()
            .filter(|prefix| url.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .cloned();
        let reply = match key {
            Some(key) => match state.routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            },
            None => None,
        };

        match reply {
            Some(Reply::Ok(body)) => Ok(HttpResponse {
                status: 200,
                body: Box::new(Cursor::new(body)),
            }),
            Some(Reply::Status(status)) => Ok(HttpResponse {
                status,
                body: Box::new(std::io::empty()),
            }),
            Some(Reply::Fail) | None => Err(GillError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("request to {} timed out", url),
            ))),
        }
    }
}

///////////
// Sleeper
///////////

#[derive(Clone, Default)]
pub struct RecordingSleeper {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn pauses(&self) -> Vec<u64> {
        self.pauses
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.as_secs())
            .collect()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

////////////
// Decoders
////////////

/// Wraps a decoder and counts the handles currently open.
#[derive(Clone)]
pub struct TrackingDecoder<D> {
    inner: D,
    open_handles: Arc<AtomicIsize>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
    fail_on: Option<String>,
}

impl<D: EntryDecoder + Clone> TrackingDecoder<D> {
    pub fn new(inner: D) -> TrackingDecoder<D> {
        TrackingDecoder {
            inner,
            open_handles: Arc::new(AtomicIsize::new(0)),
            opened: Arc::new(Mutex::new(vec![])),
            fail_on: None,
        }
    }

    /// Refuse to open any path containing `needle`.
    pub fn failing_on(self, needle: &str) -> TrackingDecoder<D> {
        TrackingDecoder {
            fail_on: Some(needle.to_string()),
            ..self
        }
    }

    pub fn open_handles(&self) -> isize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

struct TrackedSource {
    inner: Box<dyn EntrySource>,
    open_handles: Arc<AtomicIsize>,
}

impl EntrySource for TrackedSource {
    fn next_entry(&mut self) -> Option<RawEntry> {
        self.inner.next_entry()
    }
}

impl Drop for TrackedSource {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<D: EntryDecoder + Clone> EntryDecoder for TrackingDecoder<D> {
    fn open(&self, path: &Path) -> Result<Box<dyn EntrySource>, ParserError> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        if let Some(needle) = &self.fail_on {
            if path.to_string_lossy().contains(needle.as_str()) {
                return Err(ParserError::Unsupported(format!(
                    "refusing to open {}",
                    path.display()
                )));
            }
        }
        let inner = self.inner.open(path)?;
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedSource {
            inner,
            open_handles: self.open_handles.clone(),
        }))
    }
}

////////////
// Backends
////////////

pub fn test_config(tmp_dir: &Path) -> StreamConfig {
    StreamConfig::default()
        .with_broker_url(BROKER_URL)
        .with_tmp_dir(tmp_dir)
        .with_broker_backoff(Backoff::broker())
        .with_fetch_backoff(Backoff::fetch())
}

pub fn backends<D: EntryDecoder + Clone + 'static>(
    http: &MockHttp,
    decoder: &TrackingDecoder<D>,
    sleeper: &RecordingSleeper,
) -> StreamBackends {
    StreamBackends {
        http: Box::new(http.clone()),
        decoder: Box::new(decoder.clone()),
        sleeper: Box::new(sleeper.clone()),
    }
}

/// Files left in a directory.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => vec![],
    }
}

//////////////////
// MRT fixtures
//////////////////

pub const PEER_ASN: u32 = 65001;
pub const PEER_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 2);

/// MRT record. `microseconds` is written after the length and must be set for BGP4MP_ET only.
pub fn mrt_record(
    ts: u32,
    microseconds: Option<u32>,
    entry_type: u16,
    subtype: u16,
    body: &[u8],
) -> Vec<u8> {
    let mut bytes = vec![];
    bytes.extend(ts.to_be_bytes());
    bytes.extend(entry_type.to_be_bytes());
    bytes.extend(subtype.to_be_bytes());
    match microseconds {
        Some(us) => {
            bytes.extend((body.len() as u32 + 4).to_be_bytes());
            bytes.extend(us.to_be_bytes());
        }
        None => bytes.extend((body.len() as u32).to_be_bytes()),
    }
    bytes.extend_from_slice(body);
    bytes
}

fn bgp_message(msg_type: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xff; 16];
    bytes.extend((19 + body.len() as u16).to_be_bytes());
    bytes.push(msg_type);
    bytes.extend_from_slice(body);
    bytes
}

/// BGP4MP MESSAGE_AS4 (or BGP4MP_ET when `microseconds` is set) from AS65001 at 192.0.2.1.
fn bgp4mp_record(ts: u32, microseconds: Option<u32>, message: &[u8]) -> Vec<u8> {
    let mut body = vec![];
    body.extend(PEER_ASN.to_be_bytes());
    body.extend(65000u32.to_be_bytes());
    body.extend(0u16.to_be_bytes());
    body.extend(1u16.to_be_bytes());
    body.extend(PEER_IP.octets());
    body.extend(LOCAL_IP.octets());
    body.extend_from_slice(message);
    let entry_type = match microseconds {
        Some(_) => 17,
        None => 16,
    };
    mrt_record(ts, microseconds, entry_type, 4, &body)
}

pub fn open_record(ts: u32) -> Vec<u8> {
    let mut open = vec![4];
    open.extend((PEER_ASN as u16).to_be_bytes());
    open.extend(180u16.to_be_bytes());
    open.extend(PEER_IP.octets());
    open.push(0);
    bgp4mp_record(ts, None, &bgp_message(1, &open))
}

pub fn keepalive_record(ts: u32, microseconds: Option<u32>) -> Vec<u8> {
    bgp4mp_record(ts, microseconds, &bgp_message(4, &[]))
}

fn path_attributes(as_path: &[u32], next_hop: Ipv4Addr) -> Vec<u8> {
    let mut attrs = vec![0x40, 1, 1, 0];
    let mut path = vec![2, as_path.len() as u8];
    for asn in as_path {
        path.extend(asn.to_be_bytes());
    }
    attrs.extend([0x40, 2, path.len() as u8]);
    attrs.extend(path);
    attrs.extend([0x40, 3, 4]);
    attrs.extend(next_hop.octets());
    attrs
}

/// UPDATE announcing IPv4 `/24` prefixes given by their first three octets.
pub fn update_record(ts: u32, prefixes: &[[u8; 3]]) -> Vec<u8> {
    let attrs = path_attributes(&[PEER_ASN, 65002], PEER_IP);
    let mut update = vec![];
    update.extend(0u16.to_be_bytes());
    update.extend((attrs.len() as u16).to_be_bytes());
    update.extend(attrs);
    for prefix in prefixes {
        update.push(24);
        update.extend(prefix);
    }
    bgp4mp_record(ts, None, &bgp_message(2, &update))
}

/// PEER_INDEX_TABLE with IPv4 peers using 4-byte ASNs.
pub fn peer_index_record(ts: u32, peers: &[(u32, Ipv4Addr)]) -> Vec<u8> {
    let mut body = vec![];
    body.extend(Ipv4Addr::new(10, 0, 0, 1).octets());
    body.extend(0u16.to_be_bytes());
    body.extend((peers.len() as u16).to_be_bytes());
    for (asn, ip) in peers {
        body.push(0x2);
        body.extend(ip.octets());
        body.extend(ip.octets());
        body.extend(asn.to_be_bytes());
    }
    mrt_record(ts, None, 13, 1, &body)
}

/// RIB_IPV4_UNICAST for a `/24` with one RIB entry per listed peer index.
pub fn rib_ipv4_record(ts: u32, prefix: [u8; 3], peer_indexes: &[u16]) -> Vec<u8> {
    let mut body = vec![];
    body.extend(1u32.to_be_bytes());
    body.push(24);
    body.extend(prefix);
    body.extend((peer_indexes.len() as u16).to_be_bytes());
    for index in peer_indexes {
        let attrs = path_attributes(&[PEER_ASN, 3356], PEER_IP);
        body.extend(index.to_be_bytes());
        body.extend(ts.to_be_bytes());
        body.extend((attrs.len() as u16).to_be_bytes());
        body.extend(attrs);
    }
    mrt_record(ts, None, 13, 2, &body)
}

/// A record with an MRT type nobody decodes.
pub fn unknown_record(ts: u32) -> Vec<u8> {
    mrt_record(ts, None, 99, 1, &[0xde, 0xad, 0xbe, 0xef])
}

pub fn bz2(data: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Concatenate records into one dump.
pub fn dump(records: &[Vec<u8>]) -> Vec<u8> {
    records.concat()
}
