/*!
Stream controller: turns a [Query] into a lazy sequence of [Message]s.

Files are processed one at a time in `(url, peer)` order. For each file the stream downloads
it, opens a decoder on the local copy, yields the classified entries that fall inside the query
window and releases both the decoder and the local copy before moving on. Files that cannot be
downloaded or opened are logged and skipped.
*/
use log::{debug, info, warn};
use std::path::Path;

use crate::broker::BrokerClient;
use crate::classifier::classify;
use crate::config::StreamConfig;
use crate::error::GillError;
use crate::fetcher::{FileFetcher, LocalFile};
use crate::http::{HttpClient, ReqwestClient};
use crate::models::{FileTask, Message, Query, TimeWindow};
use crate::parser::{EntryDecoder, EntrySource, MrtDecoder};
use crate::retry::{Sleeper, ThreadSleeper};

/// Collaborators used by a [GillStream].
pub struct StreamBackends {
    pub http: Box<dyn HttpClient>,
    pub decoder: Box<dyn EntryDecoder>,
    pub sleeper: Box<dyn Sleeper>,
}

impl Default for StreamBackends {
    fn default() -> Self {
        StreamBackends {
            http: Box::new(ReqwestClient::new()),
            decoder: Box::new(MrtDecoder),
            sleeper: Box::new(ThreadSleeper),
        }
    }
}

/// Counters describing what a stream has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub files_total: usize,
    pub files_opened: usize,
    /// Files that could not be downloaded.
    pub files_skipped: usize,
    /// Files that were downloaded but could not be opened by the decoder.
    pub files_unreadable: usize,
    pub entries_read: u64,
    pub entries_out_of_window: u64,
    /// Entries the classifier does not map to a message.
    pub entries_discarded: u64,
    pub messages_emitted: u64,
}

/// An opened dump: the decoder handle and, for downloaded files, the local copy.
///
/// Fields drop in order, so the decoder is closed before the file is removed.
struct OpenDump {
    source: Box<dyn EntrySource>,
    local: Option<LocalFile>,
}

enum StreamState {
    /// No file open yet.
    Idle,
    FileOpen(OpenDump),
    /// The open file reached its end; it is released on the next advance.
    Draining(OpenDump),
    Exhausted,
}

/// Lazy stream of [Message]s for a [Query].
///
/// Construction queries the broker; everything else happens as the iterator is pulled.
///
/// ```no_run
/// use gillstream::{GillStream, Query, RecordType};
///
/// let query = Query::new(
///     "2024-01-01 00:00:00",
///     "2024-01-01 00:15:00",
///     RecordType::Updates,
///     Some(vec!["3130_147.28.0.3".to_string()]),
/// )
/// .unwrap();
/// for msg in GillStream::new(query).unwrap() {
///     println!("{}", msg);
/// }
/// ```
pub struct GillStream {
    query: Query,
    window: TimeWindow,
    config: StreamConfig,
    backends: StreamBackends,
    all_files: Vec<FileTask>,
    next_task: usize,
    state: StreamState,
    stats: StreamStats,
}

impl GillStream {
    /// Stream with the default configuration and backends.
    pub fn new(query: Query) -> Result<GillStream, GillError> {
        GillStream::with_config(query, StreamConfig::default())
    }

    pub fn with_config(query: Query, config: StreamConfig) -> Result<GillStream, GillError> {
        GillStream::with_backends(query, config, StreamBackends::default())
    }

    /// Resolve the query against the broker and build the stream.
    ///
    /// Fails with [GillError::BrokerUnreachable] when the broker cannot be reached.
    pub fn with_backends(
        query: Query,
        config: StreamConfig,
        backends: StreamBackends,
    ) -> Result<GillStream, GillError> {
        let broker = BrokerClient::new(backends.http.as_ref(), backends.sleeper.as_ref(), &config);
        let all_files = broker.resolve(&query)?;

        Ok(GillStream {
            window: query.window(),
            query,
            config,
            backends,
            stats: StreamStats {
                files_total: all_files.len(),
                ..Default::default()
            },
            all_files,
            next_task: 0,
            state: StreamState::Idle,
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Every file resolved for the query, in processing order.
    pub fn all_files(&self) -> &[FileTask] {
        &self.all_files
    }

    /// Files not yet picked up. The file currently being read is not included.
    pub fn remaining_files(&self) -> &[FileTask] {
        &self.all_files[self.next_task..]
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Release the open decoder and local file and end the stream.
    pub fn close(&mut self) {
        self.state = StreamState::Exhausted;
        self.next_task = self.all_files.len();
    }

    /// Release the current file and open the next one that can be fetched and opened.
    fn advance(&mut self) {
        self.state = StreamState::Idle;

        while let Some(task) = self.all_files.get(self.next_task).cloned() {
            self.next_task += 1;

            let fetcher = FileFetcher::new(
                self.backends.http.as_ref(),
                self.backends.sleeper.as_ref(),
                &self.config,
            );
            let local = match fetcher.fetch(&task) {
                Ok(local) => local,
                Err(e) => {
                    warn!("skip file {}, unable to download: {}", task.url, e);
                    self.stats.files_skipped += 1;
                    continue;
                }
            };

            match self.backends.decoder.open(local.path()) {
                Ok(source) => {
                    debug!("processing {} from {}", task.url, task.peer);
                    self.stats.files_opened += 1;
                    self.state = StreamState::FileOpen(OpenDump {
                        source,
                        local: Some(local),
                    });
                    return;
                }
                Err(e) => {
                    warn!("skip file {}, unable to open: {}", task.url, e);
                    self.stats.files_unreadable += 1;
                }
            }
        }

        info!(
            "stream exhausted: {} messages from {} files",
            self.stats.messages_emitted, self.stats.files_opened
        );
        self.state = StreamState::Exhausted;
    }

    fn finish_file(&mut self) {
        if let StreamState::FileOpen(dump) = std::mem::replace(&mut self.state, StreamState::Idle)
        {
            self.state = StreamState::Draining(dump);
        }
    }
}

impl Iterator for GillStream {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        loop {
            let dump = match &mut self.state {
                StreamState::Exhausted => return None,
                StreamState::Idle | StreamState::Draining(_) => {
                    self.advance();
                    continue;
                }
                StreamState::FileOpen(dump) => dump,
            };

            let entry = match dump.source.next_entry() {
                Some(entry) => entry,
                None => {
                    self.finish_file();
                    continue;
                }
            };
            self.stats.entries_read += 1;

            if !self.window.contains(entry.timestamp()) {
                self.stats.entries_out_of_window += 1;
                continue;
            }
            match classify(&entry) {
                Some(msg) => {
                    self.stats.messages_emitted += 1;
                    return Some(msg);
                }
                None => self.stats.entries_discarded += 1,
            }
        }
    }
}

impl std::iter::FusedIterator for GillStream {}

/// Messages from one local dump file, with no time filtering.
///
/// The file is never deleted.
pub struct SingleFileStream {
    dump: Option<OpenDump>,
    stats: StreamStats,
}

impl SingleFileStream {
    /// Open `path` with `decoder`. An open failure is returned instead of being skipped.
    pub fn open(
        path: impl AsRef<Path>,
        decoder: &dyn EntryDecoder,
    ) -> Result<SingleFileStream, GillError> {
        let source = decoder.open(path.as_ref())?;
        Ok(SingleFileStream {
            dump: Some(OpenDump {
                source,
                local: None,
            }),
            stats: StreamStats {
                files_total: 1,
                files_opened: 1,
                ..Default::default()
            },
        })
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Close the decoder.
    pub fn close(&mut self) {
        self.dump = None;
    }
}

impl Iterator for SingleFileStream {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        loop {
            let dump = self.dump.as_mut()?;
            let entry = match dump.source.next_entry() {
                Some(entry) => entry,
                None => {
                    self.dump = None;
                    return None;
                }
            };
            self.stats.entries_read += 1;

            match classify(&entry) {
                Some(msg) => {
                    self.stats.messages_emitted += 1;
                    return Some(msg);
                }
                None => self.stats.entries_discarded += 1,
            }
        }
    }
}

impl std::iter::FusedIterator for SingleFileStream {}

/// Decode one local MRT file (plain, gzip or bzip2) into [Message]s.
pub fn parse_one_file(path: impl AsRef<Path>) -> Result<SingleFileStream, GillError> {
    SingleFileStream::open(path, &MrtDecoder)
}
