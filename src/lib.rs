/*!
gillstream streams BGP messages out of the MRT archives collected by the GILL platform.

A [Query] names a time window, a record category and optionally a set of vantage points. The
[GillStream] built from it asks the bgproutes.io broker which archive files cover the query,
then downloads them one at a time, decodes each one and yields the [Message]s that fall inside
the window. Files that cannot be downloaded or decoded are logged and skipped.

# Examples

## Stream updates from a vantage point

```no_run
use gillstream::{GillStream, Query, RecordType};

let query = Query::new(
    "2024-01-01 00:00:00",
    "2024-01-01 01:00:00",
    RecordType::Updates,
    Some(vec!["3130_147.28.0.3".to_string()]),
)
.unwrap();

let mut stream = GillStream::new(query).unwrap();
println!("{} files to process", stream.all_files().len());
for msg in stream.by_ref() {
    println!("{}", msg);
}
println!("{:?}", stream.stats());
```

## Decode a local file

```no_run
use gillstream::{parse_one_file, MessageKind};

let updates = parse_one_file("updates.20240101.0000.mrt.bz2")
    .unwrap()
    .filter(|msg| msg.kind == MessageKind::Update)
    .count();
println!("{} updates", updates);
```

# Collaborators

The network, the decoder and the clock used for retry pauses are traits ([HttpClient],
[EntryDecoder], [Sleeper]); [GillStream::with_backends] accepts any implementation of them.
*/

pub mod broker;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod models;
pub mod parser;
pub mod retry;
pub mod stream;
pub mod time;

pub use broker::BrokerClient;
pub use classifier::classify;
pub use config::StreamConfig;
pub use error::{GillError, ParserError};
pub use fetcher::{FileFetcher, LocalFile};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use models::*;
pub use parser::{EntryDecoder, EntrySource, MrtDecoder, MrtEntryReader};
pub use retry::{retry_with_backoff, Backoff, Sleeper, ThreadSleeper};
pub use stream::{parse_one_file, GillStream, SingleFileStream, StreamBackends, StreamStats};
pub use time::TimeInput;
