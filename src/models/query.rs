use crate::error::GillError;
use crate::time::TimeInput;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Category of archive files to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Updates,
    Ribs,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Updates => "updates",
            RecordType::Ribs => "ribs",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = GillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "updates" | "update" => Ok(RecordType::Updates),
            "ribs" | "rib" => Ok(RecordType::Ribs),
            _ => Err(GillError::InvalidRecordType(s.to_string())),
        }
    }
}

/// One archive to process: the remote URL and the vantage point it was collected from.
///
/// The derived ordering compares `url` first and `peer` second, which is the order files are
/// processed in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTask {
    pub url: String,
    pub peer: String,
}

impl FileTask {
    pub fn new(url: impl Into<String>, peer: impl Into<String>) -> FileTask {
        FileTask {
            url: url.into(),
            peer: peer.into(),
        }
    }
}

/// Inclusive time window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: i64,
    pub until: i64,
}

impl TimeWindow {
    /// Whether a fractional capture timestamp falls within the window.
    pub fn contains(&self, timestamp: f64) -> bool {
        self.from as f64 <= timestamp && timestamp <= self.until as f64
    }
}

/// What to stream: a time window, a record category and optionally a set of vantage points.
///
/// Vantage points use the broker's `ASN_IP` naming, e.g. `3130_147.28.0.3`. `None` means all
/// vantage points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub from_time: i64,
    pub until_time: i64,
    pub record_type: RecordType,
    pub vantage_points: Option<Vec<String>>,
}

impl Query {
    /// Build a query, rejecting malformed times before anything touches the network.
    ///
    /// ```
    /// use gillstream::{Query, RecordType};
    ///
    /// let query = Query::new(
    ///     "2024-01-01 00:00:00",
    ///     "2024-01-01 01:00:00",
    ///     RecordType::Updates,
    ///     None,
    /// )
    /// .unwrap();
    /// assert_eq!(query.until_time - query.from_time, 3600);
    /// assert_eq!(Query::new(1704067200, 1704070800, RecordType::Ribs, None).unwrap().from_time, 1704067200);
    /// assert!(Query::new("yesterday", 0, RecordType::Ribs, None).is_err());
    /// ```
    pub fn new(
        from_time: impl Into<TimeInput>,
        until_time: impl Into<TimeInput>,
        record_type: RecordType,
        vantage_points: Option<Vec<String>>,
    ) -> Result<Query, GillError> {
        let from_time = from_time.into().to_unix_seconds()?;
        let until_time = until_time.into().to_unix_seconds()?;
        if from_time > until_time {
            return Err(GillError::InvalidQuery(format!(
                "from_time {} is after until_time {}",
                from_time, until_time
            )));
        }

        Ok(Query {
            from_time,
            until_time,
            record_type,
            vantage_points,
        })
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            from: self.from_time,
            until: self.until_time,
        }
    }
}
