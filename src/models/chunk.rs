use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend a chunk belongs to.
///
/// The string form is the directory name under which chunks are stored in the
/// archive, so it must stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "vm")]
    VictoriaMetrics,
    #[serde(rename = "ch")]
    ClickHouse,
}

impl SourceType {
    pub const ALL: [SourceType; 2] = [SourceType::VictoriaMetrics, SourceType::ClickHouse];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::VictoriaMetrics => "vm",
            SourceType::ClickHouse => "ch",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("undefined source: {s}"))
    }
}

/// Which slice of a backend a chunk covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkRange {
    /// Half-open time window `[start, end)` for time-series stores
    TimeWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Row offset and count for column stores
    RowSpan { index: u64, rows: u64 },
}

/// Lightweight descriptor of a chunk that still has to be read from its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source: SourceType,
    pub range: ChunkRange,
}

impl ChunkMeta {
    pub fn time_window(source: SourceType, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            source,
            range: ChunkRange::TimeWindow { start, end },
        }
    }

    pub fn row_span(source: SourceType, index: u64, rows: u64) -> Self {
        Self {
            source,
            range: ChunkRange::RowSpan { index, rows },
        }
    }

    /// Stable filename for the chunk this descriptor identifies.
    pub fn default_filename(&self) -> String {
        match &self.range {
            ChunkRange::TimeWindow { start, end } => {
                format!("{}-{}.bin", start.timestamp(), end.timestamp())
            }
            ChunkRange::RowSpan { index, rows } => format!("{index}-{rows}.tsv"),
        }
    }
}

/// One unit of exported data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: SourceType,
    pub filename: String,
    pub content: Vec<u8>,
}

impl Chunk {
    pub fn new(source: SourceType, filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            source,
            filename: filename.into(),
            content,
        }
    }

    /// Content length in bytes
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Entry path inside the archive: `{source}/{filename}`
    pub fn archive_path(&self) -> String {
        format!("{}/{}", self.source, self.filename)
    }
}
