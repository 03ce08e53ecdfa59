/// Dashboard, user, group and permission ids as issued by the backend.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Requested display range of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeRange {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// Range start as epoch milliseconds, the unit datapoint timestamps use.
    pub fn from_millis(&self) -> i64 {
        self.from.timestamp_millis()
    }
}
