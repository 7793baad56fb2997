/// Collection items are addressed by a dense 1-based integer id.
pub type TokenId = u32;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
