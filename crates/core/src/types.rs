/// Record identifiers are strings: dispatch and stock keys are shaped by
/// upstream supplier tooling (e.g. `dispatch-{materialId}`), and ids minted
/// by this system are UUIDv7 strings.
pub type RecordId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
