//! Server-side metadata enrichment applied before storage.

use serde_json::{Map, Value};
use time::OffsetDateTime;

/// First version assigned to every stored chunk.
pub(crate) const INITIAL_VERSION: i64 = 1;

/// Augment caller metadata with the fields the store guarantees on every record.
///
/// `date_added` and `version` are always set server-side so chunk provenance survives even
/// when caller metadata is sparse; callers must not assume their map round-trips unmodified.
pub(crate) fn enrich_metadata(mut metadata: Map<String, Value>) -> Map<String, Value> {
    metadata.insert(
        "date_added".into(),
        Value::String(current_timestamp_rfc3339()),
    );
    metadata.insert("version".into(), Value::from(INITIAL_VERSION));
    metadata
}

/// Current UTC timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
