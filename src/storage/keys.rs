//! Well-known storage keys.
//!
//! The `@`-prefixed names are a wire format: drafts written by older app
//! builds must keep loading, so none of these constants can change without a
//! migration.

/// Prefix for per-draft entries. The full key is the prefix followed by the
/// draft's client-local id.
pub const DRAFT_PREFIX: &str = "@survey_draft_";

/// The sync queue, stored as one JSON array of queue items.
pub const SYNC_QUEUE: &str = "@sync_queue";

/// Cached object-type reference list.
pub const REF_OBJECT_TYPES: &str = "@ref_object_types";

/// Cached administrative-unit reference list.
pub const REF_ADMIN_UNITS: &str = "@ref_admin_units";

/// Cached land-use-type reference list.
pub const REF_LAND_USE_TYPES: &str = "@ref_land_use_types";

/// RFC 3339 timestamp of the last reference-data freshness check.
pub const CADASTRAL_LAST_UPDATE_CHECK: &str = "@cadastral_last_update_check";

/// Version tag of the cadastral dataset the caches were built from.
pub const CADASTRAL_DATA_VERSION: &str = "@cadastral_data_version";

/// Storage key for the draft with the given client-local id.
pub fn draft_key(client_local_id: &str) -> String {
    format!("{DRAFT_PREFIX}{client_local_id}")
}

/// Inverse of [`draft_key`]: extracts the client-local id from a draft key.
pub fn draft_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(DRAFT_PREFIX).filter(|id| !id.is_empty())
}
