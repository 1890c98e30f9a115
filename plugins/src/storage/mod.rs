pub mod file;
pub mod http;
pub mod kv_rest;
pub mod memory;
pub mod supabase;

pub use file::FileStore;
pub use http::{RestHttpError, RestHttpErrorKind};
pub use kv_rest::KvRestStore;
pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// Percent-encodes a key for use as one URL path segment.
pub(crate) fn encode_path_segment(key: &str) -> String {
    url::form_urlencoded::byte_serialize(key.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
