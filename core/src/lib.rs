//! prospector-core: task model, registry, batch processor and classification logic.
//!
//! Concrete network clients live in `prospector-plugins`; this crate only defines the
//! seams (`SiteFetcher`, `SiteClassifier`, `InfoExtractor`, `KvStore`, `MemoryProbe`).

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod pressure;
pub mod progress;
pub mod storage;
pub mod task;
pub mod util;
