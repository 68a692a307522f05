//! Shared fixture for integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use content_query_sdk::{MemoryRepository, QueryConfig, QuerySession};

pub const HOME: i32 = 1050;
pub const NEWS: i32 = 1060;
pub const LAUNCH: i32 = 1061;
pub const UPDATE: i32 = 1062;
pub const TEASER: i32 = 1063;
pub const RECAP: i32 = 1064;
pub const ARCHIVE: i32 = 1065;
pub const ABOUT: i32 = 1070;
pub const CONTACT: i32 = 1080;
pub const LOGO: i32 = 2001;

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/site.yaml")
}

pub fn repository() -> MemoryRepository {
    MemoryRepository::from_path(&fixture_path()).expect("fixture should load")
}

pub fn session() -> QuerySession {
    QuerySession::from_memory(repository()).build()
}

pub fn session_with(config: QueryConfig) -> QuerySession {
    QuerySession::from_memory(repository()).config(config).build()
}
