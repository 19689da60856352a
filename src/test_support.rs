// Shared fixtures for the inline test modules

use crate::db::{open_database, setup_database};
use rusqlite::Connection;
use std::path::Path;

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fresh in-memory database with the full schema
pub fn test_conn() -> Connection {
    init_test_logging();
    let conn = Connection::open_in_memory().expect("in-memory database");
    setup_database(&conn).expect("schema setup");
    conn
}

/// File-backed database, so several connections can share it across threads
pub fn file_conn(path: &Path) -> Connection {
    init_test_logging();
    open_database(path).expect("file database")
}
