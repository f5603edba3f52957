//! SQL migration statements.
//!
//! Applied in order at startup; every statement is idempotent so a replica
//! can re-run the migration on every boot.

pub const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS operator (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS supplier (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS courier (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS item_catalog (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        default_quantity INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS session (
        id TEXT PRIMARY KEY,
        operator_id TEXT NOT NULL REFERENCES operator(id),
        status TEXT NOT NULL,
        is_committed BOOLEAN NOT NULL DEFAULT FALSE,
        tx_hash TEXT,
        commit_digest TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS package (
        id TEXT PRIMARY KEY,
        supplier_id TEXT REFERENCES supplier(id),
        delivery_note_id TEXT NOT NULL,
        supplier_signature TEXT NOT NULL,
        is_trusted BOOLEAN NOT NULL DEFAULT FALSE,
        status TEXT NOT NULL,
        session_id TEXT UNIQUE REFERENCES session(id)
    )",
    "CREATE TABLE IF NOT EXISTS item (
        id TEXT PRIMARY KEY,
        package_id TEXT NOT NULL REFERENCES package(id),
        name TEXT NOT NULL,
        quantity INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS qc_record (
        id TEXT PRIMARY KEY,
        package_id TEXT NOT NULL REFERENCES package(id),
        session_id TEXT NOT NULL REFERENCES session(id),
        passed BOOLEAN NOT NULL,
        inspector_id TEXT NOT NULL,
        issues TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS label (
        id TEXT PRIMARY KEY,
        package_id TEXT NOT NULL REFERENCES package(id),
        session_id TEXT NOT NULL UNIQUE REFERENCES session(id),
        destination TEXT NOT NULL,
        courier_id TEXT NOT NULL REFERENCES courier(id),
        priority TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS \"transaction\" (
        id BIGSERIAL PRIMARY KEY,
        session_id TEXT NOT NULL REFERENCES session(id),
        block_height BIGINT NOT NULL,
        status TEXT NOT NULL
    )",
];
