//! SQL schema for the Society Connect SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    role          TEXT NOT NULL,    -- 'owner' | 'tenant' | 'committee' | 'admin' | 'security'
    flat_number   TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1,
    is_approved   INTEGER NOT NULL DEFAULT 0,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a bearer token is ever stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS visitor_logs (
    visitor_id          TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    phone               TEXT NOT NULL,
    purpose             TEXT,
    expected_time       TEXT NOT NULL,   -- RFC 3339, fixed precision: sorts lexically
    flat_to_visit       TEXT NOT NULL,
    status              TEXT NOT NULL,
    is_approved         INTEGER NOT NULL,
    needs_approval_from TEXT REFERENCES users(user_id),
    approved_by         TEXT REFERENCES users(user_id),
    logged_by           TEXT NOT NULL REFERENCES users(user_id),
    scheduled_by        TEXT NOT NULL REFERENCES users(user_id),
    check_in_time       TEXT,
    check_out_time      TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    revision            INTEGER NOT NULL DEFAULT 0,
    CHECK (status != 'pending_approval' OR needs_approval_from IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS users_flat_idx          ON users(flat_number);
CREATE INDEX IF NOT EXISTS visitor_flat_idx        ON visitor_logs(flat_to_visit);
CREATE INDEX IF NOT EXISTS visitor_status_idx      ON visitor_logs(status);
CREATE INDEX IF NOT EXISTS visitor_expected_idx    ON visitor_logs(expected_time);
CREATE INDEX IF NOT EXISTS visitor_approver_idx    ON visitor_logs(needs_approval_from);

PRAGMA user_version = 1;
";
