//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`. The table and column names are the on-disk
//! contract; they match the pre-existing data layout so an in-place
//! migration needs no rewrite.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id    INTEGER PRIMARY KEY,
    handle     TEXT,
    first_seen TEXT NOT NULL
);

-- Edges are immutable except for the single credited flip.
-- referee_id is UNIQUE: a user can be referred at most once, ever.
CREATE TABLE IF NOT EXISTS referrals (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    referrer_id INTEGER NOT NULL,
    referee_id  INTEGER NOT NULL UNIQUE,
    credited    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

-- Redemptions are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- `repeatable` is denormalised from the catalog at insert time so the
-- partial index below binds non-repeatable rewards only.
CREATE TABLE IF NOT EXISTS redemptions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL,
    reward_code TEXT NOT NULL,
    cost        INTEGER NOT NULL,
    repeatable  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS redemptions_once_idx
    ON redemptions(user_id, reward_code) WHERE repeatable = 0;

CREATE INDEX IF NOT EXISTS referrals_referrer_idx
    ON referrals(referrer_id, credited);
CREATE INDEX IF NOT EXISTS redemptions_user_idx
    ON redemptions(user_id);

PRAGMA user_version = 1;
";
