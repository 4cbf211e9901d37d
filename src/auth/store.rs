//! SQLite-backed credential store.
//!
//! Tables:
//! - `users`: id, name, password_hash
//!
//! Every operation opens its own connection and drops it before returning,
//! so nothing stays open between calls and the handle is released on every
//! exit path, including `?` early returns.
//!
//! Password hashes are a single unsalted SHA-256 pass. Two users with the same
//! password share a stored hash. This matches the data already on disk and is
//! kept on purpose; upgrading the scheme means rehashing every row.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DatabaseConfig;

/// Database file used when nothing else is configured.
pub const DEFAULT_DB_FILE: &str = "users.db";

/// Default time a connection waits on a locked database (milliseconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// A registered user, as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
}

/// Username/password-hash store over a single SQLite file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl CredentialStore {
    /// Point a store at `db_path`. Nothing is touched on disk until the first call.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.path.clone())
            .with_busy_timeout(Duration::from_millis(config.busy_timeout_ms))
    }

    /// Create a store and provision its schema.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(db_path);
        store.ensure_schema()?;
        Ok(store)
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection scoped to the caller. Dropping it closes the file.
    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).with_context(|| {
            format!("Failed to open credential DB: {}", self.db_path.display())
        })?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    // ── Schema ──────────────────────────────────────────────────────

    /// Create the `users` table if it is missing. Safe to call on every start.
    pub fn ensure_schema(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create credential DB dir: {}", parent.display())
            })?;
        }

        let conn = self.connect()?;

        // WAL mode for concurrent reads + crash safety. Persists in the file.
        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                name          TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            );",
        )?;

        // An older layout stored names only. Refuse it instead of failing later
        // on every query.
        let has_hash_column: bool = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'password_hash'",
            [],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )?;
        if !has_hash_column {
            bail!(
                "Table 'users' in {} has no password_hash column; it was created by a \
                 name-only version and must be recreated",
                self.db_path.display()
            );
        }

        tracing::debug!(
            db = %self.db_path.display(),
            journal_mode = %journal_mode,
            "Credential schema ready"
        );
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// True iff exactly one user is stored under `name`.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count == 1)
    }

    /// Register `name` with the digest of `password`.
    ///
    /// Returns `Ok(false)` when the name is already taken. The existence check
    /// is only an early exit; the `UNIQUE` constraint decides when two callers
    /// race for the same name.
    pub fn register(&self, name: &str, password: &str) -> Result<bool> {
        let password_hash = sha256_hex(password);

        if self.exists(name)? {
            tracing::debug!(user = name, "Registration refused: name already taken");
            return Ok(false);
        }

        let conn = self.connect()?;
        let result = conn.execute(
            "INSERT INTO users (name, password_hash) VALUES (?1, ?2)",
            params![name, password_hash],
        );

        match result {
            Ok(_) => {
                tracing::info!(user = name, "User registered");
                Ok(true)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                tracing::debug!(user = name, "Registration lost race: name already taken");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True iff exactly one user matches both `name` and the digest of `password`.
    pub fn authenticate(&self, name: &str, password: &str) -> Result<bool> {
        let password_hash = sha256_hex(password);
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE name = ?1 AND password_hash = ?2",
            params![name, password_hash],
            |row| row.get(0),
        )?;
        Ok(count == 1)
    }

    /// Look up a user by exact name.
    pub fn find_user(&self, name: &str) -> Result<Option<User>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                "SELECT id, name, password_hash FROM users WHERE name = ?1",
                params![name],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Count registered users.
    pub fn user_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Lowercase hex SHA-256 of `plaintext` (64 chars). No salt, single pass.
pub fn sha256_hex(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CredentialStore) {
        let tmp = TempDir::new().unwrap();
        let store = CredentialStore::open(tmp.path().join("users.db")).unwrap();
        (tmp, store)
    }

    #[test]
    fn register_then_exists() {
        let (_tmp, store) = test_store();

        assert!(!store.exists("alice").unwrap());
        assert!(store.register("alice", "secret1").unwrap());
        assert!(store.exists("alice").unwrap());
    }

    #[test]
    fn register_duplicate_keeps_original_hash() {
        let (_tmp, store) = test_store();

        assert!(store.register("alice", "secret1").unwrap());
        let before = store.find_user("alice").unwrap().unwrap();

        assert!(!store.register("alice", "secret2").unwrap());
        let after = store.find_user("alice").unwrap().unwrap();

        assert_eq!(before, after);
        assert_eq!(after.password_hash, sha256_hex("secret1"));
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn alice_scenario() {
        let (_tmp, store) = test_store();

        assert!(store.register("alice", "secret1").unwrap());
        assert!(!store.register("alice", "secret2").unwrap());
        assert!(store.authenticate("alice", "secret1").unwrap());
        assert!(!store.authenticate("alice", "secret2").unwrap());
    }

    #[test]
    fn empty_store_knows_nobody() {
        let (_tmp, store) = test_store();

        assert!(!store.exists("nobody").unwrap());
        assert!(!store.authenticate("nobody", "x").unwrap());
    }

    #[test]
    fn authenticate_unregistered_name_with_known_password_fails() {
        let (_tmp, store) = test_store();

        store.register("validUser", "secret").unwrap();
        assert!(!store.authenticate("ghostUser", "secret").unwrap());
    }

    #[test]
    fn names_are_case_sensitive() {
        let (_tmp, store) = test_store();

        assert!(store.register("Alice", "pw1").unwrap());
        assert!(store.register("alice", "pw2").unwrap());
        assert!(store.authenticate("Alice", "pw1").unwrap());
        assert!(!store.authenticate("ALICE", "pw1").unwrap());
        assert_eq!(store.user_count().unwrap(), 2);
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let (_tmp, store) = test_store();

        store.register("first", "a").unwrap();
        store.register("second", "b").unwrap();
        let first = store.find_user("first").unwrap().unwrap();
        let second = store.find_user("second").unwrap().unwrap();
        assert!(second.id > first.id);
        assert!(store.find_user("third").unwrap().is_none());
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let (_tmp, store) = test_store();

        store.register("alice", "secret1").unwrap();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();

        let conn = store.connect().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
        assert!(store.authenticate("alice", "secret1").unwrap());
    }

    #[test]
    fn ensure_schema_creates_parent_dir() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("dir").join("users.db");
        let store = CredentialStore::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.db_path(), db_path.as_path());
    }

    #[test]
    fn name_only_table_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("legacy.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE);",
            )
            .unwrap();
        }

        let result = CredentialStore::open(&db_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("password_hash"));
    }

    #[test]
    fn unopenable_path_surfaces_error() {
        let tmp = TempDir::new().unwrap();
        // A directory cannot be opened as a database file.
        let store = CredentialStore::new(tmp.path());
        assert!(store.exists("alice").is_err());
    }

    #[test]
    fn concurrent_same_name_registration_has_one_winner() {
        let (_tmp, store) = test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.register("racer", &format!("pw{i}")).unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn sha256_hex_is_deterministic_lowercase_hex() {
        let h1 = sha256_hex("secret1");
        let h2 = sha256_hex("secret1");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(h1, sha256_hex("secret2"));
    }

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn stored_hash_is_unsalted_digest() {
        let (_tmp, store) = test_store();

        store.register("u1", "same").unwrap();
        store.register("u2", "same").unwrap();
        let u1 = store.find_user("u1").unwrap().unwrap();
        let u2 = store.find_user("u2").unwrap().unwrap();
        assert_eq!(u1.password_hash, u2.password_hash);
    }
}
