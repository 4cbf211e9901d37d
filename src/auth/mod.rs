//! Local user authentication.
//!
//! Provides:
//! - Username/password registration and verification (single-pass SHA-256)
//! - SQLite-backed persistent storage, one connection per operation
//! - An explicit session context holding the logged-in identity
//! - Login and registration flows producing user-facing notices
//!
//! ## Design Decisions
//! - Name uniqueness is enforced by the table's `UNIQUE` constraint. The
//!   existence check before insert only short-circuits the common case.
//! - Hashes are unsalted, matching existing databases. See `store` docs.
//! - No global "current user". Callers own a `SessionContext` and pass it on.

pub mod flow;
pub mod session;
pub mod store;

pub use flow::{
    LoginFlow, LoginOutcome, Notice, NoticeLevel, PasswordCheck, PasswordRule, RegisterFlow,
    RegisterOutcome,
};
pub use session::{Session, SessionContext};
pub use store::{sha256_hex, CredentialStore, User};
