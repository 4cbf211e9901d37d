//! Local username/password store backed by SQLite, with the login and
//! registration flows that sit on top of it.

pub mod auth;
pub mod config;
pub mod report;

pub use auth::{
    sha256_hex, CredentialStore, LoginFlow, LoginOutcome, Notice, NoticeLevel, PasswordRule,
    RegisterFlow, RegisterOutcome, Session, SessionContext, User,
};
pub use config::Config;
