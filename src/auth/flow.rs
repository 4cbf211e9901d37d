//! Login and registration flows on top of [`CredentialStore`].
//!
//! These turn raw form input into an outcome plus the notice to show the user.
//! Empty fields are ignored outright, as the forms did: nothing is shown and
//! the store is not touched.

use anyhow::Result;

use super::session::{Session, SessionContext};
use super::store::CredentialStore;

/// Default minimum password length for registration.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

const LOGIN_FAILED_MESSAGE: &str = "Username or password is incorrect.";
const NAME_TAKEN_MESSAGE: &str = "Username already exists.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

// ── Password rule ───────────────────────────────────────────────────

/// Registration-time password length requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRule {
    pub min_len: usize,
}

/// Result of checking a candidate password, for live form feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub label: String,
    pub satisfied: bool,
}

impl Default for PasswordRule {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

impl PasswordRule {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn label(&self) -> String {
        format!("At least {} characters", self.min_len)
    }

    pub fn is_satisfied(&self, password: &str) -> bool {
        password.chars().count() >= self.min_len
    }

    pub fn check(&self, password: &str) -> PasswordCheck {
        PasswordCheck {
            label: self.label(),
            satisfied: self.is_satisfied(password),
        }
    }
}

// ── Login ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A field was empty; nothing happened.
    Ignored,
    Accepted {
        notice: Notice,
        session: Session,
        next_scene: String,
    },
    /// Wrong name or wrong password. The notice does not say which.
    Rejected { notice: Notice },
}

impl LoginOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Ignored => None,
            Self::Accepted { notice, .. } | Self::Rejected { notice } => Some(notice),
        }
    }
}

pub struct LoginFlow<'a> {
    store: &'a CredentialStore,
    session: &'a SessionContext,
    next_scene: String,
}

impl<'a> LoginFlow<'a> {
    pub fn new(
        store: &'a CredentialStore,
        session: &'a SessionContext,
        next_scene: impl Into<String>,
    ) -> Self {
        Self {
            store,
            session,
            next_scene: next_scene.into(),
        }
    }

    pub fn submit(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        if username.is_empty() || password.is_empty() {
            return Ok(LoginOutcome::Ignored);
        }

        if !self.store.authenticate(username, password)? {
            tracing::info!(user = username, "Login rejected");
            return Ok(LoginOutcome::Rejected {
                notice: Notice::error(LOGIN_FAILED_MESSAGE),
            });
        }

        let session = self.session.begin(username);
        Ok(LoginOutcome::Accepted {
            notice: Notice::success(format!("Login successful for: {username}")),
            session,
            next_scene: self.next_scene.clone(),
        })
    }
}

// ── Registration ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A field was empty; nothing happened.
    Ignored,
    /// Password failed the length rule; the store was not called.
    Invalid { notice: Notice },
    Registered { notice: Notice },
    Taken { notice: Notice },
}

impl RegisterOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Ignored => None,
            Self::Invalid { notice } | Self::Registered { notice } | Self::Taken { notice } => {
                Some(notice)
            }
        }
    }
}

pub struct RegisterFlow<'a> {
    store: &'a CredentialStore,
    rule: PasswordRule,
}

impl<'a> RegisterFlow<'a> {
    pub fn new(store: &'a CredentialStore, rule: PasswordRule) -> Self {
        Self { store, rule }
    }

    pub fn rule(&self) -> PasswordRule {
        self.rule
    }

    pub fn submit(&self, username: &str, password: &str) -> Result<RegisterOutcome> {
        if username.is_empty() || password.is_empty() {
            return Ok(RegisterOutcome::Ignored);
        }

        if !self.rule.is_satisfied(password) {
            return Ok(RegisterOutcome::Invalid {
                notice: Notice::error(format!(
                    "Password must be at least {} characters.",
                    self.rule.min_len
                )),
            });
        }

        if self.store.register(username, password)? {
            Ok(RegisterOutcome::Registered {
                notice: Notice::success(format!("User registered: {username}")),
            })
        } else {
            Ok(RegisterOutcome::Taken {
                notice: Notice::error(NAME_TAKEN_MESSAGE),
            })
        }
    }
}
