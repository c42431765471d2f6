//! The holder abstraction: who owns a cart line or reservation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{AccountId, SessionKey};
use crate::error::Error;

/// Discriminant for the two holder identities, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderKind {
    /// Anonymous browser session.
    Session,
    /// Authenticated account.
    Account,
}

impl HolderKind {
    /// Stable string form used in persistence keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HolderKind::Session => "session",
            HolderKind::Account => "account",
        }
    }
}

impl fmt::Display for HolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HolderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(HolderKind::Session),
            "account" => Ok(HolderKind::Account),
            other => Err(Error::Parse(format!("unknown holder kind: {other}"))),
        }
    }
}

/// The identity that owns a cart and its reservations: either an anonymous
/// session or an authenticated account.
///
/// Mutually exclusive at steady state; a shopper transiently holds both
/// identities during the login merge, which re-keys session reservations to
/// the account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holder {
    /// Anonymous shopper, keyed by session.
    Session(SessionKey),
    /// Authenticated shopper, keyed by account.
    Account(AccountId),
}

impl Holder {
    /// Shorthand constructor for a session holder.
    pub fn session(key: impl Into<SessionKey>) -> Self {
        Holder::Session(key.into())
    }

    /// Shorthand constructor for an account holder.
    pub fn account(id: impl Into<AccountId>) -> Self {
        Holder::Account(id.into())
    }

    /// The persistence discriminant for this holder.
    #[must_use]
    pub fn kind(&self) -> HolderKind {
        match self {
            Holder::Session(_) => HolderKind::Session,
            Holder::Account(_) => HolderKind::Account,
        }
    }

    /// The opaque identifier half of the persistence key.
    #[must_use]
    pub fn id_str(&self) -> &str {
        match self {
            Holder::Session(key) => key.as_str(),
            Holder::Account(id) => id.as_str(),
        }
    }

    /// The account behind this holder, if authenticated.
    #[must_use]
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            Holder::Account(id) => Some(id),
            Holder::Session(_) => None,
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_str())
    }
}
