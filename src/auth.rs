// 🔐 Authentication Gate - allow-list + shared passphrase
//
// Plaintext comparison, no lockout, one error for every failure cause.
// The passphrase may be configured as a SHA-256 digest instead of plain text;
// the check is still "the entered passphrase matches exactly".

use crate::error::AuthError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_IDENTITIES: [&str; 3] = ["Bmehaini", "Mguerger", "Clamsalla"];
pub const DEFAULT_PASSPHRASE: &str = "1234";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passphrase {
    Plain(String),
    /// Lowercase hex SHA-256 of the passphrase
    Sha256(String),
}

impl Passphrase {
    pub fn sha256_hex(input: &str) -> String {
        format!("{:x}", Sha256::digest(input.as_bytes()))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Passphrase::Plain(expected) => expected == candidate,
            Passphrase::Sha256(digest) => digest.eq_ignore_ascii_case(&Self::sha256_hex(candidate)),
        }
    }
}

/// Who is using the form. Unauthenticated until a successful sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub identity: String,
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    identities: Vec<String>,
    passphrase: Passphrase,
}

impl AuthGate {
    pub fn new(identities: Vec<String>, passphrase: Passphrase) -> Self {
        Self {
            identities,
            passphrase,
        }
    }

    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    pub fn authenticate(&self, identity: &str, passphrase: &str) -> Result<Session, AuthError> {
        let known = self.identities.iter().any(|i| i == identity);

        if known && self.passphrase.matches(passphrase) {
            tracing::info!(identity, "sign-in accepted");
            Ok(Session {
                authenticated: true,
                identity: identity.to_string(),
                signed_in_at: Some(Utc::now()),
            })
        } else {
            tracing::warn!("sign-in rejected");
            Err(AuthError)
        }
    }
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new(
            DEFAULT_IDENTITIES.iter().map(|s| s.to_string()).collect(),
            Passphrase::Plain(DEFAULT_PASSPHRASE.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_identity_with_passphrase() {
        let session = AuthGate::default().authenticate("Bmehaini", "1234").unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.identity, "Bmehaini");
        assert!(session.signed_in_at.is_some());
    }

    #[test]
    fn test_failures_are_indistinguishable() {
        let gate = AuthGate::default();
        let unknown = gate.authenticate("Intrus", "1234").unwrap_err();
        let wrong = gate.authenticate("Mguerger", "4321").unwrap_err();

        assert_eq!(unknown, wrong);
        assert_eq!(unknown.to_string(), "Identifiants incorrects.");
    }

    #[test]
    fn test_identity_match_is_exact() {
        let gate = AuthGate::default();
        assert!(gate.authenticate("bmehaini", "1234").is_err());
        assert!(gate.authenticate("Bmehaini ", "1234").is_err());
    }

    #[test]
    fn test_digest_passphrase() {
        let digest = Passphrase::sha256_hex("s3cret");
        assert_eq!(digest.len(), 64);

        let gate = AuthGate::new(vec!["Clamsalla".into()], Passphrase::Sha256(digest));
        assert!(gate.authenticate("Clamsalla", "s3cret").is_ok());
        assert!(gate.authenticate("Clamsalla", "1234").is_err());
    }

    #[test]
    fn test_default_session_is_logged_out() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert!(session.identity.is_empty());
    }
}
