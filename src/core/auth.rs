//! Quality-role gate
//!
//! Creating or mutating RNCs requires the shared quality password. A
//! successful [`QualityGate::login`] yields a [`QualitySession`], which every
//! write operation in [`crate::core::service`] takes by reference.

use miette::Diagnostic;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum AuthError {
    #[error("quality password is not configured")]
    #[diagnostic(
        code(rnc::auth::not_configured),
        help("set RNC_QUALITY_PASS or `quality_pass` in .rnc/config.yaml")
    )]
    NotConfigured,

    #[error("incorrect quality password")]
    #[diagnostic(code(rnc::auth::wrong_password))]
    WrongPassword,

    #[error("this action requires the quality role")]
    #[diagnostic(
        code(rnc::auth::password_required),
        help("pass --password or set RNC_PASSWORD")
    )]
    PasswordRequired,
}

/// Holds the digest of the configured shared secret
#[derive(Clone)]
pub struct QualityGate {
    digest: Option<[u8; 32]>,
}

impl std::fmt::Debug for QualityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl QualityGate {
    /// Build the gate; an empty secret counts as not configured
    pub fn new(secret: Option<&str>) -> Self {
        let digest = secret.filter(|s| !s.is_empty()).map(sha256);
        Self { digest }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    /// Check a supplied password against the shared secret
    pub fn login(&self, password: &str, actor: &str) -> Result<QualitySession, AuthError> {
        let expected = self.digest.ok_or(AuthError::NotConfigured)?;
        let supplied = sha256(password);

        // Compare every byte regardless of where the first mismatch is
        let diff = expected
            .iter()
            .zip(supplied.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        if diff == 0 {
            tracing::debug!(actor, "quality login accepted");
            Ok(QualitySession {
                actor: actor.to_string(),
            })
        } else {
            tracing::warn!(actor, "quality login rejected");
            Err(AuthError::WrongPassword)
        }
    }
}

/// Proof that the current user authenticated as the quality role
#[derive(Debug, Clone)]
pub struct QualitySession {
    actor: String,
}

impl QualitySession {
    /// Name recorded on history entries
    pub fn actor(&self) -> &str {
        &self.actor
    }
}

fn sha256(s: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
pub(crate) fn test_session() -> QualitySession {
    QualitySession {
        actor: "tester".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_accepts_matching_password() {
        let gate = QualityGate::new(Some("qualidade123"));
        let session = gate.login("qualidade123", "ana").unwrap();
        assert_eq!(session.actor(), "ana");
    }

    #[test]
    fn test_login_rejects_wrong_password() {
        let gate = QualityGate::new(Some("qualidade123"));
        assert_eq!(
            gate.login("qualidade12", "ana").unwrap_err(),
            AuthError::WrongPassword
        );
        assert_eq!(gate.login("", "ana").unwrap_err(), AuthError::WrongPassword);
    }

    #[test]
    fn test_unconfigured_gate_refuses_everyone() {
        for gate in [QualityGate::new(None), QualityGate::new(Some(""))] {
            assert!(!gate.is_configured());
            assert_eq!(gate.login("", "ana").unwrap_err(), AuthError::NotConfigured);
        }
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let gate = QualityGate::new(Some("hunter2"));
        let debug = format!("{:?}", gate);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("configured: true"));
    }
}
