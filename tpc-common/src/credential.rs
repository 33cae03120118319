//! Credentials offered for the remote leg of a third-party copy
//!
//! The orchestrator never inspects credential material; it only decides
//! which transport may carry which kind of credential and forwards the
//! material to the transfer manager. Debug output never includes secrets.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of digest bytes shown in a credential fingerprint
const FINGERPRINT_BYTES: usize = 8;

/// Category of authentication material offered for the remote leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// No credential, the remote endpoint is accessed anonymously
    None,
    /// X.509 certificate chain with its private key
    Certificate,
    /// OAuth2/OpenID Connect bearer token
    BearerToken,
}

impl CredentialSource {
    /// Determine the source of an optional credential
    #[must_use]
    pub fn of(credential: Option<&Credential>) -> Self {
        match credential {
            None => Self::None,
            Some(Credential::X509(_)) => Self::Certificate,
            Some(Credential::Bearer(_)) => Self::BearerToken,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Certificate => "certificate",
            Self::BearerToken => "bearer-token",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificate chain (PEM, leaf first) and the matching private key (PEM)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct X509Credential {
    pub certificate_chain: Vec<String>,
    pub private_key: String,
}

impl fmt::Debug for X509Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X509Credential")
            .field("certificate_chain_len", &self.certificate_chain.len())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Bearer token obtained from an OpenID Connect provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerCredential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Token issuer (the OP URL), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl BearerCredential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            issuer: None,
        }
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Credential delegated to the transfer manager for the remote leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    X509(X509Credential),
    Bearer(BearerCredential),
}

impl Credential {
    #[must_use]
    pub fn source(&self) -> CredentialSource {
        CredentialSource::of(Some(self))
    }

    /// Short, stable identifier for log lines
    ///
    /// Hex of the first bytes of a SHA-256 digest over the access token,
    /// or over the public certificate chain for X.509. The private key is
    /// never hashed.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Self::X509(x509) => {
                for pem in &x509.certificate_chain {
                    hasher.update(pem.as_bytes());
                }
            }
            Self::Bearer(bearer) => hasher.update(bearer.access_token.as_bytes()),
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..FINGERPRINT_BYTES])
    }
}
