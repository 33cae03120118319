//! Protocol descriptor construction
//!
//! Maps the remote URL's scheme to a transport, checks that the transport
//! accepts the offered credential, and builds the descriptor the transfer
//! manager needs to reach the remote endpoint. Everything here is pure.

use std::collections::BTreeMap;

use strum::{AsRefStr, EnumString};
use url::Url;

use tpc_common::protocol_info::{
    GsiftpProtocolInfo, HttpProtocolInfo, HttpsProtocolInfo, ProtocolInfo, RemoteAddress,
};
use tpc_common::{Credential, CredentialSource};

use crate::constants::{GSIFTP_TCP_BUFFER_SIZE, TRANSFER_BUFFER_SIZE};

use super::types::{TransferFlag, TransferFlags};

/// Transports supported for the remote leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransferType {
    Gsiftp,
    Http,
    Https,
}

impl TransferType {
    pub const ALL: [TransferType; 3] = [Self::Gsiftp, Self::Http, Self::Https];

    /// Resolve a URL scheme, ignoring case
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        scheme.parse().ok()
    }

    pub fn scheme(&self) -> &str {
        self.as_ref()
    }

    /// Port used when the URL does not name one
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Gsiftp => 2811,
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    /// Credential sources this transport can carry
    pub fn supported_sources(&self) -> &'static [CredentialSource] {
        match self {
            Self::Gsiftp => &[CredentialSource::Certificate],
            Self::Http => &[CredentialSource::None],
            Self::Https => &[
                CredentialSource::Certificate,
                CredentialSource::BearerToken,
                CredentialSource::None,
            ],
        }
    }

    pub fn is_supported(&self, source: CredentialSource) -> bool {
        self.supported_sources().contains(&source)
    }
}

impl std::fmt::Display for TransferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Reasons a descriptor cannot be built; all are client errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolInfoError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("{credential} credential not supported for {transfer_type} transfers")]
    UnsupportedCredential {
        transfer_type: TransferType,
        credential: CredentialSource,
    },

    #[error("remote URL has no host: {0}")]
    MissingHost(String),
}

/// Everything needed to describe the remote leg
pub struct ProtocolInfoParams<'a> {
    pub remote: &'a Url,
    pub credential: Option<&'a Credential>,
    pub headers: &'a BTreeMap<String, String>,
    pub flags: TransferFlags,
}

/// Resolve the transport for `remote` and check the credential against it
///
/// This is the construction-time check: it runs before anything is sent to
/// the transfer manager.
pub fn resolve_transfer_type(
    remote: &Url,
    credential: Option<&Credential>,
) -> Result<TransferType, ProtocolInfoError> {
    let transfer_type = TransferType::from_scheme(remote.scheme())
        .ok_or_else(|| ProtocolInfoError::UnsupportedScheme(remote.scheme().to_string()))?;

    let source = CredentialSource::of(credential);
    if !transfer_type.is_supported(source) {
        return Err(ProtocolInfoError::UnsupportedCredential {
            transfer_type,
            credential: source,
        });
    }

    Ok(transfer_type)
}

/// Build the descriptor for the remote leg
pub fn build_protocol_info(params: &ProtocolInfoParams<'_>) -> Result<ProtocolInfo, ProtocolInfoError> {
    let transfer_type = resolve_transfer_type(params.remote, params.credential)?;

    let host = params
        .remote
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ProtocolInfoError::MissingHost(params.remote.to_string()))?;
    let address = RemoteAddress {
        host: host.to_string(),
        port: params
            .remote
            .port()
            .unwrap_or_else(|| transfer_type.default_port()),
    };
    let url = params.remote.as_str().to_string();
    let require_verification = params.flags.contains(TransferFlag::RequireVerification);

    let info = match (transfer_type, params.credential) {
        (TransferType::Gsiftp, Some(Credential::X509(x509))) => {
            ProtocolInfo::RemoteGsiftpTransfer(GsiftpProtocolInfo {
                address,
                url,
                buffer_size: TRANSFER_BUFFER_SIZE,
                tcp_buffer_size: GSIFTP_TCP_BUFFER_SIZE,
                credential: x509.clone(),
            })
        }
        (TransferType::Http, None) => ProtocolInfo::RemoteHttpDataTransfer(HttpProtocolInfo {
            address,
            url,
            require_verification,
            headers: params.headers.clone(),
        }),
        (TransferType::Https, credential) => {
            ProtocolInfo::RemoteHttpsDataTransfer(HttpsProtocolInfo {
                address,
                url,
                require_verification,
                headers: params.headers.clone(),
                credential: credential.cloned(),
            })
        }
        (transfer_type, credential) => {
            return Err(ProtocolInfoError::UnsupportedCredential {
                transfer_type,
                credential: CredentialSource::of(credential),
            });
        }
    };

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpc_common::{BearerCredential, X509Credential};

    fn x509() -> Credential {
        Credential::X509(X509Credential {
            certificate_chain: vec!["CERT".to_string()],
            private_key: "KEY".to_string(),
        })
    }

    fn bearer() -> Credential {
        Credential::Bearer(BearerCredential::new("token"))
    }

    fn credential_for(source: CredentialSource) -> Option<Credential> {
        match source {
            CredentialSource::None => None,
            CredentialSource::Certificate => Some(x509()),
            CredentialSource::BearerToken => Some(bearer()),
        }
    }

    fn build(url: &str, credential: Option<&Credential>) -> Result<ProtocolInfo, ProtocolInfoError> {
        let remote = Url::parse(url).unwrap();
        let headers = BTreeMap::new();
        build_protocol_info(&ProtocolInfoParams {
            remote: &remote,
            credential,
            headers: &headers,
            flags: TransferFlags::with_verification(true),
        })
    }

    #[test]
    fn test_scheme_resolution_ignores_case() {
        assert_eq!(TransferType::from_scheme("GSIFTP"), Some(TransferType::Gsiftp));
        assert_eq!(TransferType::from_scheme("Http"), Some(TransferType::Http));
        assert_eq!(TransferType::from_scheme("https"), Some(TransferType::Https));
        assert_eq!(TransferType::from_scheme("ftp"), None);
        assert_eq!(TransferType::from_scheme(""), None);
    }

    #[test]
    fn test_supported_pairs_build_and_unsupported_pairs_fail() {
        let sources = [
            CredentialSource::None,
            CredentialSource::Certificate,
            CredentialSource::BearerToken,
        ];
        for transfer_type in TransferType::ALL {
            let url = format!("{}://remote.example.org/data/file", transfer_type.scheme());
            for source in sources {
                let credential = credential_for(source);
                let result = build(&url, credential.as_ref());
                if transfer_type.is_supported(source) {
                    assert!(result.is_ok(), "{transfer_type} with {source} should build");
                } else {
                    assert_eq!(
                        result,
                        Err(ProtocolInfoError::UnsupportedCredential {
                            transfer_type,
                            credential: source,
                        })
                    );
                }
            }
        }
    }

    #[test]
    fn test_unknown_scheme_fails_for_every_credential() {
        for credential in [None, Some(x509()), Some(bearer())] {
            assert_eq!(
                build("davs://remote.example.org/file", credential.as_ref()),
                Err(ProtocolInfoError::UnsupportedScheme("davs".to_string()))
            );
        }
    }

    #[test]
    fn test_default_ports() {
        let info = build("gsiftp://remote.example.org/file", Some(&x509())).unwrap();
        assert_eq!(info.address().port, 2811);
        let info = build("http://remote.example.org/file", None).unwrap();
        assert_eq!(info.address().port, 80);
        let info = build("https://remote.example.org/file", None).unwrap();
        assert_eq!(info.address().port, 443);
        let info = build("https://remote.example.org:8443/file", None).unwrap();
        assert_eq!(info.address().port, 8443);
        assert_eq!(info.address().host, "remote.example.org");
    }

    #[test]
    fn test_gsiftp_carries_certificate_and_buffers() {
        match build("gsiftp://remote.example.org:2812/file", Some(&x509())).unwrap() {
            ProtocolInfo::RemoteGsiftpTransfer(info) => {
                assert_eq!(info.address.port, 2812);
                assert_eq!(info.buffer_size, TRANSFER_BUFFER_SIZE);
                assert_eq!(info.tcp_buffer_size, GSIFTP_TCP_BUFFER_SIZE);
                assert_eq!(info.credential.private_key, "KEY");
                assert_eq!(info.url, "gsiftp://remote.example.org:2812/file");
            }
            other => panic!("Expected gsiftp descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_https_carries_matching_credential_only() {
        match build("https://remote.example.org/file", Some(&bearer())).unwrap() {
            ProtocolInfo::RemoteHttpsDataTransfer(info) => {
                assert!(info.require_verification);
                assert!(matches!(info.credential, Some(Credential::Bearer(_))));
            }
            other => panic!("Expected https descriptor, got {other:?}"),
        }
        match build("https://remote.example.org/file", None).unwrap() {
            ProtocolInfo::RemoteHttpsDataTransfer(info) => assert!(info.credential.is_none()),
            other => panic!("Expected https descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_headers_and_verification_flag() {
        let remote = Url::parse("http://remote.example.org/file").unwrap();
        let headers = BTreeMap::from([("Authorization".to_string(), "Basic x".to_string())]);
        let info = build_protocol_info(&ProtocolInfoParams {
            remote: &remote,
            credential: None,
            headers: &headers,
            flags: TransferFlags::empty(),
        })
        .unwrap();
        match info {
            ProtocolInfo::RemoteHttpDataTransfer(info) => {
                assert!(!info.require_verification);
                assert_eq!(info.headers, headers);
            }
            other => panic!("Expected http descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_deterministic() {
        let a = build("https://remote.example.org/file", Some(&x509())).unwrap();
        let b = build("https://remote.example.org/file", Some(&x509())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_error_messages() {
        let err = build("gsiftp://remote.example.org/file", Some(&bearer())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "bearer-token credential not supported for gsiftp transfers"
        );
        let err = build("ftp://remote.example.org/file", None).unwrap_err();
        assert_eq!(err.to_string(), "unsupported scheme: ftp");
    }
}
