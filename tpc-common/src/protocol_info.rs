//! Transport descriptors for the remote leg of a transfer
//!
//! A descriptor tells the transfer manager how to reach the remote endpoint:
//! the network address, the URL, transport tuning and the credential. Only
//! the transport that can use a credential carries one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::credential::{Credential, X509Credential};

/// Host and port of the remote endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// GridFTP transfer, always authenticated with an X.509 credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsiftpProtocolInfo {
    pub address: RemoteAddress,
    pub url: String,
    pub buffer_size: u32,
    pub tcp_buffer_size: u32,
    pub credential: X509Credential,
}

/// Plain HTTP transfer, never carries a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpProtocolInfo {
    pub address: RemoteAddress,
    pub url: String,
    pub require_verification: bool,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// HTTPS transfer with an optional certificate or bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpsProtocolInfo {
    pub address: RemoteAddress,
    pub url: String,
    pub require_verification: bool,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
}

/// Transport-specific connection descriptor sent with a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol")]
pub enum ProtocolInfo {
    RemoteGsiftpTransfer(GsiftpProtocolInfo),
    RemoteHttpDataTransfer(HttpProtocolInfo),
    RemoteHttpsDataTransfer(HttpsProtocolInfo),
}

impl ProtocolInfo {
    /// Protocol name as understood by the transfer manager
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoteGsiftpTransfer(_) => "RemoteGsiftpTransfer",
            Self::RemoteHttpDataTransfer(_) => "RemoteHttpDataTransfer",
            Self::RemoteHttpsDataTransfer(_) => "RemoteHttpsDataTransfer",
        }
    }

    pub fn address(&self) -> &RemoteAddress {
        match self {
            Self::RemoteGsiftpTransfer(info) => &info.address,
            Self::RemoteHttpDataTransfer(info) => &info.address,
            Self::RemoteHttpsDataTransfer(info) => &info.address,
        }
    }
}
