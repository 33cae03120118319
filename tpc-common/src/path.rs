//! Storage namespace paths
//!
//! A `FsPath` is an absolute, `/`-separated path in the storage system's
//! namespace. It is validated once on construction so that the orchestrator
//! and the transfer manager agree on what a path looks like.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum length for storage paths in bytes
pub const MAX_FS_PATH_LENGTH: usize = 4096;

/// Validation error for storage paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsPathError {
    /// Path does not start with `/`
    NotAbsolute,
    /// Path exceeds maximum length
    TooLong,
    /// Path contains null bytes
    ContainsNull,
    /// Path contains control characters
    InvalidCharacters,
    /// Path contains a `..` component
    ContainsTraversal,
}

impl fmt::Display for FsPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAbsolute => write!(f, "path must be absolute"),
            Self::TooLong => write!(f, "path exceeds {MAX_FS_PATH_LENGTH} bytes"),
            Self::ContainsNull => write!(f, "path contains a null byte"),
            Self::InvalidCharacters => write!(f, "path contains control characters"),
            Self::ContainsTraversal => write!(f, "path contains a '..' component"),
        }
    }
}

impl std::error::Error for FsPathError {}

/// Absolute path in the storage namespace
///
/// Repeated separators and `.` components are collapsed, a trailing `/`
/// is dropped (except for the root itself).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FsPath(String);

impl FsPath {
    /// The namespace root
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse and normalise a path
    ///
    /// # Errors
    ///
    /// Returns a `FsPathError` variant describing the validation failure.
    pub fn new(path: &str) -> Result<Self, FsPathError> {
        if path.len() > MAX_FS_PATH_LENGTH {
            return Err(FsPathError::TooLong);
        }
        if !path.starts_with('/') {
            return Err(FsPathError::NotAbsolute);
        }
        for ch in path.chars() {
            if ch == '\0' {
                return Err(FsPathError::ContainsNull);
            }
            if ch.is_control() {
                return Err(FsPathError::InvalidCharacters);
            }
        }

        let mut normalised = String::with_capacity(path.len());
        for component in path.split('/') {
            match component {
                "" | "." => {}
                ".." => return Err(FsPathError::ContainsTraversal),
                name => {
                    normalised.push('/');
                    normalised.push_str(name);
                }
            }
        }
        if normalised.is_empty() {
            normalised.push('/');
        }

        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` equals `prefix` or lies below it
    #[must_use]
    pub fn starts_with(&self, prefix: &FsPath) -> bool {
        if prefix.0 == "/" {
            return true;
        }
        match self.0.strip_prefix(prefix.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FsPath {
    type Err = FsPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FsPath {
    type Error = FsPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<FsPath> for String {
    fn from(path: FsPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(FsPath::new("/").unwrap().as_str(), "/");
        assert_eq!(
            FsPath::new("/data/run1/file.root").unwrap().as_str(),
            "/data/run1/file.root"
        );
    }

    #[test]
    fn test_normalisation() {
        assert_eq!(FsPath::new("//data///x/").unwrap().as_str(), "/data/x");
        assert_eq!(FsPath::new("/data/./x").unwrap().as_str(), "/data/x");
        assert_eq!(FsPath::new("/./").unwrap().as_str(), "/");
    }

    #[test]
    fn test_unicode_paths() {
        assert!(FsPath::new("/日本語/ファイル.txt").is_ok());
        assert!(FsPath::new("/Émojis 👋/file.txt").is_ok());
    }

    #[test]
    fn test_relative_rejected() {
        assert_eq!(FsPath::new("data/x"), Err(FsPathError::NotAbsolute));
        assert_eq!(FsPath::new(""), Err(FsPathError::NotAbsolute));
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(FsPath::new("/a\0b"), Err(FsPathError::ContainsNull));
        assert_eq!(FsPath::new("/a\nb"), Err(FsPathError::InvalidCharacters));
        assert_eq!(FsPath::new("/a/../b"), Err(FsPathError::ContainsTraversal));
    }

    #[test]
    fn test_too_long() {
        let long = format!("/{}", "a".repeat(MAX_FS_PATH_LENGTH));
        assert_eq!(FsPath::new(&long), Err(FsPathError::TooLong));
    }

    #[test]
    fn test_starts_with() {
        let path = FsPath::new("/data/run1/file").unwrap();

        assert!(path.starts_with(&FsPath::root()));
        assert!(path.starts_with(&FsPath::new("/data").unwrap()));
        assert!(path.starts_with(&FsPath::new("/data/run1/file").unwrap()));
        assert!(!path.starts_with(&FsPath::new("/dat").unwrap()));
        assert!(!path.starts_with(&FsPath::new("/data/run2").unwrap()));
    }

    #[test]
    fn test_serde_validates() {
        let path: FsPath = serde_json::from_str("\"/a//b\"").unwrap();
        assert_eq!(path.as_str(), "/a/b");
        assert!(serde_json::from_str::<FsPath>("\"relative\"").is_err());
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"/a/b\"");
    }
}
