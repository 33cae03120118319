//! Transfer header filtering
//!
//! Clients pass headers meant for the remote endpoint by prefixing them
//! with `TransferHeader`. Only those are forwarded, with the prefix removed.

use std::collections::{BTreeMap, HashMap};

use crate::constants::TRANSFER_HEADER_PREFIX;

/// Select the request headers to forward to the remote endpoint
///
/// The prefix match ignores case; the remainder of the name keeps its case.
/// A header consisting only of the prefix is dropped.
pub fn build_transfer_headers(request_headers: &HashMap<String, String>) -> BTreeMap<String, String> {
    request_headers
        .iter()
        .filter_map(|(name, value)| {
            let prefix = name.get(..TRANSFER_HEADER_PREFIX.len())?;
            if !prefix.eq_ignore_ascii_case(TRANSFER_HEADER_PREFIX) {
                return None;
            }
            let stripped = &name[TRANSFER_HEADER_PREFIX.len()..];
            if stripped.is_empty() {
                return None;
            }
            Some((stripped.to_string(), value.clone()))
        })
        .collect()
}
