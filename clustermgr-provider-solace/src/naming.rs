//! Naming and derivation rules
//!
//! The remote convention suffixes router names: a generated name ends in
//! `primary`, a name built from a user-supplied prefix ends in `primarycn`,
//! and the other members of a cluster carry `backup` or `monitoring`. Reading
//! back, the suffix is stripped to recover the prefix the user owns.

use regex::Regex;

/// Extract the router prefix from a full router name.
///
/// A name matching none of the known suffixes is returned unchanged.
pub fn router_prefix(router_name: &str) -> String {
    let Ok(re) = Regex::new(r"^(.*)(?:primary|backup|monitoring)(?:cn)?$") else {
        return router_name.to_string();
    };
    match re.captures(router_name).and_then(|caps| caps.get(1)) {
        Some(prefix) => prefix.as_str().to_string(),
        None => router_name.to_string(),
    }
}

/// Returns `None` instead of an empty string, so unset optionals are omitted
/// from request bodies and the server-side defaulting activates.
pub fn null_if_empty(value: Option<&str>) -> Option<String> {
    match value {
        None | Some("") => None,
        Some(s) => Some(s.to_string()),
    }
}
