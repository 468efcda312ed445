//! Route templates and parameter encoding policy.
//!
//! [`EndpointTemplate`] resolves routes like `/sounds/<sound_id>/` against a
//! base URL, percent-encoding every substituted value. [`routes`] lists every
//! route the client uses, and [`encode_tags`] is the single canonical form for
//! multi-valued tag parameters.

pub mod routes;
mod template;

pub use template::{EncodingError, EndpointTemplate};

/// Encodes a tag list into one parameter value.
///
/// Each tag is trimmed and runs of internal whitespace become a single `-`;
/// empty tags are dropped; tags are joined with one space. The transport then
/// percent-encodes the value like any other parameter. Returns `None` when no
/// tag survives so the parameter is omitted instead of sent empty.
#[must_use]
pub fn encode_tags<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    let encoded: Vec<String> = tags
        .iter()
        .map(|tag| tag.as_ref().split_whitespace().collect::<Vec<_>>().join("-"))
        .filter(|tag| !tag.is_empty())
        .collect();
    if encoded.is_empty() {
        None
    } else {
        Some(encoded.join(" "))
    }
}
