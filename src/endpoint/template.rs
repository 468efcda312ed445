//! Route templates with `<name>` placeholders.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Errors raised while resolving a route template.
///
/// These are programming errors: the caller built bindings that do not match
/// the route. They are fatal to the call but never panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// A placeholder in the template had no binding.
    #[error("unresolved placeholder <{name}> in route {template}")]
    UnresolvedPlaceholder {
        /// The route template.
        template: String,
        /// The placeholder without angle brackets.
        name: String,
    },

    /// A binding was present but empty, which would collapse a path segment.
    #[error("empty value bound to <{name}> in route {template}")]
    EmptyValue {
        /// The route template.
        template: String,
        /// The placeholder without angle brackets.
        name: String,
    },

    /// The template itself has an unterminated or empty `<...>`.
    #[error("malformed route template {template}")]
    MalformedTemplate {
        /// The route template.
        template: String,
    },

    /// The base URL and resolved path do not form a valid URL.
    #[error("invalid URL {url}")]
    InvalidUrl {
        /// The joined URL string.
        url: String,
    },
}

/// One piece of a parsed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// An immutable route such as `/sounds/<sound_id>/comments/`.
///
/// Resolution is a pure function of the template and its bindings: each
/// placeholder is replaced by its percent-encoded value and the result is
/// appended to a base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointTemplate(&'static str);

impl EndpointTemplate {
    /// Wraps a static route string.
    #[must_use]
    pub const fn new(route: &'static str) -> Self {
        Self(route)
    }

    /// Returns the raw route string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Returns the placeholder names in order of appearance.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::MalformedTemplate`] for an unterminated or empty `<>`.
    pub fn placeholders(&self) -> Result<Vec<&'static str>, EncodingError> {
        Ok(self
            .segments()?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name),
                Segment::Literal(_) => None,
            })
            .collect())
    }

    /// Substitutes every placeholder and returns the encoded path.
    ///
    /// Bindings for names that do not appear in the template are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] when a placeholder is unbound, bound to an
    /// empty string, or the template is malformed.
    pub fn expand(&self, bindings: &[(&str, &str)]) -> Result<String, EncodingError> {
        let mut path = String::with_capacity(self.0.len() + 16);
        for segment in self.segments()? {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Placeholder(name) => {
                    let value = bindings
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| EncodingError::UnresolvedPlaceholder {
                            template: self.0.to_string(),
                            name: name.to_string(),
                        })?;
                    if value.is_empty() {
                        return Err(EncodingError::EmptyValue {
                            template: self.0.to_string(),
                            name: name.to_string(),
                        });
                    }
                    path.push_str(&urlencoding::encode(value));
                }
            }
        }
        Ok(path)
    }

    /// Expands the template and joins it onto `base`.
    ///
    /// The base path is kept (`https://host/apiv2` + `/me/` yields
    /// `https://host/apiv2/me/`); a trailing slash on the base is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] from [`expand`](Self::expand), or
    /// [`EncodingError::InvalidUrl`] if the joined string does not parse.
    pub fn resolve(&self, base: &Url, bindings: &[(&str, &str)]) -> Result<Url, EncodingError> {
        let path = self.expand(bindings)?;
        let joined = format!("{}{path}", base.as_str().trim_end_matches('/'));
        Url::parse(&joined).map_err(|_| EncodingError::InvalidUrl { url: joined })
    }

    fn segments(&self) -> Result<Vec<Segment<'static>>, EncodingError> {
        let malformed = || EncodingError::MalformedTemplate {
            template: self.0.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = self.0;
        while let Some(open) = rest.find('<') {
            if open > 0 {
                segments.push(Segment::Literal(&rest[..open]));
            }
            let after_open = &rest[open + 1..];
            let close = after_open.find('>').ok_or_else(malformed)?;
            let name = &after_open[..close];
            if name.is_empty() || name.contains('<') {
                return Err(malformed());
            }
            segments.push(Segment::Placeholder(name));
            rest = &after_open[close + 1..];
        }
        if rest.contains('>') {
            return Err(malformed());
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }
        Ok(segments)
    }
}

impl fmt::Display for EndpointTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
