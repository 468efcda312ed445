//! Description of one logical API request.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::endpoint::{EncodingError, EndpointTemplate};

/// HTTP verb used by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Parameters travel in the query string.
    Get,
    /// Parameters travel in a form-encoded body.
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// Route, path bindings, parameters, and per-call timeout for one request.
///
/// Parameters with no value are kept in the spec but never sent, so
/// operations can pass optional arguments straight through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    route: EndpointTemplate,
    method: HttpMethod,
    bindings: Vec<(&'static str, String)>,
    params: Vec<(String, Option<String>)>,
    timeout: Option<Duration>,
}

impl RequestSpec {
    /// A request with no bindings or parameters.
    #[must_use]
    pub fn new(method: HttpMethod, route: EndpointTemplate) -> Self {
        Self {
            route,
            method,
            bindings: Vec::new(),
            params: Vec::new(),
            timeout: None,
        }
    }

    /// Shorthand for a GET request.
    #[must_use]
    pub fn get(route: EndpointTemplate) -> Self {
        Self::new(HttpMethod::Get, route)
    }

    /// Shorthand for a POST request.
    #[must_use]
    pub fn post(route: EndpointTemplate) -> Self {
        Self::new(HttpMethod::Post, route)
    }

    /// Binds a route placeholder.
    #[must_use]
    pub fn bind(mut self, placeholder: &'static str, value: impl fmt::Display) -> Self {
        self.bindings.push((placeholder, value.to_string()));
        self
    }

    /// Adds a parameter that is always sent.
    #[must_use]
    pub fn param(self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.optional_param(name, Some(value))
    }

    /// Adds a parameter that is omitted from the request when `value` is `None`.
    #[must_use]
    pub fn optional_param<V: fmt::Display>(
        mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.params
            .push((name.into(), value.map(|value| value.to_string())));
        self
    }

    /// Replaces any existing parameter named `name`.
    #[must_use]
    pub fn set_param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.params.retain(|(existing, _)| existing != name);
        self.param(name, value)
    }

    /// Overrides the default request timeout for this call.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The route template.
    #[must_use]
    pub fn route(&self) -> EndpointTemplate {
        self.route
    }

    /// The HTTP verb.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Per-call timeout override, if any.
    #[must_use]
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Parameters that will actually be sent, in insertion order.
    #[must_use]
    pub fn present_params(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|value| (name.as_str(), value)))
            .collect()
    }

    /// Resolves the route against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] when a placeholder is unbound or a binding is empty.
    pub fn resolve(&self, base: &Url) -> Result<Url, EncodingError> {
        let bindings: Vec<(&str, &str)> = self
            .bindings
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        self.route.resolve(base, &bindings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::endpoint::routes;

    #[test]
    fn test_absent_params_are_not_present() {
        let spec = RequestSpec::get(routes::TEXT_SEARCH)
            .optional_param("filter", None::<String>)
            .optional_param("query", Some("abc"));
        assert_eq!(spec.present_params(), vec![("query", "abc")]);
    }

    #[test]
    fn test_params_keep_insertion_order() {
        let spec = RequestSpec::post(routes::BOOKMARK)
            .param("name", "kick")
            .param("category", "drums");
        assert_eq!(
            spec.present_params(),
            vec![("name", "kick"), ("category", "drums")]
        );
    }

    #[test]
    fn test_set_param_replaces_previous_value() {
        let spec = RequestSpec::get(routes::TEXT_SEARCH)
            .param("page", 1)
            .set_param("page", 2);
        assert_eq!(spec.present_params(), vec![("page", "2")]);
    }

    #[test]
    fn test_resolve_uses_bindings() {
        let base = Url::parse("https://freesound.org/apiv2").unwrap();
        let url = RequestSpec::get(routes::SOUND)
            .bind("sound_id", 1234)
            .resolve(&base)
            .unwrap();
        assert_eq!(url.as_str(), "https://freesound.org/apiv2/sounds/1234/");
    }

    #[test]
    fn test_resolve_without_binding_fails() {
        let base = Url::parse("https://freesound.org/apiv2").unwrap();
        let result = RequestSpec::get(routes::SOUND).resolve(&base);
        assert!(matches!(
            result,
            Err(EncodingError::UnresolvedPlaceholder { .. })
        ));
    }

    #[test]
    fn test_timeout_override() {
        let spec = RequestSpec::get(routes::ME).timeout(Duration::from_secs(5));
        assert_eq!(spec.timeout_override(), Some(Duration::from_secs(5)));
        assert_eq!(RequestSpec::get(routes::ME).timeout_override(), None);
    }
}
