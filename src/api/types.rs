//! Typed parameters for the resource operations.

use std::fmt;
use std::str::FromStr;

use crate::dispatch::RequestSpec;
use crate::endpoint::encode_tags;
use crate::paginate::PageRequest;

/// License a sound is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum License {
    /// CC BY.
    Attribution,
    /// CC BY-NC.
    AttributionNoncommercial,
    /// CC0.
    CreativeCommons0,
}

impl License {
    /// Value sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attribution => "Attribution",
            Self::AttributionNoncommercial => "Attribution Noncommercial",
            Self::CreativeCommons0 => "Creative Commons 0",
        }
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for License {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "attribution" | "by" => Ok(Self::Attribution),
            "attribution noncommercial" | "by-nc" => Ok(Self::AttributionNoncommercial),
            "creative commons 0" | "cc0" => Ok(Self::CreativeCommons0),
            other => Err(format!(
                "unknown license '{other}' (expected attribution, by-nc, or cc0)"
            )),
        }
    }
}

/// Preview encoding to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PreviewQuality {
    /// Low bitrate MP3.
    #[default]
    Low,
    /// High bitrate MP3.
    High,
}

impl PreviewQuality {
    /// Key of this preview in a sound's `previews` object.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Low => "preview-lq-mp3",
            Self::High => "preview-hq-mp3",
        }
    }
}

impl FromStr for PreviewQuality {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "lq" => Ok(Self::Low),
            "high" | "hq" => Ok(Self::High),
            other => Err(format!("unknown preview quality '{other}' (expected low or high)")),
        }
    }
}

/// Formats a geotag as `lat,lon,zoom`.
#[must_use]
pub fn format_geotag(latitude: f64, longitude: f64, zoom: u8) -> String {
    format!("{latitude},{longitude},{zoom}")
}

/// Metadata attached to an uploaded sound.
///
/// Used by upload, describe, and edit; tags go through
/// [`encode_tags`] in every case.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundDescription {
    /// Display name; the server uses the file name when absent.
    pub name: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Description text.
    pub description: String,
    /// Publication license.
    pub license: License,
    /// Pack to add the sound to.
    pub pack: Option<String>,
    /// Pre-formatted `lat,lon,zoom`, see [`format_geotag`].
    pub geotag: Option<String>,
}

impl SoundDescription {
    /// A description with no name, tags, pack, or geotag.
    #[must_use]
    pub fn new(description: impl Into<String>, license: License) -> Self {
        Self {
            name: None,
            tags: Vec::new(),
            description: description.into(),
            license,
            pack: None,
            geotag: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.tags = tags.iter().map(|tag| tag.as_ref().to_string()).collect();
        self
    }

    /// Sets the pack name.
    #[must_use]
    pub fn pack(mut self, pack: impl Into<String>) -> Self {
        self.pack = Some(pack.into());
        self
    }

    /// Sets the geotag from coordinates.
    #[must_use]
    pub fn geotag(mut self, latitude: f64, longitude: f64, zoom: u8) -> Self {
        self.geotag = Some(format_geotag(latitude, longitude, zoom));
        self
    }

    /// Adds every field to `spec` as a parameter; absent fields are omitted.
    pub(crate) fn apply(&self, spec: RequestSpec) -> RequestSpec {
        spec.optional_param("name", self.name.as_deref())
            .optional_param("tags", encode_tags(&self.tags))
            .param("description", &self.description)
            .param("license", self.license)
            .optional_param("pack", self.pack.as_deref())
            .optional_param("geotag", self.geotag.as_deref())
    }
}

/// Parameters of a text search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSearch {
    /// Search terms.
    pub query: String,
    /// Solr-style filter, e.g. `duration:[0 TO 5]`.
    pub filter: Option<String>,
    /// Sort order, e.g. `rating_desc`.
    pub sort: Option<String>,
    /// Response fields to include.
    pub fields: Vec<String>,
    /// Starting page and page size.
    pub page: PageRequest,
}

impl TextSearch {
    /// Searches for `query` with server defaults for everything else.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the filter expression.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Limits the response to `fields`.
    #[must_use]
    pub fn fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.fields = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    /// Sets the starting page and page size.
    #[must_use]
    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub(crate) fn apply(&self, spec: RequestSpec) -> RequestSpec {
        let fields = (!self.fields.is_empty()).then(|| self.fields.join(","));
        spec.param("query", &self.query)
            .optional_param("filter", self.filter.as_deref())
            .optional_param("sort", self.sort.as_deref())
            .optional_param("fields", fields)
    }
}
