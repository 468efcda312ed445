//! Resource operations of the sound-sharing API.
//!
//! [`Freesound`] maps each operation onto a [`RequestSpec`] and hands it to
//! the [`RequestDispatcher`]. Single resources come back as
//! [`serde_json::Value`]; list endpoints return a [`PaginatedQuery`] that
//! sends nothing until it is read.

pub mod descriptors;
mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::instrument;
use url::Url;

pub use descriptors::{Descriptor, DescriptorCategory};
pub use types::{License, PreviewQuality, SoundDescription, TextSearch, format_geotag};

use crate::auth::CredentialManager;
use crate::dispatch::{RequestDispatcher, RequestSpec};
use crate::endpoint::routes;
use crate::error::ClientError;
use crate::paginate::{PageRequest, PaginatedQuery};

/// Multipart field carrying the audio file on upload.
const AUDIO_FILE_FIELD: &str = "audiofile";

/// Highest accepted rating.
const MAX_RATING: i32 = 5;

/// Client for every resource operation.
#[derive(Debug, Clone)]
pub struct Freesound {
    dispatcher: RequestDispatcher,
}

impl Freesound {
    /// Creates a client that authenticates through `credentials`.
    #[must_use]
    pub fn new(credentials: CredentialManager) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(credentials),
        }
    }

    /// The underlying dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// The credential manager shared with the dispatcher.
    #[must_use]
    pub fn credentials(&self) -> &CredentialManager {
        self.dispatcher.credentials()
    }

    fn paginate(&self, spec: RequestSpec, page: PageRequest) -> PaginatedQuery {
        PaginatedQuery::new(self.dispatcher.clone(), spec, page)
    }

    // Search

    /// Text search over names, tags, and descriptions.
    #[must_use]
    pub fn search(&self, search: &TextSearch) -> PaginatedQuery {
        let spec = search.apply(RequestSpec::get(routes::TEXT_SEARCH));
        self.paginate(spec, search.page)
    }

    /// Sounds whose content descriptors are close to those of `target_sound_id`.
    #[must_use]
    pub fn content_search(&self, target_sound_id: u64, page: PageRequest) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::CONTENT_SEARCH).param("target", target_sound_id);
        self.paginate(spec, page)
    }

    /// Content search against explicit descriptor values, e.g.
    /// `lowlevel.pitch.mean` → `220`.
    ///
    /// The target is sent as `name:value` pairs joined by a space, in name order.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when `targets` is empty.
    pub fn content_search_by_descriptors(
        &self,
        targets: &BTreeMap<String, String>,
        page: PageRequest,
    ) -> Result<PaginatedQuery, ClientError> {
        if targets.is_empty() {
            return Err(ClientError::invalid_argument(
                "content search needs at least one descriptor target",
            ));
        }
        let target = targets
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join(" ");
        let spec = RequestSpec::get(routes::CONTENT_SEARCH).param("target", target);
        Ok(self.paginate(spec, page))
    }

    /// Text query restricted and ranked by content similarity to `target_sound_id`.
    #[must_use]
    pub fn combined_search(
        &self,
        query: &str,
        target_sound_id: u64,
        page: PageRequest,
    ) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::COMBINED_SEARCH)
            .param("query", query)
            .param("target", target_sound_id);
        self.paginate(spec, page)
    }

    // Sounds

    /// Full metadata of one sound.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn sound(&self, sound_id: u64) -> Result<Value, ClientError> {
        self.dispatcher
            .dispatch(&RequestSpec::get(routes::SOUND).bind("sound_id", sound_id))
            .await
    }

    /// Analysis values of one sound, restricted to `descriptors` when non-empty.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self, descriptors), fields(descriptors = descriptors.len()))]
    pub async fn analysis(
        &self,
        sound_id: u64,
        descriptors: &[Descriptor],
        normalized: bool,
    ) -> Result<Value, ClientError> {
        let wire_names =
            (!descriptors.is_empty()).then(|| descriptors::join_wire_names(descriptors));
        let spec = RequestSpec::get(routes::SOUND_ANALYSIS)
            .bind("sound_id", sound_id)
            .optional_param("descriptors", wire_names)
            .optional_param("normalized", normalized.then_some(1));
        self.dispatcher.dispatch(&spec).await
    }

    /// Sounds similar to `sound_id`.
    #[must_use]
    pub fn similar_sounds(&self, sound_id: u64, page: PageRequest) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::SIMILAR_SOUNDS).bind("sound_id", sound_id);
        self.paginate(spec, page)
    }

    /// Comments left on `sound_id`.
    #[must_use]
    pub fn comments(&self, sound_id: u64, page: PageRequest) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::COMMENTS).bind("sound_id", sound_id);
        self.paginate(spec, page)
    }

    /// Downloads the original file of `sound_id` to `destination`.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::download`].
    pub async fn download_sound(
        &self,
        sound_id: u64,
        destination: &Path,
    ) -> Result<PathBuf, ClientError> {
        let spec = RequestSpec::get(routes::DOWNLOAD).bind("sound_id", sound_id);
        self.dispatcher.download(&spec, destination).await
    }

    /// URL of a preview rendition of `sound_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidResponse`] when the sound has no such
    /// preview, otherwise see [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn preview_url(
        &self,
        sound_id: u64,
        quality: PreviewQuality,
    ) -> Result<Url, ClientError> {
        let spec = RequestSpec::get(routes::SOUND).bind("sound_id", sound_id);
        let sound = self.dispatcher.dispatch(&spec).await?;
        let field = quality.field_name();
        let context = || {
            spec.resolve(self.dispatcher.base_url())
                .map_or_else(|_| spec.route().to_string(), |url| url.to_string())
        };
        let raw = sound
            .get("previews")
            .and_then(|previews| previews.get(field))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::invalid_response(context(), format!("missing previews.{field}"))
            })?;
        Url::parse(raw).map_err(|e| {
            ClientError::invalid_response(context(), format!("previews.{field} is not a URL: {e}"))
        })
    }

    /// Downloads a preview of `sound_id` to `destination`.
    ///
    /// Previews are served from a CDN host and fetched without the bearer header.
    ///
    /// # Errors
    ///
    /// See [`preview_url`](Self::preview_url) and [`RequestDispatcher::download_url`].
    pub async fn download_preview(
        &self,
        sound_id: u64,
        quality: PreviewQuality,
        destination: &Path,
    ) -> Result<PathBuf, ClientError> {
        let url = self.preview_url(sound_id, quality).await?;
        self.dispatcher.download_url(&url, destination, false).await
    }

    // Uploads

    /// Uploads an audio file, optionally describing it in the same request.
    ///
    /// Without a description the sound waits in pending uploads until
    /// [`describe_sound`](Self::describe_sound) is called.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::upload`].
    pub async fn upload_sound(
        &self,
        file: &Path,
        description: Option<&SoundDescription>,
    ) -> Result<Value, ClientError> {
        let mut spec = RequestSpec::post(routes::UPLOAD);
        if let Some(description) = description {
            spec = description.apply(spec);
        }
        self.dispatcher.upload(&spec, AUDIO_FILE_FIELD, file).await
    }

    /// Describes a previously uploaded file.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self, description))]
    pub async fn describe_sound(
        &self,
        upload_filename: &str,
        description: &SoundDescription,
    ) -> Result<Value, ClientError> {
        let spec = description.apply(
            RequestSpec::post(routes::DESCRIBE).param("upload_filename", upload_filename),
        );
        self.dispatcher.dispatch(&spec).await
    }

    /// Replaces the description of a published sound.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self, description))]
    pub async fn edit_sound_description(
        &self,
        sound_id: u64,
        description: &SoundDescription,
    ) -> Result<Value, ClientError> {
        let spec =
            description.apply(RequestSpec::post(routes::EDIT_DESCRIPTION).bind("sound_id", sound_id));
        self.dispatcher.dispatch(&spec).await
    }

    /// Uploads still being processed, moderated, or waiting for a description.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn pending_uploads(&self) -> Result<Value, ClientError> {
        self.dispatcher
            .dispatch(&RequestSpec::get(routes::PENDING_UPLOADS))
            .await
    }

    // Interaction

    /// Bookmarks `sound_id`, optionally under a name and category.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn bookmark_sound(
        &self,
        sound_id: u64,
        name: Option<&str>,
        category: Option<&str>,
    ) -> Result<Value, ClientError> {
        let spec = RequestSpec::post(routes::BOOKMARK)
            .bind("sound_id", sound_id)
            .optional_param("name", name)
            .optional_param("category", category);
        self.dispatcher.dispatch(&spec).await
    }

    /// Rates `sound_id`; the rating is clamped to `0..=5`.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn rate_sound(&self, sound_id: u64, rating: i32) -> Result<Value, ClientError> {
        let spec = RequestSpec::post(routes::RATE)
            .bind("sound_id", sound_id)
            .param("rating", rating.clamp(0, MAX_RATING));
        self.dispatcher.dispatch(&spec).await
    }

    /// Posts a comment on `sound_id`.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self, comment))]
    pub async fn comment_sound(&self, sound_id: u64, comment: &str) -> Result<Value, ClientError> {
        let spec = RequestSpec::post(routes::COMMENT)
            .bind("sound_id", sound_id)
            .param("comment", comment);
        self.dispatcher.dispatch(&spec).await
    }

    // Users

    /// Profile of the authenticated user.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<Value, ClientError> {
        self.dispatcher.dispatch(&RequestSpec::get(routes::ME)).await
    }

    /// Profile of `username`.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn user(&self, username: &str) -> Result<Value, ClientError> {
        self.dispatcher
            .dispatch(&RequestSpec::get(routes::USER).bind("username", username))
            .await
    }

    /// Sounds uploaded by `username`.
    #[must_use]
    pub fn user_sounds(&self, username: &str, page: PageRequest) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::USER_SOUNDS).bind("username", username);
        self.paginate(spec, page)
    }

    /// Packs created by `username`.
    #[must_use]
    pub fn user_packs(&self, username: &str, page: PageRequest) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::USER_PACKS).bind("username", username);
        self.paginate(spec, page)
    }

    /// Bookmark categories of `username`.
    #[must_use]
    pub fn user_bookmark_categories(&self, username: &str, page: PageRequest) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::USER_BOOKMARK_CATEGORIES).bind("username", username);
        self.paginate(spec, page)
    }

    /// Sounds in one bookmark category of `username`.
    #[must_use]
    pub fn user_bookmark_category_sounds(
        &self,
        username: &str,
        bookmark_category_id: u64,
        page: PageRequest,
    ) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::USER_BOOKMARK_CATEGORY_SOUNDS)
            .bind("username", username)
            .bind("bookmark_category_id", bookmark_category_id);
        self.paginate(spec, page)
    }

    // Packs

    /// Metadata of one pack.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::dispatch`].
    #[instrument(skip(self))]
    pub async fn pack(&self, pack_id: u64) -> Result<Value, ClientError> {
        self.dispatcher
            .dispatch(&RequestSpec::get(routes::PACK).bind("pack_id", pack_id))
            .await
    }

    /// Sounds in one pack.
    #[must_use]
    pub fn pack_sounds(&self, pack_id: u64, page: PageRequest) -> PaginatedQuery {
        let spec = RequestSpec::get(routes::PACK_SOUNDS).bind("pack_id", pack_id);
        self.paginate(spec, page)
    }

    /// Downloads a pack archive to `destination`.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::download`].
    pub async fn download_pack(
        &self,
        pack_id: u64,
        destination: &Path,
    ) -> Result<PathBuf, ClientError> {
        let spec = RequestSpec::get(routes::PACK_DOWNLOAD).bind("pack_id", pack_id);
        self.dispatcher.download(&spec, destination).await
    }
}
