//! Route table for the Freesound API v2.

use super::EndpointTemplate;

/// Default API base, joined with every route below.
pub const DEFAULT_BASE_URL: &str = "https://freesound.org/apiv2";

pub const TEXT_SEARCH: EndpointTemplate = EndpointTemplate::new("/search/text/");
pub const CONTENT_SEARCH: EndpointTemplate = EndpointTemplate::new("/search/content/");
pub const COMBINED_SEARCH: EndpointTemplate = EndpointTemplate::new("/search/combined/");

pub const SOUND: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/");
pub const SOUND_ANALYSIS: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/analysis/");
pub const SIMILAR_SOUNDS: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/similar/");
pub const COMMENTS: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/comments/");
pub const DOWNLOAD: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/download/");
pub const BOOKMARK: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/bookmark/");
pub const RATE: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/rate/");
pub const COMMENT: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/comment/");
pub const EDIT_DESCRIPTION: EndpointTemplate = EndpointTemplate::new("/sounds/<sound_id>/edit/");

pub const UPLOAD: EndpointTemplate = EndpointTemplate::new("/sounds/upload/");
pub const DESCRIBE: EndpointTemplate = EndpointTemplate::new("/sounds/describe/");
pub const PENDING_UPLOADS: EndpointTemplate = EndpointTemplate::new("/sounds/pending_uploads/");

pub const ME: EndpointTemplate = EndpointTemplate::new("/me/");
pub const USER: EndpointTemplate = EndpointTemplate::new("/users/<username>/");
pub const USER_SOUNDS: EndpointTemplate = EndpointTemplate::new("/users/<username>/sounds/");
pub const USER_PACKS: EndpointTemplate = EndpointTemplate::new("/users/<username>/packs/");
pub const USER_BOOKMARK_CATEGORIES: EndpointTemplate =
    EndpointTemplate::new("/users/<username>/bookmark_categories/");
pub const USER_BOOKMARK_CATEGORY_SOUNDS: EndpointTemplate =
    EndpointTemplate::new("/users/<username>/bookmark_categories/<bookmark_category_id>/sounds/");

pub const PACK: EndpointTemplate = EndpointTemplate::new("/packs/<pack_id>/");
pub const PACK_SOUNDS: EndpointTemplate = EndpointTemplate::new("/packs/<pack_id>/sounds/");
pub const PACK_DOWNLOAD: EndpointTemplate = EndpointTemplate::new("/packs/<pack_id>/download/");

// OAuth2
pub const AUTHORIZE: EndpointTemplate = EndpointTemplate::new("/oauth2/authorize/");
pub const LOGOUT_AND_AUTHORIZE: EndpointTemplate =
    EndpointTemplate::new("/oauth2/logout_and_authorize/");
pub const ACCESS_TOKEN: EndpointTemplate = EndpointTemplate::new("/oauth2/access_token/");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: &[EndpointTemplate] = &[
        TEXT_SEARCH,
        CONTENT_SEARCH,
        COMBINED_SEARCH,
        SOUND,
        SOUND_ANALYSIS,
        SIMILAR_SOUNDS,
        COMMENTS,
        DOWNLOAD,
        BOOKMARK,
        RATE,
        COMMENT,
        EDIT_DESCRIPTION,
        UPLOAD,
        DESCRIBE,
        PENDING_UPLOADS,
        ME,
        USER,
        USER_SOUNDS,
        USER_PACKS,
        USER_BOOKMARK_CATEGORIES,
        USER_BOOKMARK_CATEGORY_SOUNDS,
        PACK,
        PACK_SOUNDS,
        PACK_DOWNLOAD,
        AUTHORIZE,
        LOGOUT_AND_AUTHORIZE,
        ACCESS_TOKEN,
    ];

    #[test]
    fn test_every_route_is_well_formed() {
        for route in ALL {
            assert!(route.placeholders().is_ok(), "malformed route {route}");
            assert!(route.as_str().starts_with('/'), "route must be absolute: {route}");
            assert!(route.as_str().ends_with('/'), "route must end with '/': {route}");
        }
    }

    #[test]
    fn test_routes_use_only_known_placeholders() {
        let known = ["sound_id", "username", "pack_id", "bookmark_category_id"];
        for route in ALL {
            for name in route.placeholders().unwrap() {
                assert!(known.contains(&name), "unknown placeholder <{name}> in {route}");
            }
        }
    }

    #[test]
    fn test_edit_route_is_relative_to_base() {
        assert!(!EDIT_DESCRIPTION.as_str().contains("apiv2"));
    }
}
