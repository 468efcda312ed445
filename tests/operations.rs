//! Integration tests for the resource operations: routes, verbs, and parameters.

mod support;

use std::collections::BTreeMap;

use freesound_core::api::descriptors;
use freesound_core::{ClientError, License, PageRequest, SoundDescription, TextSearch};
use serde_json::json;
use support::authorized_client;
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{body_string, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn ok_json() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"detail": "ok"}))
}

fn empty_page() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"count": 0, "next": null, "results": []}))
}

#[tokio::test]
async fn test_search_sends_query_filter_sort_and_fields() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/apiv2/search/text/"))
        .and(header("authorization", "Bearer A"))
        .and(query_param("query", "dog bark"))
        .and(query_param("filter", "duration:[0 TO 5]"))
        .and(query_param("sort", "rating_desc"))
        .and(query_param("fields", "id,name,previews"))
        .respond_with(empty_page())
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let search = TextSearch::new("dog bark")
        .filter("duration:[0 TO 5]")
        .sort("rating_desc")
        .fields(&["id", "name", "previews"]);
    let items = client.search(&search).collect_results().await.unwrap();
    assert!(items.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_content_and_combined_search_targets() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/apiv2/search/content/"))
        .and(query_param("target", "1234"))
        .respond_with(empty_page())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/apiv2/search/combined/"))
        .and(query_param("query", "piano"))
        .and(query_param("target", "99"))
        .respond_with(empty_page())
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    client
        .content_search(1234, PageRequest::default())
        .collect_results()
        .await
        .unwrap();
    client
        .combined_search("piano", 99, PageRequest::default())
        .collect_results()
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_content_search_by_descriptors_joins_in_name_order() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/apiv2/search/content/"))
        .and(query_param(
            "target",
            "lowlevel.pitch.mean:220 rhythm.bpm:120",
        ))
        .respond_with(empty_page())
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let mut targets = BTreeMap::new();
    targets.insert("rhythm.bpm".to_string(), "120".to_string());
    targets.insert("lowlevel.pitch.mean".to_string(), "220".to_string());
    client
        .content_search_by_descriptors(&targets, PageRequest::default())
        .unwrap()
        .collect_results()
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_content_search_by_descriptors_rejects_empty_targets() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let client = authorized_client(&server);
    let result = client.content_search_by_descriptors(&BTreeMap::new(), PageRequest::default());
    assert!(matches!(result, Err(ClientError::InvalidArgument { .. })));
}

#[tokio::test]
async fn test_analysis_sends_descriptor_names_and_normalized_flag() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/apiv2/sounds/5/analysis/"))
        .and(query_param("descriptors", "lowlevel.spectral_centroid,rhythm.bpm"))
        .and(query_param("normalized", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rhythm": {"bpm": 120}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let selected = [
        descriptors::lookup("lowlevel.spectral_centroid").unwrap(),
        descriptors::lookup("rhythm.bpm").unwrap(),
    ];
    let analysis = client.analysis(5, &selected, true).await.unwrap();
    assert_eq!(analysis["rhythm"]["bpm"], 120);
    server.verify().await;
}

#[tokio::test]
async fn test_analysis_without_descriptors_sends_no_params() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/apiv2/sounds/5/analysis/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    client.analysis(5, &[], false).await.unwrap();
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_rate_sound_clamps_rating() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/3/rate/"))
        .and(body_string("rating=5"))
        .respond_with(ok_json())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/3/rate/"))
        .and(body_string("rating=0"))
        .respond_with(ok_json())
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    client.rate_sound(3, 9).await.unwrap();
    client.rate_sound(3, -2).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_bookmark_and_comment_form_bodies() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/8/bookmark/"))
        .and(body_string("name=Best+kick&category=drums"))
        .respond_with(ok_json())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/8/bookmark/"))
        .and(body_string(""))
        .respond_with(ok_json())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/8/comment/"))
        .and(body_string("comment=love+it%21"))
        .respond_with(ok_json())
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    client
        .bookmark_sound(8, Some("Best kick"), Some("drums"))
        .await
        .unwrap();
    client.bookmark_sound(8, None, None).await.unwrap();
    client.comment_sound(8, "love it!").await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_describe_sound_encodes_tags_once() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/describe/"))
        .and(body_string_contains("upload_filename=kick.wav"))
        .and(body_string_contains("tags=kick-drum+808+dry"))
        .and(body_string_contains("license=Creative+Commons+0"))
        .and(body_string_contains("geotag=41.3851%2C2.1734%2C14"))
        .respond_with(ok_json())
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let description = SoundDescription::new("A dry kick", License::CreativeCommons0)
        .tags(&["kick  drum", "808", " dry "])
        .geotag(41.3851, 2.1734, 14);
    client
        .describe_sound("kick.wav", &description)
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_edit_sound_description_route() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/42/edit/"))
        .and(body_string_contains("description=new+text"))
        .and(body_string_contains("license=Attribution"))
        .respond_with(ok_json())
        .expect(1)
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let description = SoundDescription::new("new text", License::Attribution);
    client.edit_sound_description(42, &description).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_single_resource_getters() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    for (route, body) in [
        ("/apiv2/me/", json!({"username": "me"})),
        ("/apiv2/users/ana%20maria/", json!({"username": "ana maria"})),
        ("/apiv2/packs/12/", json!({"id": 12})),
        ("/apiv2/sounds/pending_uploads/", json!({"pending_description": []})),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = authorized_client(&server);
    assert_eq!(client.me().await.unwrap()["username"], "me");
    assert_eq!(client.user("ana maria").await.unwrap()["username"], "ana maria");
    assert_eq!(client.pack(12).await.unwrap()["id"], 12);
    client.pending_uploads().await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_user_list_routes() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    for route in [
        "/apiv2/users/ana/packs/",
        "/apiv2/users/ana/bookmark_categories/",
        "/apiv2/users/ana/bookmark_categories/6/sounds/",
        "/apiv2/sounds/2/comments/",
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(empty_page())
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = authorized_client(&server);
    let page = PageRequest::default();
    client.user_packs("ana", page).collect_results().await.unwrap();
    client
        .user_bookmark_categories("ana", page)
        .collect_results()
        .await
        .unwrap();
    client
        .user_bookmark_category_sounds("ana", 6, page)
        .collect_results()
        .await
        .unwrap();
    client.comments(2, page).collect_results().await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_preview_url_reads_requested_quality() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/apiv2/sounds/10/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10,
            "previews": {
                "preview-lq-mp3": "https://cdn.freesound.org/previews/0/10_lq.mp3",
                "preview-hq-mp3": "https://cdn.freesound.org/previews/0/10_hq.mp3"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/apiv2/sounds/11/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11})))
        .mount(&server)
        .await;

    let client = authorized_client(&server);
    let high = client
        .preview_url(10, freesound_core::PreviewQuality::High)
        .await
        .unwrap();
    assert_eq!(high.as_str(), "https://cdn.freesound.org/previews/0/10_hq.mp3");

    let missing = client
        .preview_url(11, freesound_core::PreviewQuality::Low)
        .await;
    assert!(matches!(missing, Err(ClientError::InvalidResponse { .. })));
}
