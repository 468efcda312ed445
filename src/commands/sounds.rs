//! Resource command handlers. Every API call goes through the retry-once helper.

use std::path::Path;

use anyhow::{Context, Result};
use freesound_core::{
    ClientError, Freesound, Page, PageRequest, PreviewQuality, TextSearch,
    retry_once_on_unauthorized,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::print_json;
use crate::cli::SearchArgs;

pub async fn run_search_command(client: &Freesound, args: SearchArgs) -> Result<()> {
    let mut search = TextSearch::new(args.text);
    if let Some(filter) = args.filter {
        search = search.filter(filter);
    }
    if let Some(sort) = args.sort {
        search = search.sort(sort);
    }
    let search = &search;

    let mut results = Vec::new();
    let mut count = None;
    let mut page_number = 1;
    loop {
        let request = PageRequest {
            page: Some(page_number),
            page_size: args.page_size,
        };
        let page = retry_once_on_unauthorized(client.credentials(), move || {
            fetch_search_page(client, search, request)
        })
        .await
        .with_context(|| format!("Search failed on page {page_number}"))?;

        debug!(page = page_number, items = page.results.len(), "Search page received");
        count = count.or(page.count);
        results.extend(page.results);
        if page.next.is_none() || page_number >= args.max_pages {
            break;
        }
        page_number += 1;
    }

    info!(shown = results.len(), total = ?count, "Search complete");
    print_json(&json!({ "count": count, "results": results }))
}

/// Fetches one page as a fresh query so a retry re-issues the same page.
async fn fetch_search_page(
    client: &Freesound,
    search: &TextSearch,
    request: PageRequest,
) -> Result<Page<Value>, ClientError> {
    let mut query = client.search(&search.clone().page(request));
    query.next_page().await.unwrap_or_else(|| {
        Ok(Page {
            count: None,
            next: None,
            previous: None,
            results: Vec::new(),
        })
    })
}

pub async fn run_sound_command(client: &Freesound, sound_id: u64) -> Result<()> {
    let sound = retry_once_on_unauthorized(client.credentials(), move || client.sound(sound_id))
        .await
        .with_context(|| format!("Failed to fetch sound {sound_id}"))?;
    print_json(&sound)
}

pub async fn run_me_command(client: &Freesound) -> Result<()> {
    let me = retry_once_on_unauthorized(client.credentials(), move || client.me())
        .await
        .context("Failed to fetch the authorized user")?;
    print_json(&me)
}

pub async fn run_download_command(client: &Freesound, sound_id: u64, dest: &Path) -> Result<()> {
    let written = retry_once_on_unauthorized(client.credentials(), move || {
        client.download_sound(sound_id, dest)
    })
    .await
    .with_context(|| format!("Failed to download sound {sound_id} to '{}'", dest.display()))?;
    println!("{}", written.display());
    Ok(())
}

pub async fn run_preview_command(
    client: &Freesound,
    sound_id: u64,
    dest: &Path,
    quality: PreviewQuality,
) -> Result<()> {
    let written = retry_once_on_unauthorized(client.credentials(), move || {
        client.download_preview(sound_id, quality, dest)
    })
    .await
    .with_context(|| format!("Failed to download preview of sound {sound_id}"))?;
    println!("{}", written.display());
    Ok(())
}
