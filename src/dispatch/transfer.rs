//! Binary downloads and multipart uploads.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument};
use url::Url;

use super::client::{RequestDispatcher, check_status, decode_json};
use super::request::RequestSpec;
use crate::error::ClientError;

const PARTIAL_SUFFIX: &str = ".part";

impl RequestDispatcher {
    /// Streams the response of `spec` to `destination`.
    ///
    /// Missing parent directories are created and an existing file is
    /// replaced. Bytes are written to a `.part` sibling that is renamed into
    /// place once complete; if the transfer fails or the future is dropped the
    /// partial file is removed.
    ///
    /// # Errors
    ///
    /// The errors of [`dispatch`](Self::dispatch), plus
    /// [`ClientError::Transfer`] when the destination cannot be written.
    #[instrument(skip(self, spec), fields(route = %spec.route(), dest = %destination.display()))]
    pub async fn download(
        &self,
        spec: &RequestSpec,
        destination: &Path,
    ) -> Result<PathBuf, ClientError> {
        let response = self.send(spec, None).await?;
        write_response(response, destination).await
    }

    /// Streams an absolute `url` (such as a CDN preview link) to `destination`.
    ///
    /// A credential must still be held, but the bearer header is only sent
    /// when `send_credentials` is true.
    ///
    /// # Errors
    ///
    /// Same as [`download`](Self::download).
    #[instrument(skip(self, url), fields(url = %url, dest = %destination.display()))]
    pub async fn download_url(
        &self,
        url: &Url,
        destination: &Path,
        send_credentials: bool,
    ) -> Result<PathBuf, ClientError> {
        let authorization = self.authorization()?;
        let mut request = self.credentials().http().get(url.clone());
        if send_credentials {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e))?;
        let response = check_status(response, url).await?;
        write_response(response, destination).await
    }

    /// Uploads `source` as the multipart field `file_field`, with every
    /// present parameter of `spec` as a text field, and decodes the JSON reply.
    ///
    /// The file is streamed from disk rather than read into memory.
    ///
    /// # Errors
    ///
    /// The errors of [`dispatch`](Self::dispatch), plus
    /// [`ClientError::Transfer`] when `source` cannot be read.
    #[instrument(skip(self, spec), fields(route = %spec.route(), source = %source.display()))]
    pub async fn upload(
        &self,
        spec: &RequestSpec,
        file_field: &'static str,
        source: &Path,
    ) -> Result<Value, ClientError> {
        let authorization = self.authorization()?;
        let url = spec.resolve(self.base_url())?;

        let file = File::open(source)
            .await
            .map_err(|e| ClientError::transfer(source, e))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| ClientError::transfer(source, e))?
            .len();
        let file_name = source
            .file_name()
            .map_or_else(|| file_field.to_string(), |name| name.to_string_lossy().into_owned());
        debug!(bytes = length, file_name = %file_name, "uploading file");

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(file_name);
        let form = spec
            .present_params()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name.to_string(), value.to_string())
            })
            .part(file_field, part);

        let mut request = self
            .credentials()
            .http()
            .post(url.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .multipart(form);
        if let Some(timeout) = spec.timeout_override() {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e))?;
        let response = check_status(response, &url).await?;
        info!(bytes = length, "upload complete");
        decode_json(response).await
    }
}

/// Removes the partial file unless the download was committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            debug!(path = %self.path.display(), "removing partial download");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

async fn write_response(response: Response, destination: &Path) -> Result<PathBuf, ClientError> {
    let partial_path = partial_path(destination)?;
    if let Some(parent) = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ClientError::transfer(parent, e))?;
    }

    let url = response.url().to_string();
    let file = File::create(&partial_path)
        .await
        .map_err(|e| ClientError::transfer(&partial_path, e))?;
    let mut guard = PartialFile {
        path: partial_path.clone(),
        committed: false,
    };

    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ClientError::transport(url.as_str(), e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ClientError::transfer(&partial_path, e))?;
        bytes_written += chunk.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| ClientError::transfer(&partial_path, e))?;
    drop(writer);

    tokio::fs::rename(&partial_path, destination)
        .await
        .map_err(|e| ClientError::transfer(destination, e))?;
    guard.committed = true;

    info!(path = %destination.display(), bytes = bytes_written, "download complete");
    Ok(destination.to_path_buf())
}

fn partial_path(destination: &Path) -> Result<PathBuf, ClientError> {
    let Some(name) = destination.file_name() else {
        return Err(ClientError::transfer(
            destination,
            io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
        ));
    };
    let mut partial = OsString::from(name);
    partial.push(PARTIAL_SUFFIX);
    Ok(destination.with_file_name(partial))
}
