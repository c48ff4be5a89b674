// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async HTTP client for the remote processing backend.
//
// Contract per tool:
//   - Request:  POST {base_url}/{tool}, multipart body with one `file` part
//               per input plus the tool's form fields.
//   - Success:  binary body; name from Content-Disposition, else a default.
//   - Failure:  non-success status, plain-text reason in the body.
// A request that never gets a response is reported as "unknown error".

use std::time::Duration;

use blattwerk_core::error::Result;
use blattwerk_core::{AppConfig, BlattwerkError, file_stem};
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, instrument};

use crate::disposition::filename_from_disposition;
use crate::params::ToolParams;

/// One input file for a backend call.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RemoteFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// The transformed file returned by the backend.
#[derive(Debug, Clone)]
pub struct RemoteOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
}

impl RemoteClient {
    /// Create a client for `base_url`; every request is abandoned after
    /// `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(BlattwerkError::validation(format!(
                "'{base_url}' is not an http(s) URL"
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlattwerkError::RemoteUnavailable(format!("HTTP client setup: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a tool slug.
    pub fn endpoint(&self, tool: &str) -> String {
        format!("{}/{}", self.base_url, tool)
    }

    /// Upload `files` to the tool named by `params` and return its result.
    ///
    /// Parameters are validated before anything is sent. The caller's data
    /// is only read, so a failed call can simply be repeated.
    #[instrument(skip(self, files, params), fields(tool = params.tool(), files = files.len()))]
    pub async fn run(&self, files: &[RemoteFile], params: &ToolParams) -> Result<RemoteOutput> {
        let Some(first) = files.first() else {
            return Err(BlattwerkError::validation("Choose at least one file to upload."));
        };
        params.validate()?;

        let mut form = Form::new();
        for (name, value) in params.form_fields()? {
            form = form.text(name, value);
        }
        for file in files {
            form = form.part("file", Part::bytes(file.bytes.clone()).file_name(file.name.clone()));
        }

        let url = self.endpoint(params.tool());
        info!(%url, "sending remote operation");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "backend unreachable");
                BlattwerkError::RemoteUnavailable(e.to_string())
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = received_body(status, response.bytes().await.map(|bytes| bytes.to_vec()))?;
        debug!(%status, bytes = body.len(), "backend responded");

        let output = interpret_response(
            status,
            &headers,
            body,
            &default_output_name(&first.name, params.tool()),
        )?;
        info!(file_name = %output.file_name, bytes = output.bytes.len(), "remote operation finished");
        Ok(output)
    }
}

/// A body that cannot be read after an error status still reports the
/// rejection, not an unreachable backend.
fn received_body<E: std::fmt::Display>(
    status: StatusCode,
    read: std::result::Result<Vec<u8>, E>,
) -> Result<Vec<u8>> {
    match read {
        Ok(body) => Ok(body),
        Err(e) if !status.is_success() => {
            error!(%status, error = %e, "remote operation rejected, body unreadable");
            Err(BlattwerkError::RemoteOperation(status.to_string()))
        }
        Err(e) => Err(BlattwerkError::RemoteUnavailable(format!("reading response: {e}"))),
    }
}

/// Turn a backend answer into an output file or a `RemoteOperation` error
/// carrying the body text verbatim.
fn interpret_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: Vec<u8>,
    fallback_name: &str,
) -> Result<RemoteOutput> {
    if !status.is_success() {
        let text = String::from_utf8_lossy(&body).trim().to_string();
        error!(%status, "remote operation rejected");
        return Err(BlattwerkError::RemoteOperation(if text.is_empty() {
            status.to_string()
        } else {
            text
        }));
    }
    let file_name = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| fallback_name.to_string());
    Ok(RemoteOutput {
        file_name,
        bytes: body,
    })
}

/// `<stem>_<tool>.<ext>`, keeping the input's extension (or `bin`).
pub fn default_output_name(input_name: &str, tool: &str) -> String {
    let base = input_name.rsplit(['/', '\\']).next().unwrap_or(input_name);
    let extension = match base.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < base.len() => &base[dot + 1..],
        _ => "bin",
    };
    format!("{}_{}.{}", file_stem(input_name), tool, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client =
            RemoteClient::new("https://tools.example.org/api/", Duration::from_secs(5)).expect("client");
        assert_eq!(client.endpoint("compress"), "https://tools.example.org/api/compress");
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        assert!(matches!(
            RemoteClient::new("ftp://example.org", Duration::from_secs(5)),
            Err(BlattwerkError::Validation(_))
        ));
    }

    #[test]
    fn error_status_carries_body_verbatim() {
        let result = interpret_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &HeaderMap::new(),
            b"File is not a PDF\n".to_vec(),
            "x_compress.pdf",
        );
        match result {
            Err(BlattwerkError::RemoteOperation(message)) => {
                assert_eq!(message, "File is not a PDF")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_error_body_reports_status() {
        let result = interpret_response(
            StatusCode::BAD_GATEWAY,
            &HeaderMap::new(),
            Vec::new(),
            "x.pdf",
        );
        assert!(matches!(result, Err(BlattwerkError::RemoteOperation(m)) if m.contains("502")));
    }

    #[test]
    fn unreadable_body_keeps_error_status() {
        let rejected = received_body::<&str>(StatusCode::SERVICE_UNAVAILABLE, Err("connection reset"));
        assert!(matches!(rejected, Err(BlattwerkError::RemoteOperation(m)) if m.contains("503")));

        let truncated = received_body::<&str>(StatusCode::OK, Err("connection reset"));
        assert!(matches!(truncated, Err(BlattwerkError::RemoteUnavailable(m)) if m.contains("connection reset")));

        let body = received_body::<&str>(StatusCode::OK, Ok(vec![7])).expect("body");
        assert_eq!(body, vec![7]);
    }

    #[test]
    fn success_uses_disposition_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"small.pdf\""),
        );
        let output = interpret_response(StatusCode::OK, &headers, vec![1, 2, 3], "in_compress.pdf")
            .expect("output");
        assert_eq!(output.file_name, "small.pdf");
        assert_eq!(output.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn success_without_disposition_uses_fallback() {
        let output = interpret_response(StatusCode::OK, &HeaderMap::new(), vec![0], "in_ocr.pdf")
            .expect("output");
        assert_eq!(output.file_name, "in_ocr.pdf");
    }

    #[test]
    fn default_names_keep_extension() {
        assert_eq!(default_output_name("scans/contract.pdf", "ocr"), "contract_ocr.pdf");
        assert_eq!(default_output_name("clip.mp4", "trim"), "clip_trim.mp4");
        assert_eq!(default_output_name("README", "compress"), "README_compress.bin");
    }

    #[tokio::test]
    async fn empty_file_list_fails_before_any_request() {
        let client = RemoteClient::new("http://127.0.0.1:9", Duration::from_secs(1)).expect("client");
        let result = client.run(&[], &ToolParams::Compress { quality: 50 }).await;
        assert!(matches!(result, Err(BlattwerkError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_params_fail_before_any_request() {
        let client = RemoteClient::new("http://127.0.0.1:9", Duration::from_secs(1)).expect("client");
        let files = [RemoteFile::new("a.pdf", b"%PDF-1.7".to_vec())];
        let result = client.run(&files, &ToolParams::Compress { quality: 0 }).await;
        assert!(matches!(result, Err(BlattwerkError::Validation(_))));
    }

    #[tokio::test]
    async fn closed_port_is_unavailable() {
        // Bind then drop to find a port nobody is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let client =
            RemoteClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(5)).expect("client");
        let files = [RemoteFile::new("a.pdf", b"%PDF-1.7".to_vec())];
        let result = client.run(&files, &ToolParams::Compress { quality: 50 }).await;
        assert!(matches!(result, Err(BlattwerkError::RemoteUnavailable(_))));
    }
}
