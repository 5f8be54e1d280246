use axum::{
    body::Body,
    extract::Request,
    http::{header, response::Builder, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use reel_blob::{ByteStream, Conditions, GetOptions, GetOutcome, ObjectHead, ResolvedRange};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{GatewayConfig, GatewayError, GatewayResult, GatewayState, RangeRequest};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Upload-target requests are tiny JSON documents
const MAX_TARGET_REQUEST_BYTES: usize = 64 * 1024;

/// Body of `POST /`. `filename` is read when `fileName` is missing or empty.
#[derive(Debug, Deserialize)]
pub struct UploadTargetRequest {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    pub filename: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

impl UploadTargetRequest {
    /// Returns the object key, which is the file name verbatim
    pub fn validate(self) -> GatewayResult<String> {
        let file_name = self
            .file_name
            .filter(|name| !name.is_empty())
            .or(self.filename);
        match (file_name, self.content_type) {
            (Some(file_name), Some(content_type))
                if !file_name.is_empty() && !content_type.is_empty() =>
            {
                Ok(file_name)
            }
            _ => Err(GatewayError::bad_request("Missing fileName or contentType")),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    pub key: String,
}

pub async fn issue_upload_target(
    state: &GatewayState,
    request: Request,
) -> GatewayResult<Response> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_TARGET_REQUEST_BYTES)
        .await
        .map_err(|e| GatewayError::bad_request(format!("Unreadable request body: {e}")))?;
    let target: UploadTargetRequest = serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::bad_request(format!("Invalid JSON body: {e}")))?;
    let key = target.validate()?;

    let origin = request_origin(&state.config, &parts.headers, &parts.uri);
    let upload_url = format!("{origin}/upload/{}", encode_key(&key));

    tracing::info!(key = %key, upload_url = %upload_url, "Issued upload target");
    Ok(Json(UploadTarget { upload_url, key }).into_response())
}

pub async fn store_object(
    state: &GatewayState,
    key: String,
    request: Request,
) -> GatewayResult<Response> {
    if key.is_empty() {
        return Err(GatewayError::bad_request("Missing object key"));
    }

    let headers = request.headers();
    let content_type = header_str(headers, header::CONTENT_TYPE)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let size_hint = header_str(headers, header::CONTENT_LENGTH).and_then(|v| v.parse().ok());

    let body: ByteStream = Box::pin(
        request
            .into_body()
            .into_data_stream()
            .map_err(std::io::Error::other),
    );
    let stored = state
        .blobs
        .put(&key, &content_type, size_hint, body)
        .await?;

    tracing::info!(
        key = %key,
        size_bytes = stored.size_bytes,
        content_type = %content_type,
        "Object stored"
    );
    Ok(Json(json!({ "success": true, "key": key })).into_response())
}

pub async fn retrieve_object(
    state: &GatewayState,
    key: String,
    headers: &HeaderMap,
) -> GatewayResult<Response> {
    if key.is_empty() {
        return Err(GatewayError::not_found("Object not found"));
    }

    let mut options = GetOptions::new().with_conditions(conditions_from(headers));
    if let Some(range) = RangeRequest::from_headers(headers).byte_range() {
        options = options.with_range(range);
    }

    match state.blobs.open(&key, options).await? {
        GetOutcome::Found(result) => {
            let builder = object_headers(
                &result.head,
                result.content_length(),
                result.resolved_range.as_ref(),
            );
            builder
                .body(Body::from_stream(result.stream))
                .map_err(|e| GatewayError::general_error(e.to_string()))
        }
        GetOutcome::NotModified { etag } => {
            let mut builder = Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL);
            if let Some(etag) = etag {
                builder = builder.header(header::ETAG, quote_etag(&etag));
            }
            builder
                .body(Body::empty())
                .map_err(|e| GatewayError::general_error(e.to_string()))
        }
        GetOutcome::PreconditionFailed { .. } => Err(GatewayError::precondition_failed(
            format!("Precondition failed for {key}"),
        )),
    }
}

pub async fn delete_object(state: &GatewayState, key: String) -> GatewayResult<Response> {
    if key.is_empty() {
        return Err(GatewayError::bad_request("Missing object key"));
    }

    state.blobs.delete(&key).await?;

    tracing::info!(key = %key, "Object deleted");
    Ok(Json(json!({ "success": true, "deleted": key })).into_response())
}

fn object_headers(head: &ObjectHead, content_length: u64, range: Option<&ResolvedRange>) -> Builder {
    let status = if range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut builder = Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            head.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
        )
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL)
        .header(header::CONTENT_LENGTH, content_length);

    if let Some(range) = range {
        builder = builder.header(header::CONTENT_RANGE, range.content_range());
    }
    if let Some(etag) = &head.etag {
        builder = builder.header(header::ETAG, quote_etag(etag));
    }
    if let Some(modified) = head.last_modified {
        builder = builder.header(
            header::LAST_MODIFIED,
            modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        );
    }
    builder
}

fn conditions_from(headers: &HeaderMap) -> Conditions {
    Conditions {
        if_match: header_str(headers, header::IF_MATCH).map(str::to_string),
        if_none_match: header_str(headers, header::IF_NONE_MATCH).map(str::to_string),
    }
}

fn header_str<K: header::AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn quote_etag(etag: &str) -> String {
    format!("\"{etag}\"")
}

/// Each `/`-separated segment is percent-encoded so the URL maps back to `key`
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Origin for upload URLs: configured public URL, then the request's own
/// scheme and host, then the listen address.
fn request_origin(config: &GatewayConfig, headers: &HeaderMap, uri: &Uri) -> String {
    if let Some(public_url) = &config.public_url {
        return public_url.trim_end_matches('/').to_string();
    }
    if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
        return format!("{scheme}://{authority}");
    }
    if let Some(host) = header_str(headers, header::HOST).filter(|h| !h.is_empty()) {
        let scheme = header_str(headers, "x-forwarded-proto")
            .and_then(|proto| proto.split(',').next())
            .map(str::trim)
            .filter(|proto| !proto.is_empty())
            .unwrap_or("http");
        return format!("{scheme}://{host}");
    }
    format!("http://{}", config.listen_addr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_target_requires_both_fields() {
        let ok: UploadTargetRequest =
            serde_json::from_str(r#"{"fileName":"a.mp4","contentType":"video/mp4"}"#).unwrap();
        assert_eq!(ok.validate().unwrap(), "a.mp4");

        let alias: UploadTargetRequest =
            serde_json::from_str(r#"{"filename":"b.mp4","contentType":"video/mp4"}"#).unwrap();
        assert_eq!(alias.validate().unwrap(), "b.mp4");

        for body in [
            r#"{"fileName":"a.mp4"}"#,
            r#"{"contentType":"video/mp4"}"#,
            r#"{"fileName":"","contentType":"video/mp4"}"#,
            r#"{}"#,
        ] {
            let request: UploadTargetRequest = serde_json::from_str(body).unwrap();
            assert_eq!(request.validate().unwrap_err().code(), 400, "{body}");
        }
    }

    #[test]
    fn both_file_name_spellings_are_accepted_together() {
        let both: UploadTargetRequest = serde_json::from_str(
            r#"{"fileName":"a.mp4","filename":"b.mp4","contentType":"video/mp4"}"#,
        )
        .unwrap();
        assert_eq!(both.validate().unwrap(), "a.mp4");

        let empty_primary: UploadTargetRequest = serde_json::from_str(
            r#"{"fileName":"","filename":"b.mp4","contentType":"video/mp4"}"#,
        )
        .unwrap();
        assert_eq!(empty_primary.validate().unwrap(), "b.mp4");

        let both_empty: UploadTargetRequest =
            serde_json::from_str(r#"{"fileName":"","filename":"","contentType":"video/mp4"}"#)
                .unwrap();
        assert_eq!(both_empty.validate().unwrap_err().code(), 400);
    }

    #[test]
    fn keys_encode_per_segment() {
        assert_eq!(encode_key("a.mp4"), "a.mp4");
        assert_eq!(encode_key("user 1/clip #2.mp4"), "user%201/clip%20%232.mp4");
    }

    #[test]
    fn origin_prefers_public_url() {
        let config = GatewayConfig::new().with_public_url("https://videos.example.com/");
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "internal:8787".parse().unwrap());
        let uri: Uri = "/".parse().unwrap();

        assert_eq!(
            request_origin(&config, &headers, &uri),
            "https://videos.example.com"
        );
    }

    #[test]
    fn origin_falls_back_to_host_and_forwarded_proto() {
        let config = GatewayConfig::new();
        let uri: Uri = "/".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&config, &headers, &uri), "http://127.0.0.1:8787");

        headers.insert(header::HOST, "gateway.test".parse().unwrap());
        assert_eq!(request_origin(&config, &headers, &uri), "http://gateway.test");

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(request_origin(&config, &headers, &uri), "https://gateway.test");
    }
}
