use std::time::Instant;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use crate::config::MIN_PART_SIZE;
use crate::{
    BlobError, BlobResult, BlobStore, ByteRange, ByteStream, Conditions, GetOptions, GetOutcome,
    GetResult, ObjectHead, PutResult, ResolvedRange, UploadRules,
};

/// Connection settings for an S3-compatible bucket (Cloudflare R2, MinIO, AWS)
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Config {
    pub fn new(
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: "auto".to_string(),
            endpoint_url: None,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }
}

/// Store backed by an S3-compatible bucket.
///
/// Uploads stream through in parts of `UploadRules::part_size`, so memory use
/// per upload is bounded by one part regardless of object size.
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
    upload_rules: UploadRules,
}

impl S3CompatibleStore {
    pub async fn new(config: S3Config, upload_rules: UploadRules) -> Self {
        let client = Self::create_client(&config).await;
        Self::from_client(client, config.bucket, upload_rules)
    }

    pub fn from_client(client: Client, bucket: impl Into<String>, upload_rules: UploadRules) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            upload_rules,
        }
    }

    async fn create_client(config: &S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "reel-blob",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let aws_config = loader.load().await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        )
    }

    async fn put_single(&self, key: &str, content_type: &str, body: Bytes) -> BlobResult<PutResult> {
        let size_bytes = body.len() as u64;
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size_bytes as i64)
            .body(AwsByteStream::from(body))
            .send()
            .await
            .map_err(BlobError::backend)?;

        Ok(PutResult {
            etag: result.e_tag.as_deref().map(unquote),
            size_bytes,
        })
    }

    async fn put_multipart(
        &self,
        key: &str,
        content_type: &str,
        buffer: BytesMut,
        stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(BlobError::backend)?;
        let upload_id = created.upload_id.ok_or_else(|| {
            BlobError::backend(std::io::Error::other("store returned no multipart upload id"))
        })?;

        match self.upload_and_complete(key, &upload_id, buffer, stream).await {
            Ok(result) => Ok(result),
            Err(err) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        error = %abort_err,
                        key = %key,
                        upload_id = %upload_id,
                        "Failed to abort multipart upload"
                    );
                }
                Err(err)
            }
        }
    }

    async fn upload_and_complete(
        &self,
        key: &str,
        upload_id: &str,
        mut buffer: BytesMut,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let part_size = self.upload_rules.part_size.max(MIN_PART_SIZE) as usize;
        let mut size_bytes = buffer.len() as u64;
        let mut parts = Vec::new();
        let mut exhausted = false;

        loop {
            while buffer.len() >= part_size {
                let part = buffer.split_to(part_size).freeze();
                parts.push(self.upload_part(key, upload_id, parts.len(), part).await?);
            }
            if exhausted {
                break;
            }
            match stream.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    size_bytes += chunk.len() as u64;
                    buffer.extend_from_slice(&chunk);
                }
                None => exhausted = true,
            }
        }
        if !buffer.is_empty() || parts.is_empty() {
            parts.push(self.upload_part(key, upload_id, parts.len(), buffer.freeze()).await?);
        }

        let completed = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(BlobError::backend)?;

        Ok(PutResult {
            etag: completed.e_tag.as_deref().map(unquote),
            size_bytes,
        })
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        uploaded: usize,
        body: Bytes,
    ) -> BlobResult<CompletedPart> {
        if uploaded >= self.upload_rules.max_parts as usize {
            return Err(BlobError::TooLarge {
                max_bytes: self
                    .upload_rules
                    .part_size
                    .saturating_mul(u64::from(self.upload_rules.max_parts)),
            });
        }
        let part_number = uploaded as i32 + 1;
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(body.len() as i64)
            .body(AwsByteStream::from(body))
            .send()
            .await
            .map_err(BlobError::backend)?;

        Ok(CompletedPart::builder()
            .set_e_tag(output.e_tag)
            .part_number(part_number)
            .build())
    }

    async fn fetch(
        &self,
        key: &str,
        range: Option<&ByteRange>,
        conditions: &Conditions,
    ) -> Result<GetObjectOutput, SdkError<GetObjectError, HttpResponse>> {
        self.client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range.map(ByteRange::to_header_value))
            .set_if_match(conditions.if_match.clone())
            .set_if_none_match(conditions.if_none_match.clone())
            .send()
            .await
    }

    fn into_get_result(output: GetObjectOutput, range_requested: bool) -> GetResult {
        let resolved_range = if range_requested {
            output
                .content_range
                .as_deref()
                .and_then(ResolvedRange::parse_content_range)
        } else {
            None
        };
        let content_length = output.content_length.unwrap_or(0).max(0) as u64;

        let head = ObjectHead {
            size_bytes: resolved_range.map_or(content_length, |range| range.total_size),
            content_type: output.content_type,
            etag: output.e_tag.as_deref().map(unquote),
            last_modified: output.last_modified.as_ref().and_then(to_chrono),
        };
        let stream = ReaderStream::new(output.body.into_async_read());

        GetResult {
            stream: Box::pin(stream),
            head,
            resolved_range,
        }
    }
}

fn response_status<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|response| response.status().as_u16())
}

fn response_etag<E>(err: &SdkError<E, HttpResponse>) -> Option<String> {
    err.raw_response()
        .and_then(|response| response.headers().get("etag"))
        .map(unquote)
}

fn unquote(etag: &str) -> String {
    etag.trim_start_matches("W/").trim_matches('"').to_string()
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let start = Instant::now();
        let part_size = self.upload_rules.part_size.max(MIN_PART_SIZE) as usize;

        // A body of at most one part goes up in a single request.
        let mut buffer = BytesMut::new();
        let mut single_part = false;
        while buffer.len() <= part_size {
            match stream.next().await {
                Some(chunk) => buffer.extend_from_slice(&chunk?),
                None => {
                    single_part = true;
                    break;
                }
            }
        }

        let result = if single_part {
            self.put_single(key, content_type, buffer.freeze()).await
        } else {
            self.put_multipart(key, content_type, buffer, stream).await
        };

        match &result {
            Ok(put) => tracing::info!(
                bucket = %self.bucket,
                key = %key,
                size_bytes = put.size_bytes,
                multipart = !single_part,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload successful"
            ),
            Err(e) => tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            ),
        }
        result
    }

    async fn get(&self, key: &str, options: GetOptions) -> BlobResult<GetOutcome> {
        let mut response = self
            .fetch(key, options.range.as_ref(), &options.conditions)
            .await;

        // An unsatisfiable range is served as the whole object.
        let mut range_requested = options.range.is_some();
        let unsatisfiable = matches!(&response, Err(err) if response_status(err) == Some(416));
        if range_requested && unsatisfiable {
            range_requested = false;
            response = self.fetch(key, None, &options.conditions).await;
        }

        match response {
            Ok(output) => Ok(GetOutcome::Found(Self::into_get_result(
                output,
                range_requested,
            ))),
            Err(err) => {
                let no_such_key = err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key);
                match response_status(&err) {
                    Some(304) => Ok(GetOutcome::NotModified {
                        etag: response_etag(&err),
                    }),
                    Some(412) => Ok(GetOutcome::PreconditionFailed {
                        etag: response_etag(&err),
                    }),
                    Some(404) => Err(BlobError::not_found(key)),
                    _ if no_such_key => Err(BlobError::not_found(key)),
                    _ => {
                        tracing::error!(
                            error = %err,
                            bucket = %self.bucket,
                            key = %key,
                            "S3 download failed"
                        );
                        Err(BlobError::backend(err))
                    }
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let start = Instant::now();
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                BlobError::backend(e)
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );
        Ok(())
    }
}
