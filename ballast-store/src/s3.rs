//! S3-compatible backend (Cloudflare R2, AWS S3, MinIO).
//!
//! The AWS SDK is async; the sync engine is not. Each backend owns a
//! current-thread tokio runtime and blocks on it per request, so callers
//! must not invoke these methods from inside an async task (use
//! `spawn_blocking`).

use std::fmt;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, SharedCredentialsProvider};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::{Client, Config};
use ballast_core::{ObjectInfo, S3Settings};
use tokio::runtime::{Builder, Runtime};

use crate::backend::{ListPage, ObjectBackend};
use crate::error::StoreError;

pub struct S3Backend {
    client: Client,
    bucket: String,
    endpoint: String,
    // Option so Drop can hand the runtime to `shutdown_background`.
    runtime: Option<Runtime>,
}

impl S3Backend {
    /// Build a client. No network traffic happens until the first request.
    pub fn new(settings: &S3Settings) -> Result<Self, StoreError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Configuration(format!("failed to start S3 runtime: {e}")))?;

        let creds = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "ballast",
        );
        let config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(&settings.endpoint_url)
            .force_path_style(true)
            .credentials_provider(SharedCredentialsProvider::new(creds))
            .build();

        Ok(Self {
            client: Client::from_conf(config),
            bucket: settings.bucket.clone(),
            endpoint: settings.endpoint_url.clone(),
            runtime: Some(runtime),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        match &self.runtime {
            Some(runtime) => runtime.block_on(future),
            None => unreachable!("runtime is only taken on drop"),
        }
    }
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Drop for S3Backend {
    fn drop(&mut self) {
        // Dropping a runtime inside an async context panics; this does not.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl ObjectBackend for S3Backend {
    fn name(&self) -> &str {
        "s3"
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        self.block_on(self.client.head_bucket().bucket(&self.bucket).send())
            .map(|_| ())
            .map_err(|err| {
                StoreError::Configuration(format!(
                    "unable to access bucket '{}' at {}: {}",
                    self.bucket,
                    self.endpoint,
                    DisplayErrorContext(&err)
                ))
            })
    }

    fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix);
        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }
        let output = self
            .block_on(request.send())
            .map_err(|err| StoreError::connectivity("list", prefix, DisplayErrorContext(&err)))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                Some(ObjectInfo {
                    key: object.key()?.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                })
            })
            .collect();
        let next = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ListPage { objects, next })
    }

    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let output = match self.block_on(
            self.client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send(),
        ) {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(StoreError::connectivity("get", key, DisplayErrorContext(&err)));
            }
        };
        let body = self
            .block_on(output.body.collect())
            .map_err(|err| StoreError::connectivity("get", key, err))?;
        Ok(Some(body.into_bytes().to_vec()))
    }

    fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .cache_control("no-cache");
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        self.block_on(request.send())
            .map(|_| ())
            .map_err(|err| StoreError::connectivity("put", key, DisplayErrorContext(&err)))
    }

    fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        let Some(first) = keys.first() else {
            return Ok(());
        };
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| StoreError::connectivity("delete", first.as_str(), err))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|err| StoreError::connectivity("delete", first.as_str(), err))?;

        let output = self
            .block_on(
                self.client
                    .delete_objects()
                    .bucket(&self.bucket)
                    .delete(delete)
                    .send(),
            )
            .map_err(|err| StoreError::connectivity("delete", first.as_str(), DisplayErrorContext(&err)))?;

        let failed = output.errors();
        if let Some(sample) = failed.first() {
            return Err(StoreError::connectivity(
                "delete",
                sample.key().unwrap_or(first.as_str()),
                format!(
                    "{} of {} keys not deleted: {}",
                    failed.len(),
                    keys.len(),
                    sample.message().unwrap_or("unknown error")
                ),
            ));
        }
        Ok(())
    }
}
