use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ImageHostConfig;

#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub url: String,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload_image(
        &self,
        body: Bytes,
        content_type: &str,
        folder: &str,
    ) -> anyhow::Result<UploadedImage>;

    /// Removes an object previously returned by [`ImageHost::upload_image`].
    async fn delete_image(&self, url: &str) -> anyhow::Result<()>;
}

/// Image host backed by an S3-compatible bucket served from `public_url`.
#[derive(Clone)]
pub struct S3ImageHost {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3ImageHost {
    pub async fn new(cfg: &ImageHostConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ImageHost for S3ImageHost {
    async fn upload_image(
        &self,
        body: Bytes,
        content_type: &str,
        folder: &str,
    ) -> anyhow::Result<UploadedImage> {
        let key = object_key(folder, content_type);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {key}"))?;
        debug!(%key, "image uploaded");
        Ok(UploadedImage {
            url: format!("{}/{}", self.public_url, key),
        })
    }

    async fn delete_image(&self, url: &str) -> anyhow::Result<()> {
        let key = key_from_url(&self.public_url, url)
            .with_context(|| format!("{url} is not served from this bucket"))?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("s3 delete_object {key}"))?;
        debug!(%key, "image deleted");
        Ok(())
    }
}

fn key_from_url<'a>(public_url: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(public_url)?
        .strip_prefix('/')
        .filter(|k| !k.is_empty())
}

pub fn object_key(folder: &str, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("{}.{}", Uuid::new_v4(), ext)
    } else {
        format!("{}/{}.{}", folder, Uuid::new_v4(), ext)
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}
