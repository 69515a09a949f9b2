//! S3-compatible object store gateway backed by the `object_store` crate.
//!
//! The production target is Cloudflare R2, which speaks the S3 API against a
//! custom endpoint; anything `AmazonS3Builder` accepts works.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};
use tracing::debug;

use crate::config::StoreConfig;
use crate::contract::ObjectStoreGateway;
use crate::errors::MirrorError;

pub struct S3Gateway {
    inner: AmazonS3,
}

impl S3Gateway {
    /// Builds a gateway for the configured bucket and endpoint.
    pub fn new(config: &StoreConfig) -> Result<Self, MirrorError> {
        let inner = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint_url)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_bucket_name(&config.bucket)
            // R2 ignores the region but the builder requires one.
            .with_region("auto")
            .build()
            .map_err(|e| MirrorError::Configuration(format!("object store setup failed: {e}")))?;
        Ok(S3Gateway { inner })
    }
}

#[async_trait]
impl ObjectStoreGateway for S3Gateway {
    async fn exists(&self, key: &str) -> Result<bool, MirrorError> {
        let path = ObjectPath::from(key);
        match self.inner.head(&path).await {
            Ok(_) => Ok(true),
            // Confirmed absent is a result, not an error; anything else
            // (permissions, transport) must propagate rather than masquerade
            // as "missing".
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(MirrorError::storage(key, e)),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, MirrorError> {
        let path = ObjectPath::from(key);
        match self.inner.get(&path).await {
            Ok(result) => {
                let body = result
                    .bytes()
                    .await
                    .map_err(|e| MirrorError::storage(key, e))?;
                Ok(Some(body))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(MirrorError::storage(key, e)),
        }
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), MirrorError> {
        let path = ObjectPath::from(key);
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };
        debug!(key = %key, bytes = body.len(), "Uploading object");
        self.inner
            .put_opts(&path, body.into(), opts)
            .await
            .map_err(|e| MirrorError::storage(key, e))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, MirrorError> {
        let path = ObjectPath::from(prefix);
        let mut stream = self.inner.list(Some(&path));
        let mut keys = Vec::new();
        loop {
            match stream.try_next().await {
                Ok(Some(meta)) => keys.push(meta.location.to_string()),
                Ok(None) => break,
                Err(e) => return Err(MirrorError::storage(prefix, e)),
            }
        }
        Ok(keys)
    }
}
