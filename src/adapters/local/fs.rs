use crate::ports::storage::ObjectStorePort;
use async_trait::async_trait;
use std::error::Error;
use std::path::{Component, Path, PathBuf};

/// Object store backed by a local directory: `bucket`/`key` is written to
/// `<root>/<bucket>/<key>`.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of an object on disk. Keys escaping the bucket are rejected.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
        let relative = Path::new(bucket).join(key);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(format!("Invalid object path: {}/{}", bucket, key).into());
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorePort for FsObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;
        Ok(())
    }
}
