//! Image store backed by a directory of files, one per token.

use std::path::PathBuf;

use sidemark_core::error::{Result, SidemarkError};
use sidemark_core::image::{BoxFuture, ImageStore, content_token};

/// Stores each payload as `<dir>/<token>`. The token is a content hash, so
/// saving the same image twice writes one file.
pub struct FileImageStore {
    dir: PathBuf,
}

impl FileImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, token: &str) -> PathBuf {
        self.dir.join(token)
    }
}

impl ImageStore for FileImageStore {
    fn store_image<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let token = content_token(payload);
            let path = self.path_for(&token);
            if path.exists() {
                log::debug!("Image {} already stored", token);
                return Ok(token);
            }
            std::fs::create_dir_all(&self.dir).map_err(|source| SidemarkError::FileWrite {
                path: self.dir.clone(),
                source,
            })?;
            std::fs::write(&path, payload)
                .map_err(|source| SidemarkError::FileWrite { path, source })?;
            Ok(token)
        })
    }

    fn load_image<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let path = self.path_for(token);
            match std::fs::read_to_string(&path) {
                Ok(payload) => Ok(payload),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(SidemarkError::ImageNotFound(token.to_string()))
                }
                Err(source) => Err(SidemarkError::FileRead { path, source }),
            }
        })
    }
}
