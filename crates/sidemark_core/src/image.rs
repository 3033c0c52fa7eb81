//! Image reference indirection.
//!
//! Inline image payloads (`data:` URIs) are never written into the plain-text
//! body. The serializer hands each distinct payload to an [`ImageStore`] and
//! writes the returned token as `@img:<token>`; the deserializer asks the same
//! store to turn the token back into a payload. The converter itself never
//! touches storage.
//!
//! ## Object safety
//!
//! `ImageStore` returns boxed futures so it can be used as `dyn ImageStore`,
//! the same way the filesystem abstractions of the host application are.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::error::{Result, SidemarkError};

/// Prefix of an image reference in the plain text.
pub const IMAGE_REF_PREFIX: &str = "@img:";

/// Number of hex characters of the content hash used as a token.
pub const TOKEN_LEN: usize = 16;

/// A boxed future for object-safe async methods.
///
/// On native targets, futures are `Send` for compatibility with multi-threaded runtimes.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed future for object-safe async methods.
///
/// WASM version without `Send` requirement - JavaScript is single-threaded.
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Storage collaborator for image payloads.
///
/// Implementations must be idempotent for identical payloads (typically by
/// deriving the token from a content hash, see [`content_token`]).
#[cfg(not(target_arch = "wasm32"))]
pub trait ImageStore: Send + Sync {
    /// Persist an inline payload and return its reference token.
    fn store_image<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Resolve a reference token back into its inline payload.
    /// Fails if the token is unknown.
    fn load_image<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Storage collaborator for image payloads (WASM version, no `Send + Sync`).
#[cfg(target_arch = "wasm32")]
pub trait ImageStore {
    /// Persist an inline payload and return its reference token.
    fn store_image<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Resolve a reference token back into its inline payload.
    fn load_image<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Format an image reference for the plain text.
pub fn image_ref(token: &str) -> String {
    format!("{}{}", IMAGE_REF_PREFIX, token)
}

/// Extract the token of an `@img:<token>` reference.
///
/// # Examples
///
/// ```
/// use sidemark_core::image::parse_image_ref;
///
/// assert_eq!(parse_image_ref("@img:0123456789abcdef"), Some("0123456789abcdef"));
/// assert_eq!(parse_image_ref("@img:"), None);
/// assert_eq!(parse_image_ref("photo.png"), None);
/// ```
pub fn parse_image_ref(src: &str) -> Option<&str> {
    src.strip_prefix(IMAGE_REF_PREFIX)
        .filter(|token| !token.is_empty())
        .filter(|token| {
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Whether an image source is an inline payload that must go through the store.
pub fn is_inline_payload(src: &str) -> bool {
    src.starts_with("data:")
}

/// Content-addressed token for a payload: the first [`TOKEN_LEN`] hex chars of its SHA-256.
pub fn content_token(payload: &str) -> String {
    let mut hex = format!("{:x}", Sha256::digest(payload.as_bytes()));
    hex.truncate(TOKEN_LEN);
    hex
}

#[derive(Default)]
struct MemoryState {
    images: HashMap<String, String>,
    store_calls: usize,
    load_calls: usize,
}

/// In-memory, content-addressed image store.
///
/// Clones share the same storage, so a store handed to the serializer can be
/// inspected (or reused by the deserializer) afterwards.
#[derive(Clone, Default)]
pub struct MemoryImageStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryImageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a token (builder pattern).
    pub fn with_image(self, token: &str, payload: &str) -> Self {
        self.lock()
            .images
            .insert(token.to_string(), payload.to_string());
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Payload stored under `token`.
    pub fn get(&self, token: &str) -> Option<String> {
        self.lock().images.get(token).cloned()
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.lock().images.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `store_image` has been called.
    pub fn store_calls(&self) -> usize {
        self.lock().store_calls
    }

    /// How many times `load_image` has been called.
    pub fn load_calls(&self) -> usize {
        self.lock().load_calls
    }
}

impl ImageStore for MemoryImageStore {
    fn store_image<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let token = content_token(payload);
            let mut state = self.lock();
            state.store_calls += 1;
            state.images.insert(token.clone(), payload.to_string());
            Ok(token)
        })
    }

    fn load_image<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.load_calls += 1;
            state
                .images
                .get(token)
                .cloned()
                .ok_or_else(|| SidemarkError::ImageNotFound(token.to_string()))
        })
    }
}
