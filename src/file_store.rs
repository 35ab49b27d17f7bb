//! On-disk image tree
//!
//! Layout: `{root}/{productId}/{imageId}.jpg`. The path of an asset is a pure
//! function of its (product, image) pair, and presence on disk is the dedup key:
//! an asset that exists is never fetched or written again. Writes are staged in
//! a hidden `.part` file and published by hard link, so an existing
//! `{imageId}.jpg` is always complete.

use crate::error::{FileSystemError, Result};
use crate::types::{ImageId, ProductId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

/// File extension of every stored asset
pub const ASSET_EXTENSION: &str = "jpg";

/// Extension of the hidden staging file a write goes through
pub const PART_EXTENSION: &str = "part";

/// Outcome of [`FileStore::ensure_product_directory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    /// The directory was created by this call
    Created,
    /// The directory was already there
    AlreadyExisted,
}

/// Outcome of [`FileStore::write_asset_if_absent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetWrite {
    /// The asset was written
    Written {
        /// Number of bytes written
        bytes: u64,
    },
    /// The asset was already on disk; nothing was written
    AlreadyPresent,
    /// Another writer created the file between our presence check and our open
    LostRace,
}

/// Manages the per-product image directories
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the image tree rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| FileSystemError::CreateDirectory {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    /// Root directory of the tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the assets of one product
    pub fn product_dir(&self, product_id: &ProductId) -> Result<PathBuf> {
        validate_component(product_id.as_str())?;
        Ok(self.root.join(product_id.as_str()))
    }

    /// Destination path of one asset
    pub fn asset_path(&self, product_id: &ProductId, image_id: &ImageId) -> Result<PathBuf> {
        validate_component(image_id.as_str())?;
        Ok(self
            .product_dir(product_id)?
            .join(format!("{}.{}", image_id, ASSET_EXTENSION)))
    }

    /// Create the product directory if absent
    ///
    /// An existing directory is success. Any other failure (permissions, disk
    /// full, a regular file in the way) is returned so the caller can skip this
    /// product's assets.
    pub async fn ensure_product_directory(&self, product_id: &ProductId) -> Result<DirectoryStatus> {
        let dir = self.product_dir(product_id)?;

        match tokio::fs::create_dir(&dir).await {
            Ok(()) => Ok(DirectoryStatus::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let is_dir = tokio::fs::metadata(&dir)
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if is_dir {
                    tracing::debug!(product_id = %product_id, "product directory already exists");
                    Ok(DirectoryStatus::AlreadyExisted)
                } else {
                    Err(FileSystemError::CreateDirectory {
                        path: dir,
                        source: std::io::Error::new(
                            ErrorKind::AlreadyExists,
                            "path exists but is not a directory",
                        ),
                    }
                    .into())
                }
            }
            Err(source) => Err(FileSystemError::CreateDirectory { path: dir, source }.into()),
        }
    }

    /// Whether an asset is already on disk
    pub async fn contains(&self, product_id: &ProductId, image_id: &ImageId) -> Result<bool> {
        let path = self.asset_path(product_id, image_id)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| FileSystemError::WriteAsset { path, source }.into())
    }

    /// Write an asset unless it already exists
    ///
    /// Bytes are staged in a hidden part file next to the destination, synced,
    /// then published with a hard link. Linking never replaces an existing file,
    /// so a concurrent writer that got there first wins and this copy is dropped.
    /// An interrupted write leaves at most a stray part file; the destination
    /// name only ever appears with its full contents.
    pub async fn write_asset_if_absent(
        &self,
        product_id: &ProductId,
        image_id: &ImageId,
        bytes: &[u8],
    ) -> Result<AssetWrite> {
        let path = self.asset_path(product_id, image_id)?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(AssetWrite::AlreadyPresent);
        }

        let part = part_path(&path, image_id);
        if let Err(source) = write_part(&part, bytes).await {
            remove_part(&part).await;
            return Err(FileSystemError::WriteAsset { path, source }.into());
        }

        let published = tokio::fs::hard_link(&part, &path).await;
        remove_part(&part).await;

        match published {
            Ok(()) => Ok(AssetWrite::Written {
                bytes: bytes.len() as u64,
            }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(
                    path = %path.display(),
                    "path conflict: asset was created concurrently, dropping this copy"
                );
                Ok(AssetWrite::LostRace)
            }
            Err(source) => Err(FileSystemError::WriteAsset { path, source }.into()),
        }
    }
}

static NEXT_PART: AtomicU64 = AtomicU64::new(0);

/// Staging path unique to this process and call: `.{imageId}.{pid}-{n}.part`
fn part_path(asset: &Path, image_id: &ImageId) -> PathBuf {
    let n = NEXT_PART.fetch_add(1, Ordering::Relaxed);
    asset.with_file_name(format!(
        ".{}.{}-{}.{}",
        image_id,
        std::process::id(),
        n,
        PART_EXTENSION
    ))
}

async fn write_part(part: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(part)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

async fn remove_part(part: &Path) {
    match tokio::fs::remove_file(part).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %part.display(), error = %e, "failed to remove part file");
        }
    }
}

/// Reject identifiers that would escape or alias their directory
fn validate_component(id: &str) -> std::result::Result<(), FileSystemError> {
    let reason = if id.is_empty() {
        Some("empty identifier")
    } else if id == "." || id == ".." {
        Some("relative directory reference")
    } else if id.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if id.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(FileSystemError::InvalidIdentifier {
            id: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
