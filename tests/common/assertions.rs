//! Custom assertions over the on-disk image tree

use image::ImageFormat;
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

/// Relative paths (`product/image.jpg`) of every file below `root`
pub fn stored_assets(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect()
}

/// Total size in bytes of every file below `root`
pub fn tree_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Panics unless the file at `path` decodes as a JPEG
pub fn assert_jpeg(path: &Path) {
    let bytes = std::fs::read(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    assert_eq!(
        image::guess_format(&bytes).ok(),
        Some(ImageFormat::Jpeg),
        "{} is not a JPEG",
        path.display()
    );
    image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
        .unwrap_or_else(|e| panic!("{} does not decode: {}", path.display(), e));
}
