//! Test configuration helpers for pointing a mirror at a mock catalog

use catalog_mirror::{CatalogMirror, Config};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Path prefix under which the mock catalog is served
pub const API_PREFIX: &str = "/api/v1/sht";

/// Configuration with zero pacing delays, storing everything below `root`
pub fn test_config(server: &MockServer, root: &Path) -> Config {
    let mut config = Config::default();
    config.catalog.base_url = format!("{}{}", server.uri(), API_PREFIX);
    config.catalog.timeout = Some(Duration::from_secs(10));
    config.catalog.page_size = 2;
    config.sync.page_delay = Duration::ZERO;
    config.sync.product_delay = Duration::ZERO;
    config.storage.image_dir = root.join("images");
    config.persistence.database_path = root.join("data").join("main.db");
    config
}

/// Open a mirror over a fresh temp directory
///
/// The returned `TempDir` must be kept alive for the duration of the test.
pub async fn create_test_mirror(server: &MockServer) -> (CatalogMirror, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mirror = open_mirror(server, temp_dir.path()).await;
    (mirror, temp_dir)
}

/// Open a mirror over an existing directory (used to simulate a restart)
pub async fn open_mirror(server: &MockServer, root: &Path) -> CatalogMirror {
    CatalogMirror::new(test_config(server, root)).await.unwrap()
}
