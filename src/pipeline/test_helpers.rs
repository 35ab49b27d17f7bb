//! Shared test helpers for running pipeline stages against a mock catalog.

use crate::catalog::HttpCatalogClient;
use crate::config::Config;
use crate::db::{Database, ImageIdsUpdate};
use crate::error::{DatabaseError, Error, Result};
use crate::file_store::FileStore;
use crate::pipeline::CatalogMirror;
use crate::record_store::RecordStore;
use crate::types::{ImageId, ProductId, Stage};
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use serde_json::json;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Base path of the mocked catalog API
pub(crate) const API_PREFIX: &str = "/api/v1/sht";

/// A mirror wired to a mock catalog, plus direct handles for assertions.
/// The tempdir must be kept alive for the duration of the test.
pub(crate) struct TestMirror {
    pub(crate) mirror: CatalogMirror,
    pub(crate) db: Arc<Database>,
    pub(crate) server: MockServer,
    pub(crate) _temp_dir: tempfile::TempDir,
}

impl TestMirror {
    /// Image root of the mirror
    pub(crate) fn image_root(&self) -> std::path::PathBuf {
        self.mirror.files().root().to_path_buf()
    }
}

/// Config with zero delays, pointing at `server`, storing under `root`
pub(crate) fn test_config(server: &MockServer, root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.catalog.base_url = format!("{}{}", server.uri(), API_PREFIX);
    config.catalog.timeout = Some(Duration::from_secs(10));
    config.sync.page_delay = Duration::ZERO;
    config.sync.product_delay = Duration::ZERO;
    config.storage.image_dir = root.join("images");
    config.persistence.database_path = root.join("data").join("main.db");
    config
}

/// Create a test mirror with the default test configuration
pub(crate) async fn create_test_mirror() -> TestMirror {
    create_test_mirror_with(|_| {}).await
}

/// Create a test mirror after letting the caller adjust the configuration
pub(crate) async fn create_test_mirror_with(adjust: impl FnOnce(&mut Config)) -> TestMirror {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();

    let mut config = test_config(&server, temp_dir.path());
    adjust(&mut config);

    let db = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .unwrap(),
    );
    let catalog = Arc::new(HttpCatalogClient::new(&config.catalog).unwrap());
    let files = FileStore::open(&config.storage.image_dir).await.unwrap();

    let mirror = CatalogMirror::with_components(config, catalog, db.clone(), files);

    TestMirror {
        mirror,
        db,
        server,
        _temp_dir: temp_dir,
    }
}

/// Same as [`create_test_mirror_with`] but with the store wrapped in a [`FlakyStore`]
pub(crate) async fn create_flaky_mirror(store: FlakyStore) -> TestMirror {
    let test = create_test_mirror().await;
    let config = (*test.mirror.config).clone();
    let catalog = test.mirror.catalog.clone();
    let files = (*test.mirror.files).clone();
    let db = store.inner.clone();

    TestMirror {
        mirror: CatalogMirror::with_components(config, catalog, Arc::new(store), files),
        db,
        server: test.server,
        _temp_dir: test._temp_dir,
    }
}

/// Mount the single-record count request
pub(crate) async fn mount_total(server: &MockServer, total: u64) {
    Mock::given(method("POST"))
        .and(path(format!("{}/articles/search", API_PREFIX)))
        .and(query_param("limit", "1"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": total,
            "articles": []
        })))
        .mount(server)
        .await;
}

/// Mount one search page; `articles` are (id, thumbnail) pairs
pub(crate) async fn mount_page(
    server: &MockServer,
    offset: u64,
    limit: u64,
    total: u64,
    articles: &[(&str, Option<&str>)],
) {
    let articles: Vec<_> = articles
        .iter()
        .map(|(id, image_id)| json!({ "id": id, "imageId": image_id }))
        .collect();

    Mock::given(method("POST"))
        .and(path(format!("{}/articles/search", API_PREFIX)))
        .and(query_param("limit", limit.to_string()))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": total,
            "articles": articles
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount a product detail response
pub(crate) async fn mount_detail(server: &MockServer, product_id: &str, image_ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("{}/articles/{}", API_PREFIX, product_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "imageIds": image_ids })))
        .mount(server)
        .await;
}

/// Mount an image response
pub(crate) async fn mount_image(
    server: &MockServer,
    product_id: &str,
    image_id: &str,
    response: ResponseTemplate,
) {
    Mock::given(method("GET"))
        .and(path(format!(
            "{}/articles/{}/media/{}",
            API_PREFIX, product_id, image_id
        )))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A JPEG image response
pub(crate) fn jpeg_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(jpeg_bytes(), "image/jpeg")
}

/// Small in-memory JPEG
pub(crate) fn jpeg_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_pixel(4, 4, Rgb([10u8, 120, 240]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// Small in-memory PNG with an alpha channel
pub(crate) fn png_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_pixel(5, 3, Rgba([255u8, 0, 0, 200]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Record store that fails selected writes and delegates the rest to a real database
pub(crate) struct FlakyStore {
    pub(crate) inner: Arc<Database>,
    pub(crate) failing_inserts: HashSet<ProductId>,
    pub(crate) fail_image_id_updates: bool,
}

impl FlakyStore {
    pub(crate) async fn new() -> (Self, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db = Database::new(&temp_dir.path().join("flaky.db")).await.unwrap();
        (
            Self {
                inner: Arc::new(db),
                failing_inserts: HashSet::new(),
                fail_image_id_updates: false,
            },
            temp_dir,
        )
    }

    fn injected(what: &str) -> Error {
        Error::Database(DatabaseError::QueryFailed(format!("injected failure: {}", what)))
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn list_products_with_images(&self) -> Result<Vec<ProductId>> {
        self.inner.list_products_with_images().await
    }

    async fn insert_product(
        &self,
        product_id: &ProductId,
        thumbnail_id: Option<&ImageId>,
    ) -> Result<bool> {
        if self.failing_inserts.contains(product_id) {
            return Err(Self::injected("insert"));
        }
        self.inner.insert_product(product_id, thumbnail_id).await
    }

    async fn update_image_ids(
        &self,
        product_id: &ProductId,
        image_ids: &[ImageId],
    ) -> Result<ImageIdsUpdate> {
        if self.fail_image_id_updates {
            return Err(Self::injected("update"));
        }
        self.inner.update_image_ids(product_id, image_ids).await
    }

    async fn image_ids(&self, product_id: &ProductId) -> Result<Option<Vec<ImageId>>> {
        self.inner.get_image_ids(product_id).await
    }

    async fn load_cursor(&self, stage: Stage) -> Result<Option<String>> {
        self.inner.load_cursor(stage).await
    }

    async fn save_cursor(&self, stage: Stage, position: &str) -> Result<()> {
        self.inner.save_cursor(stage, position).await
    }

    async fn clear_cursor(&self, stage: Stage) -> Result<()> {
        self.inner.clear_cursor(stage).await
    }
}

/// Number of regular files below `dir`
pub(crate) fn count_files(dir: &std::path::Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
