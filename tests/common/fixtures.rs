//! Mock catalog fixtures and in-memory image generators

use super::config::API_PREFIX;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use serde_json::json;
use std::io::Cursor;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// How the mock catalog serves one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// `image/jpeg` payload
    Jpeg,
    /// `image/png` payload that must be re-encoded
    Png,
    /// HTTP 500
    Broken,
}

/// One product in the mock catalog
#[derive(Debug, Clone)]
pub struct ProductFixture {
    pub id: &'static str,
    pub thumbnail: Option<&'static str>,
    pub images: Vec<(&'static str, ImageKind)>,
}

impl ProductFixture {
    pub fn new(id: &'static str, images: &[(&'static str, ImageKind)]) -> Self {
        Self {
            id,
            thumbnail: images.first().map(|(image_id, _)| *image_id),
            images: images.to_vec(),
        }
    }

    /// Product listed without a thumbnail (never reaches the image stage)
    pub fn without_thumbnail(id: &'static str) -> Self {
        Self {
            id,
            thumbnail: None,
            images: Vec::new(),
        }
    }
}

/// A complete mock catalog
#[derive(Debug, Clone)]
pub struct CatalogFixture {
    pub products: Vec<ProductFixture>,
    pub page_size: usize,
}

impl CatalogFixture {
    pub fn new(products: Vec<ProductFixture>, page_size: usize) -> Self {
        Self {
            products,
            page_size,
        }
    }

    /// Total number of images across all products
    pub fn image_count(&self) -> usize {
        self.products.iter().map(|p| p.images.len()).sum()
    }

    /// Mount count, search, detail and media endpoints on `server`
    pub async fn mount(&self, server: &MockServer) {
        let total = self.products.len();
        let search_path = format!("{}/articles/search", API_PREFIX);

        Mock::given(method("POST"))
            .and(path(search_path.clone()))
            .and(query_param("limit", "1"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": total,
                "articles": []
            })))
            .mount(server)
            .await;

        for (page, chunk) in self.products.chunks(self.page_size).enumerate() {
            let articles: Vec<_> = chunk
                .iter()
                .map(|p| json!({ "id": p.id, "imageId": p.thumbnail }))
                .collect();

            Mock::given(method("POST"))
                .and(path(search_path.clone()))
                .and(query_param("limit", self.page_size.to_string()))
                .and(query_param("offset", (page * self.page_size).to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "total": total,
                    "articles": articles
                })))
                .mount(server)
                .await;
        }

        for product in &self.products {
            let image_ids: Vec<_> = product.images.iter().map(|(id, _)| *id).collect();
            Mock::given(method("GET"))
                .and(path(format!("{}/articles/{}", API_PREFIX, product.id)))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({ "imageIds": image_ids })),
                )
                .mount(server)
                .await;

            for (image_id, kind) in &product.images {
                let response = match kind {
                    ImageKind::Jpeg => ResponseTemplate::new(200).set_body_raw(jpeg_bytes(), "image/jpeg"),
                    ImageKind::Png => ResponseTemplate::new(200).set_body_raw(png_bytes(), "image/png"),
                    ImageKind::Broken => ResponseTemplate::new(500),
                };
                Mock::given(method("GET"))
                    .and(path(format!(
                        "{}/articles/{}/media/{}",
                        API_PREFIX, product.id, image_id
                    )))
                    .respond_with(response)
                    .mount(server)
                    .await;
            }
        }
    }
}

/// Small in-memory JPEG
pub fn jpeg_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_pixel(6, 4, Rgb([20u8, 200, 60]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// Small in-memory PNG with transparency
pub fn png_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_pixel(3, 7, Rgba([0u8, 0, 255, 50]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}
