use super::test_helpers::*;
use crate::error::Error;
use crate::types::{ImageId, ProductId, Stage};
use wiremock::ResponseTemplate;
