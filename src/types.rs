//! Core types for catalog-mirror

use serde::{Deserialize, Deserializer, Serialize};

/// Identifiers arrive from the catalog as either JSON strings or integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Integer(i64),
    Unsigned(u64),
}

impl From<RawIdentifier> for String {
    fn from(raw: RawIdentifier) -> Self {
        match raw {
            RawIdentifier::Text(s) => s,
            RawIdentifier::Integer(n) => n.to_string(),
            RawIdentifier::Unsigned(n) => n.to_string(),
        }
    }
}

macro_rules! opaque_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier text
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                RawIdentifier::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

opaque_identifier!(
    /// Product identifier as issued by the remote catalog (opaque)
    ProductId
);

opaque_identifier!(
    /// Image identifier as issued by the remote catalog (opaque)
    ImageId
);

/// One of the two sequential pipeline phases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Paging through the catalog search endpoint
    Enumerate,
    /// Resolving image lists and downloading assets
    ImageSync,
}

impl Stage {
    /// Stable key used for cursor persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Enumerate => "enumerate",
            Stage::ImageSync => "image_sync",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a catalog enumeration run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnumerationReport {
    /// Total record count reported by the catalog
    pub total: u64,
    /// Offset the run started from (non-zero only when resuming)
    pub start_offset: u64,
    /// Search page requests issued (excluding the count request)
    pub pages_requested: u64,
    /// Pages whose request or body failed
    pub pages_failed: u64,
    /// New product rows created
    pub products_inserted: u64,
    /// Products that were already known
    pub products_already_known: u64,
    /// Product rows that could not be written
    pub insert_failures: u64,
}

/// Summary of an image sync run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImageSyncReport {
    /// Products listed by the record store
    pub products_total: u64,
    /// Products skipped because a resume cursor said they were done
    pub products_resumed_past: u64,
    /// Products whose detail request failed
    pub products_failed: u64,
    /// Products whose image list resolved to empty
    pub products_without_images: u64,
    /// Products whose image list was already stored
    pub products_already_resolved: u64,
    /// Image download attempts issued
    pub assets_requested: u64,
    /// Assets written to disk during this run
    pub assets_written: u64,
    /// Assets skipped because they were already on disk
    pub assets_already_present: u64,
    /// Assets that failed to fetch, decode or write
    pub assets_failed: u64,
    /// Bytes written to disk during this run
    pub bytes_written: u64,
}

/// Summary of a full run (both stages)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Enumeration stage summary
    pub enumeration: EnumerationReport,
    /// Image sync stage summary
    pub images: ImageSyncReport,
}
