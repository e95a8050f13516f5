//! Image processing for the ingestion pipeline: upload validation, storage
//! filename generation, EXIF orientation normalization, dimension probing and
//! variant generation (large/medium/thumb).

pub mod filename;
pub mod metadata;
pub mod orientation;
pub mod validator;
pub mod variants;

pub use validator::{UploadValidator, ValidationError};
pub use variants::{generate_variants, GeneratedVariant, VariantKind, VariantSpec};
