//! Media module: payload location, normalization, and item representation.

pub mod item;
pub mod locator;
pub mod parser;

pub use item::{AuthorIdentity, MediaItem, MediaType, MetadataDocument, VideoDescriptor};
pub use locator::{locate, PayloadShape, RawPayload};
pub use parser::{normalize, NormalizedPayload};
