pub mod denc;
pub mod encoding_metadata;
pub mod entity_addr;
pub mod error;
pub mod features;
pub mod hobject;
pub mod monmap;
pub mod padding;
pub mod pg_nls_response;
pub mod types;
pub mod zerocopy;

pub use denc::*;
pub use encoding_metadata::*;
pub use entity_addr::*;
pub use error::*;
pub use features::*;
pub use hobject::*;
pub use monmap::*;
pub use padding::*;
pub use pg_nls_response::*;
pub use types::*;
pub use zerocopy::*;

// Re-export derive macros
pub use denc_derive::{DencMut, ZeroCopyDencode};
