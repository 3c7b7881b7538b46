pub mod encoding;
pub mod entry;
pub mod error;
pub mod varint;

pub use encoding::Encoding;
pub use entry::Entry;
pub use error::{Error, Result};
