mod blob;

pub use blob::{BlobReader, BlobStorage, BlobWriter, StorageError};
