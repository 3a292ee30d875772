pub mod client;
pub mod hash;
pub mod transfer;

pub use client::{locator_file_name, ByteStream, ContentSource, HttpContentSource};
pub use hash::{digests_match, hash_file, hash_file_for, HashAlgorithm};
pub use transfer::{discard, stream_to_file, temp_sibling};
