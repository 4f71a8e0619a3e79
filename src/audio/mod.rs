//! # Audio Upload Handling
//!
//! Everything that touches the uploaded audio before it reaches a provider.
//!
//! ## Key Components:
//! - **Validator**: extension allow-set and size limits
//! - **Temp File Manager**: scoped on-disk copy with guaranteed cleanup

pub mod temp_file; // Scoped temp file storage and release
pub mod validator; // Upload checks

pub use temp_file::TempFileManager;
pub use validator::{AudioValidator, UploadedAudio};
