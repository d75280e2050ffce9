// Public API - what other modules can use
pub use multipart::{read_multipart, MultipartForm};
pub use staging::StagedFile;
pub use uploader::{LocalMediaUploader, MediaUploader, UploadedMedia};

mod multipart;
mod staging;
mod uploader;
