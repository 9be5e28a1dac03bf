//! Upload handling: the single point where stored file paths are produced.
//!
//! Every uploaded file lands under the configured content root in a
//! per-resource subdirectory, named `<uuid>_<unix timestamp>.<ext>`. The
//! stored path is always `<subdir>/<file name>`, relative to the root.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::util;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "pdf"];

pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    /// Validates the file and writes it under `<upload_dir>/<subdir>/`,
    /// returning the relative path to store in the database.
    pub fn save(&self, config: &AppConfig, subdir: &str) -> Result<String, ApiError> {
        if self.content.len() > config.max_upload_size {
            return Err(ApiError::PayloadTooLarge);
        }

        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_owned()))?;
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Invalid file type .{}, allowed types: {}",
                extension,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
        if !matches_magic_bytes(&extension, &self.content) {
            return Err(ApiError::BadRequest(
                "File content does not match its extension".to_owned(),
            ));
        }

        let directory = config.upload_dir.join(subdir);
        fs::create_dir_all(&directory)
            .map_err(|err| anyhow::anyhow!("couldn't create upload directory: {err}"))?;

        let file_name = format!(
            "{}_{}.{}",
            uuid::Uuid::new_v4().simple(),
            util::now().unix_timestamp(),
            extension
        );
        let destination = directory.join(&file_name);

        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&destination)
            .map_err(|err| anyhow::anyhow!("couldn't create upload file: {err}"))?;
        file.write_all(&self.content)
            .map_err(|err| anyhow::anyhow!("couldn't write upload: {err}"))?;

        Ok(format!("{}/{}", subdir, file_name))
    }
}

/// Checks the leading bytes of the content against the signature implied by
/// the extension, so a client-declared type can't smuggle other content in.
fn matches_magic_bytes(extension: &str, content: &[u8]) -> bool {
    match extension {
        "jpg" | "jpeg" => content.starts_with(&[0xFF, 0xD8, 0xFF]),
        "png" => content.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "gif" => content.starts_with(b"GIF8"),
        "pdf" => content.starts_with(b"%PDF"),
        _ => false,
    }
}
