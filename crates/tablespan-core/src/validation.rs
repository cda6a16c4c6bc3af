//! Input validation, run before any backend I/O.

use crate::constants::{MAX_FILE_SIZE_MB, PDF_EXTENSION};
use crate::error::{Result, TablespanError};
use std::path::{Path, PathBuf};

/// Validate that the input path exists, is a regular file, carries the PDF
/// extension and is within the size limit.
///
/// # Errors
///
/// Returns [`TablespanError::Validation`] describing the first failed check.
pub fn validate_pdf_path(file_path: &Path) -> Result<PathBuf> {
    if file_path.as_os_str().is_empty() {
        return Err(TablespanError::Validation(
            "file path cannot be empty".to_string(),
        ));
    }
    if !file_path.exists() {
        return Err(TablespanError::Validation(format!(
            "file does not exist: {}",
            file_path.display()
        )));
    }
    if !file_path.is_file() {
        return Err(TablespanError::Validation(format!(
            "path is not a file: {}",
            file_path.display()
        )));
    }

    let extension_ok = file_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PDF_EXTENSION));
    if !extension_ok {
        return Err(TablespanError::Validation(format!(
            "file must be a .{PDF_EXTENSION}: {}",
            file_path.display()
        )));
    }

    let size_mb = file_path.metadata()?.len() / (1024 * 1024);
    if size_mb > MAX_FILE_SIZE_MB {
        return Err(TablespanError::Validation(format!(
            "file size ({size_mb} MB) exceeds maximum ({MAX_FILE_SIZE_MB} MB)"
        )));
    }

    Ok(file_path.to_path_buf())
}

/// Validate the output path, creating missing parent directories.
///
/// # Errors
///
/// Returns [`TablespanError::Validation`] if the path is empty, the file
/// already exists and `overwrite` is false, or the parent directory cannot
/// be created.
pub fn validate_output_path(file_path: &Path, overwrite: bool) -> Result<PathBuf> {
    if file_path.as_os_str().is_empty() {
        return Err(TablespanError::Validation(
            "output file path cannot be empty".to_string(),
        ));
    }
    if file_path.exists() && !overwrite {
        return Err(TablespanError::Validation(format!(
            "file already exists: {} (pass overwrite to replace it)",
            file_path.display()
        )));
    }
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TablespanError::Validation(format!("cannot create output directory: {e}"))
            })?;
        }
    }
    Ok(file_path.to_path_buf())
}

/// Validate a font size for the apply path.
///
/// # Errors
///
/// Returns [`TablespanError::Validation`] for sizes outside `(0, 72]`.
pub fn validate_font_size(size: f32) -> Result<f32> {
    if size <= 0.0 {
        return Err(TablespanError::Validation(
            "font size must be positive".to_string(),
        ));
    }
    if size > 72.0 {
        return Err(TablespanError::Validation(
            "font size cannot exceed 72 points".to_string(),
        ));
    }
    Ok(size)
}

/// Validate a 1-based page number against the document page count.
///
/// # Errors
///
/// Returns [`TablespanError::Validation`] for page 0 or pages past the end.
pub fn validate_page_number(page: u32, max_pages: u32) -> Result<u32> {
    if page < 1 {
        return Err(TablespanError::Validation(
            "page number must be >= 1".to_string(),
        ));
    }
    if page > max_pages {
        return Err(TablespanError::Validation(format!(
            "page number ({page}) exceeds document pages ({max_pages})"
        )));
    }
    Ok(page)
}
