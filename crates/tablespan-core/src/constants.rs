//! Shared constants for analysis and modification defaults.

/// Font family used when format resolution fails or a requested font is
/// unavailable.
pub const DEFAULT_FONT_NAME: &str = "Helvetica";

/// Font size used with the default descriptor.
pub const DEFAULT_FONT_SIZE: f32 = 11.0;

/// Default text color (black).
pub const DEFAULT_COLOR: (u8, u8, u8) = (0, 0, 0);

/// Maximum input file size accepted by path validation.
pub const MAX_FILE_SIZE_MB: u64 = 50;

/// Expected input file extension (lowercase, without dot).
pub const PDF_EXTENSION: &str = "pdf";
