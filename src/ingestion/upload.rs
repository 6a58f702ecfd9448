//! Upload envelope and format dispatch.
//!
//! An [`UploadFile`] carries the raw bytes of an uploaded file plus its original file name.
//! [`parse_upload`] runs the pre-parse checks (size ceiling, recognized extension) and then
//! dispatches to the format-specific parser, producing a [`RawTable`].

use std::fmt;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawTable;

use super::csv;

/// Longest accepted dataset display name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl UploadFormat {
    /// Parse an upload format from a file extension (case-insensitive).
    ///
    /// Workbook extensions are only recognized when the `excel` feature is enabled.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "ods" if cfg!(feature = "excel") => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format from a file name's extension.
    pub fn from_file_name(file_name: &str) -> PipelineResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PipelineError::rejected(format!("file '{file_name}' has no extension"))
            })?;

        Self::from_extension(ext).ok_or_else(|| {
            PipelineError::rejected(format!(
                "unsupported file type '.{ext}' for '{file_name}' (expected a tabular file such as .csv)"
            ))
        })
    }
}

/// An uploaded file, as handed over by the transport layer.
#[derive(Clone)]
pub struct UploadFile {
    /// Original file name, used for format detection and as the default display name.
    pub file_name: String,
    /// Optional display name for the dataset.
    pub name: Option<String>,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("name", &self.name)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            name: None,
            bytes: bytes.into(),
        }
    }

    /// Set the dataset display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The dataset display name: the explicit name, else the file name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.file_name)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Checks that run before any parsing: size ceiling, extension, display name length.
    pub fn precheck(&self, max_bytes: u64) -> PipelineResult<UploadFormat> {
        if self.size() > max_bytes {
            return Err(PipelineError::rejected(format!(
                "file size {} bytes exceeds the {max_bytes} byte limit",
                self.size()
            )));
        }
        let format = UploadFormat::from_file_name(&self.file_name)?;
        let name = self.display_name();
        if name.trim().is_empty() {
            return Err(PipelineError::rejected("dataset name must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(PipelineError::rejected(format!(
                "dataset name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        Ok(format)
    }
}

/// Pre-check an upload and parse it into a [`RawTable`].
pub fn parse_upload(upload: &UploadFile, max_bytes: u64) -> PipelineResult<RawTable> {
    let format = upload.precheck(max_bytes)?;
    match format {
        UploadFormat::Csv => csv::parse_csv_bytes(&upload.bytes),
        UploadFormat::Excel => parse_excel_dispatch(&upload.bytes),
    }
}

fn parse_excel_dispatch(bytes: &[u8]) -> PipelineResult<RawTable> {
    #[cfg(feature = "excel")]
    {
        super::excel::parse_workbook_bytes(bytes)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = bytes;
        Err(PipelineError::rejected(
            "workbook uploads not enabled (enable cargo feature 'excel')",
        ))
    }
}
