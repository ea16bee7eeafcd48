use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ErrorKind;

/// Extensions accepted for both uploads, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// The recognized per-file ceiling. Disabled unless configured.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 16 * 1024 * 1024;

/// Which of the two exports a file stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Crystal,
    Query,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Crystal => write!(f, "Crystal"),
            FileRole::Query => write!(f, "Query"),
        }
    }
}

/// A file chosen by the user. Contents are read by the engine at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            name,
            size_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lower-cased suffix after the last dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

/// A validated pair, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub crystal_file: FileHandle,
    pub query_file: FileHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationLimits {
    pub max_file_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select both files; the {role} file is missing.")]
    MissingFile { role: FileRole },
    #[error("The {role} file {name:?} is not an Excel file (.xlsx or .xls).")]
    InvalidExtension { role: FileRole, name: String },
    #[error("The {role} file {name:?} is {size_bytes} bytes; the limit is {max_bytes} bytes.")]
    FileTooLarge {
        role: FileRole,
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingFile { .. } => ErrorKind::MissingFile,
            ValidationError::InvalidExtension { .. } => ErrorKind::InvalidExtension,
            ValidationError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
        }
    }
}

/// Checks presence, then extension, then size. Crystal is reported before Query.
pub fn validate(
    crystal: Option<&FileHandle>,
    query: Option<&FileHandle>,
    limits: ValidationLimits,
) -> Result<UploadRequest, ValidationError> {
    let crystal = crystal.ok_or(ValidationError::MissingFile {
        role: FileRole::Crystal,
    })?;
    let query = query.ok_or(ValidationError::MissingFile {
        role: FileRole::Query,
    })?;

    for (role, file) in [(FileRole::Crystal, crystal), (FileRole::Query, query)] {
        if !has_allowed_extension(file) {
            return Err(ValidationError::InvalidExtension {
                role,
                name: file.name.clone(),
            });
        }
    }

    if let Some(max_bytes) = limits.max_file_bytes {
        for (role, file) in [(FileRole::Crystal, crystal), (FileRole::Query, query)] {
            if file.size_bytes > max_bytes {
                return Err(ValidationError::FileTooLarge {
                    role,
                    name: file.name.clone(),
                    size_bytes: file.size_bytes,
                    max_bytes,
                });
            }
        }
    }

    Ok(UploadRequest {
        crystal_file: crystal.clone(),
        query_file: query.clone(),
    })
}

fn has_allowed_extension(file: &FileHandle) -> bool {
    file.extension()
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}
