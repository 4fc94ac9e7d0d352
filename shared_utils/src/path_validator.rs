//! Path Validation Module
//!
//! libvips and ImageMagick parse option suffixes (`file.tif[0]`,
//! `out.tif[compression=none]`) out of file name arguments, so paths handed to
//! them must not carry characters those parsers act on.

use std::fmt;
use std::path::Path;

/// Characters the image engines interpret inside a file name argument
const ENGINE_RESERVED_CHARS: &[char] = &[
    '[',  // option block start
    ']',  // option block end
    '\n', // breaks line-based probe output
    '\r',
    '\0',
];

/// Path validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValidationError {
    /// Path contains a character the engines would misparse
    ReservedCharacter { character: char, path: String },
    /// Path is empty
    EmptyPath,
    /// Input and output paths are the same
    InputOutputConflict { path: String },
}

impl fmt::Display for PathValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValidationError::ReservedCharacter { character, path } => {
                write!(
                    f,
                    "path contains reserved character {:?}: {}",
                    character, path
                )
            }
            PathValidationError::EmptyPath => write!(f, "empty path provided"),
            PathValidationError::InputOutputConflict { path } => {
                write!(f, "input and output paths are identical: {}", path)
            }
        }
    }
}

impl std::error::Error for PathValidationError {}

/// Validate a path before it is passed to an image engine.
///
/// # Example
/// ```
/// use shared_utils::path_validator::validate_path;
/// use std::path::Path;
///
/// assert!(validate_path(Path::new("/images/scan.tif")).is_ok());
/// assert!(validate_path(Path::new("/images/scan[1].tif")).is_err());
/// ```
pub fn validate_path(path: &Path) -> Result<(), PathValidationError> {
    let path_str = path.to_string_lossy();

    if path_str.is_empty() {
        return Err(PathValidationError::EmptyPath);
    }

    if let Some(c) = path_str.chars().find(|c| ENGINE_RESERVED_CHARS.contains(c)) {
        tracing::warn!(path = %path_str, character = ?c, "Path validation failed");
        return Err(PathValidationError::ReservedCharacter {
            character: c,
            path: path_str.to_string(),
        });
    }

    Ok(())
}

/// Validate multiple paths at once
pub fn validate_paths(paths: &[&Path]) -> Result<(), PathValidationError> {
    for path in paths {
        validate_path(path)?;
    }
    Ok(())
}

/// Check if input and output paths refer to the same file
pub fn check_input_output_conflict(input: &Path, output: &Path) -> Result<(), PathValidationError> {
    let input_canonical = input.canonicalize().unwrap_or_else(|_| input.to_path_buf());

    let output_canonical = if output.exists() {
        output
            .canonicalize()
            .unwrap_or_else(|_| output.to_path_buf())
    } else if output.is_relative() {
        std::env::current_dir().unwrap_or_default().join(output)
    } else {
        output.to_path_buf()
    };

    if input_canonical == output_canonical {
        return Err(PathValidationError::InputOutputConflict {
            path: input.display().to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_plain_paths_are_valid() {
        assert!(validate_path(Path::new("/data/in/ag-obj-286-0033.jpg")).is_ok());
        assert!(validate_path(Path::new("relative name with spaces.tif")).is_ok());
    }

    #[test]
    fn test_reserved_characters_rejected() {
        let err = validate_path(Path::new("/data/a[0].tif")).unwrap_err();
        assert_eq!(
            err,
            PathValidationError::ReservedCharacter {
                character: '[',
                path: "/data/a[0].tif".to_string(),
            }
        );
        assert!(validate_path(Path::new("/data/a\nb.tif")).is_err());
    }

    #[test]
    fn test_empty_path_rejected() {
        assert_eq!(
            validate_path(Path::new("")),
            Err(PathValidationError::EmptyPath)
        );
    }

    #[test]
    fn test_validate_paths_stops_at_first_error() {
        let result = validate_paths(&[Path::new("/ok.tif"), Path::new("/bad].tif")]);
        assert!(matches!(
            result,
            Err(PathValidationError::ReservedCharacter { character: ']', .. })
        ));
    }

    #[test]
    fn test_input_output_conflict() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("scan.tif");
        fs::write(&input, b"tiff").unwrap();

        assert!(check_input_output_conflict(&input, &input).is_err());
        assert!(check_input_output_conflict(&input, &dir.path().join("out.tif")).is_ok());
    }
}
