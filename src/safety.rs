//! Safety checks run before the output file is replaced.
//!
//! The CLI deletes an existing output before writing, so the path is checked
//! first to make sure it can never point at the input table.

use anyhow::{bail, Result};
use std::path::Path;

use crate::io::OutputFormat;

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output filename must contain the required pattern (e.g., "dedup")
/// - Output must have a supported extension
/// - Output cannot be the same file as any of the provided source paths
pub fn validate_output_path(
    output: &Path,
    required_pattern: &str,
    source_paths: &[&Path],
) -> Result<OutputFormat> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    let Some(format) = OutputFormat::from_path(output) else {
        bail!(
            "Safety check failed: output '{}' must end in .csv, .sqlite3, .sqlite or .db",
            output.display()
        );
    };

    for source in source_paths {
        if same_file(output, source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(format)
}

/// Literal match, or both paths exist and resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output_csv() {
        let output = PathBuf::from("/tmp/shelby-parties-dedup.csv");
        let source = PathBuf::from("/data/shelby_party_counts.csv");
        assert_eq!(validate_output_path(&output, "dedup", &[&source]).unwrap(), OutputFormat::Csv);
    }

    #[test]
    fn test_valid_output_sqlite() {
        let output = PathBuf::from("/tmp/parties-dedup.sqlite3");
        let source = PathBuf::from("/data/shelby_party_counts.csv");
        assert_eq!(validate_output_path(&output, "dedup", &[&source]).unwrap(), OutputFormat::Sqlite);
    }

    #[test]
    fn test_missing_pattern() {
        let output = PathBuf::from("/tmp/output.csv");
        let source = PathBuf::from("/data/source.csv");
        let result = validate_output_path(&output, "dedup", &[&source]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must contain 'dedup'"));
    }

    #[test]
    fn test_unsupported_extension() {
        let output = PathBuf::from("/tmp/parties-dedup.xlsx");
        let result = validate_output_path(&output, "dedup", &[]);
        assert!(result.unwrap_err().to_string().contains("must end in"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/parties-dedup.csv");
        let result = validate_output_path(&path, "dedup", &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_output_aliases_source_through_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("counts-dedup.csv");
        std::fs::write(&source, "party_name,party_count\n").unwrap();
        let aliased = dir.path().join(".").join("counts-dedup.csv");
        assert!(validate_output_path(&aliased, "dedup", &[&source]).is_err());
    }
}
