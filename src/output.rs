//! Writing generated artifacts to disk.
//!
//! Each class lands at `<output dir>/<namespace below the root>/<Class>.php`,
//! so `App\Sdk\Requests\Users\GetUser` under root `App\Sdk` is written to
//! `Requests/Users/GetUser.php`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codegen::{Emit, GeneratedCode, PhpFile};
use crate::error::{Result, SdkGenError};

/// Outcome of writing a single artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Written,
    /// Target exists with identical content.
    Unchanged,
    /// Target exists with other content and `force` is off.
    Skipped,
}

/// Paths touched by one [`write_generated`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Path of `file` relative to the output directory.
pub fn relative_path(file: &PhpFile, root_namespace: &str) -> PathBuf {
    let root = root_namespace.trim_matches('\\');
    let namespace = file.namespace.trim_matches('\\');
    let below = if namespace == root {
        ""
    } else {
        namespace
            .strip_prefix(&format!("{root}\\"))
            .unwrap_or(namespace)
    };

    let mut path = PathBuf::new();
    for part in below.split('\\').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path.push(format!("{}.php", file.class_name()));
    path
}

/// Emit every artifact under `output_dir`.
///
/// Existing files with different content are left alone and reported as
/// skipped unless `force` is set.
pub fn write_generated(
    code: &GeneratedCode,
    root_namespace: &str,
    output_dir: &Path,
    force: bool,
) -> Result<WriteReport> {
    let mut report = WriteReport::default();
    for file in code.all_files() {
        let path = output_dir.join(relative_path(file, root_namespace));
        match write_file(&path, &file.emit(), force)? {
            WriteResult::Written => report.written.push(path),
            WriteResult::Unchanged => debug!(path = %path.display(), "File is up to date."),
            WriteResult::Skipped => {
                warn!(path = %path.display(), "File already exists, skipping (use --force to overwrite).");
                report.skipped.push(path);
            }
        }
    }
    debug!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        output_dir = %output_dir.display(),
        "Wrote generated files."
    );
    Ok(report)
}

fn write_file(path: &Path, content: &str, force: bool) -> Result<WriteResult> {
    if path.exists() {
        let existing = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
        if existing == content {
            return Ok(WriteResult::Unchanged);
        }
        if !force {
            return Ok(WriteResult::Skipped);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }
    fs::write(path, content).map_err(|source| io_error(path, source))?;
    Ok(WriteResult::Written)
}

fn io_error(path: &Path, source: std::io::Error) -> SdkGenError {
    SdkGenError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codegen::types::{ClassDecl, ClassKind};

    fn file(namespace: &str, name: &str) -> PhpFile {
        PhpFile::new(namespace, ClassDecl::new(ClassKind::Class, name))
    }

    #[test]
    fn test_relative_path_strips_root_namespace() {
        assert_eq!(
            relative_path(&file("App\\Sdk\\Requests\\Users", "GetUser"), "App\\Sdk"),
            PathBuf::from("Requests/Users/GetUser.php")
        );
        assert_eq!(
            relative_path(&file("App\\Sdk", "Acme"), "\\App\\Sdk\\"),
            PathBuf::from("Acme.php")
        );
        assert_eq!(
            relative_path(&file("AppExtra", "Thing"), "App"),
            PathBuf::from("AppExtra/Thing.php")
        );
        assert_eq!(
            relative_path(&file("Other\\Place", "Thing"), "App"),
            PathBuf::from("Other/Place/Thing.php")
        );
    }

    #[test]
    fn test_write_file_honors_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Nested").join("A.php");

        assert_eq!(write_file(&path, "one", false).unwrap(), WriteResult::Written);
        assert_eq!(write_file(&path, "one", false).unwrap(), WriteResult::Unchanged);
        assert_eq!(write_file(&path, "two", false).unwrap(), WriteResult::Skipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), "one");
        assert_eq!(write_file(&path, "two", true).unwrap(), WriteResult::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }
}
