//! Filesystem-backed source.

use std::fs;
use std::io;
use std::path::{Path as FsPath, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{check_key, Error, Result};
use crate::path::compose;
use crate::traits::{ByteSink, ByteSource, ByteStream};

/// Reads resources from the local filesystem.
///
/// The effective path is `root + key + suffix` (see [`compose`]). Keys are not
/// sanitized: callers decide which keys are acceptable.
///
/// # Example
///
/// ```rust
/// use loadstone_source::{ByteSource, FileSystemSource};
///
/// let source = FileSystemSource::new("/srv/templates/", ".tpl");
/// assert_eq!(source.effective_path("/mail/welcome").unwrap(), "/srv/templates/mail/welcome.tpl");
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    name: String,
    root: String,
    suffix: String,
}

impl FileSystemSource {
    /// Create a source rooted at `root` that appends `suffix` to keys.
    pub fn new(root: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            name: "FileSystemSource".to_string(),
            root: root.into(),
            suffix: suffix.into(),
        }
    }

    /// Create a source rooted at a directory, ensuring the root ends with `/`.
    pub fn in_dir(dir: impl AsRef<FsPath>, suffix: impl Into<String>) -> Self {
        let mut root = dir.as_ref().to_string_lossy().into_owned();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self::new(root, suffix)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The string prepended to keys.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The string appended to keys.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    fn file_path(&self, key: &str) -> Result<PathBuf> {
        check_key("resource key", key)?;
        Ok(PathBuf::from(compose(&self.root, key, &self.suffix)?))
    }

    /// List the keys of every regular file below the root.
    ///
    /// Keys are relative to the root, `/`-separated, and have the suffix
    /// removed. Only files ending with the suffix are listed.
    pub fn keys(&self) -> Result<Vec<String>> {
        let root = PathBuf::from(&self.root);
        let mut keys = Vec::new();

        for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| self.root.clone());
                Error::read(path, io::Error::other(e.to_string()))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(&root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            match key.strip_suffix(self.suffix.as_str()) {
                Some(stem) if !self.suffix.is_empty() && !stem.is_empty() => {
                    keys.push(stem.to_string())
                }
                _ if self.suffix.is_empty() => keys.push(key),
                _ => {}
            }
        }

        Ok(keys)
    }
}

impl Default for FileSystemSource {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl ByteSource for FileSystemSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        check_key("resource key", key)?;
        compose(&self.root, key, &self.suffix)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        let path = self.file_path(key).ok()?;
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    fn open(&self, key: &str) -> Result<ByteStream> {
        let path = self.file_path(key)?;
        let shown = path.display().to_string();

        if path.is_dir() {
            return Err(Error::not_found(
                key,
                format!("'{}' not found or is not a readable file", shown),
            ));
        }

        tracing::debug!(path = %shown, "opening file");
        match fs::File::open(&path) {
            Ok(file) => Ok(Box::new(io::BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::not_found(
                key,
                format!("'{}' not found or is not a readable file", shown),
            )),
            Err(e) => Err(Error::read(shown, e)),
        }
    }
}

impl ByteSink for FileSystemSource {
    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(key)?;
        let shown = path.display().to_string();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::read(
                        parent.display().to_string(),
                        io::Error::new(
                            e.kind(),
                            format!("error creating directory chain: {}", e),
                        ),
                    )
                })?;
            }
        }

        tracing::debug!(path = %shown, bytes = data.len(), "writing file");
        fs::write(&path, data).map_err(|e| Error::read(shown, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn reads_file_with_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), "hi there").unwrap();

        let source = FileSystemSource::in_dir(dir.path(), ".txt");
        let mut text = String::new();
        source
            .open("hello")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "hi there");

        // Suffix is not doubled
        assert_eq!(source.read_bytes("hello.txt").unwrap().as_ref(), b"hi there");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let source = FileSystemSource::in_dir(dir.path(), "");

        let err = source.open("nope").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let source = FileSystemSource::in_dir(dir.path(), "");

        let err = source.open("sub").err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn last_modified_known_only_for_existing_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), "x").unwrap();
        let source = FileSystemSource::in_dir(dir.path(), "");

        assert!(source.last_modified("a").is_some());
        assert!(source.last_modified("b").is_none());
        assert!(source.last_modified("").is_none());
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let source = FileSystemSource::in_dir(dir.path(), ".unit");

        source.write("gen/reports/monthly", b"package gen").unwrap();
        let written = fs::read_to_string(dir.path().join("gen/reports/monthly.unit")).unwrap();
        assert_eq!(written, "package gen");
        assert_eq!(
            source.read_bytes("gen/reports/monthly").unwrap().as_ref(),
            b"package gen"
        );
    }

    #[test]
    fn keys_lists_files_without_suffix() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("mail")).unwrap();
        fs::write(dir.path().join("mail/welcome.tpl"), "a").unwrap();
        fs::write(dir.path().join("index.tpl"), "b").unwrap();
        fs::write(dir.path().join("notes.md"), "c").unwrap();

        let source = FileSystemSource::in_dir(dir.path(), ".tpl");
        assert_eq!(source.keys().unwrap(), vec!["index", "mail/welcome"]);
    }

    #[test]
    fn empty_key_rejected() {
        let source = FileSystemSource::default();
        let err = source.effective_path("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
