/*
MIT License

Copyright (c) 2023 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Extraction of decoded entries to the filesystem.
//!
//! Entries are written by a bounded pool of workers. Every entry is extracted on its own:
//! a failure is reported in the result of that entry and doesn't stop the others.

use crate::{ArchiveEntry, ExtractError, TypeFlag};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};

/// Destination of extracted entries. Paths are relative and already sanitized.
pub trait FileSink: Sync {
    type File: Write;

    /// Creates or truncates the file at `path`.
    fn create_file(&self, path: &Path) -> io::Result<Self::File>;

    /// Creates the directory at `path`, including missing parents.
    fn create_dir(&self, path: &Path) -> io::Result<()>;
}

/// Writes entries below a root directory, creating missing parent directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for DirectorySink {
    /// Extracts into the current working directory.
    fn default() -> Self {
        Self::new(".")
    }
}

impl FileSink for DirectorySink {
    type File = File;

    fn create_file(&self, path: &Path) -> io::Result<File> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(target)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.root.join(path))
    }
}

/// Options for [`extract_all`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum number of entries written at the same time.
    pub concurrency: NonZeroUsize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Writes every entry to the sink and waits until all of them are done.
///
/// Returns one result per entry, in archive order: the entry name on success or the reason
/// it could not be extracted. Directory entries are created as directories, every other
/// entry as a file holding its content.
pub fn extract_all<K: FileSink>(
    entries: Vec<ArchiveEntry>,
    sink: &K,
    options: &ExtractOptions,
) -> Vec<Result<String, ExtractError>> {
    let extract = |entry: ArchiveEntry| {
        extract_entry(entry, sink).inspect_err(|e| log::error!("{e}"))
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.concurrency.get())
        .thread_name(|i| format!("ustar-extract-{i}"))
        .build();
    match pool {
        Ok(pool) => pool.install(|| entries.into_par_iter().map(extract).collect()),
        Err(e) => {
            log::warn!("Unable to start extraction workers, extracting sequentially: {e}");
            entries.into_iter().map(extract).collect()
        }
    }
}

fn extract_entry<K: FileSink>(entry: ArchiveEntry, sink: &K) -> Result<String, ExtractError> {
    let name = entry.name().to_owned();
    let Some(path) = sanitize_path(&name) else {
        return Err(ExtractError::UnsafePath { name });
    };

    if entry.type_flag().is_some_and(TypeFlag::is_directory) {
        if let Err(source) = sink.create_dir(&path) {
            return Err(ExtractError::CreateDir { name, source });
        }
        log::info!("Created directory {name}");
        return Ok(name);
    }

    let mut file = match sink.create_file(&path) {
        Ok(file) => file,
        Err(source) => return Err(ExtractError::Create { name, source }),
    };
    if let Err(source) = file.write_all(entry.data()).and_then(|()| file.flush()) {
        return Err(ExtractError::Write { name, source });
    }
    log::info!("Extracted content for {name}");
    Ok(name)
}

/// Turns an entry name into a relative path that stays below the extraction root.
///
/// Leading `/` and `.` components are dropped. Returns `None` for names with a `..`
/// component and for names without any normal component.
pub fn sanitize_path(name: &str) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::CurDir => {}
            // see CVE-2001-1267, CVE-2002-0399, CVE-2005-1918, CVE-2007-4131
            Component::ParentDir => return None,
            Component::Normal(part) => result.push(part),
        }
    }
    (!result.as_os_str().is_empty()).then_some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ArchiveBuilder;
    use crate::{decode_archive, ContentSpan, DecodeOptions, TarArchive};
    use std::io::Cursor;

    /// Delegates to a [`DirectorySink`] but fails to create one file.
    struct FailingSink {
        inner: DirectorySink,
        fail_on: &'static str,
    }

    impl FileSink for FailingSink {
        type File = File;

        fn create_file(&self, path: &Path) -> io::Result<File> {
            if path == Path::new(self.fail_on) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.inner.create_file(path)
        }

        fn create_dir(&self, path: &Path) -> io::Result<()> {
            self.inner.create_dir(path)
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenSink;

    impl FileSink for BrokenSink {
        type File = BrokenWriter;

        fn create_file(&self, _path: &Path) -> io::Result<BrokenWriter> {
            Ok(BrokenWriter)
        }

        fn create_dir(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn three_entries() -> Vec<ArchiveEntry> {
        let archive = ArchiveBuilder::new()
            .file("a.txt", b"first")
            .file("b.txt", b"second")
            .file("c.txt", b"third")
            .finish()
            .cursor();
        decode_archive(archive).unwrap()
    }

    #[test]
    fn test_extract_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let entries = decode_archive(Cursor::new(include_bytes!("../tests/ustar_small.tar"))).unwrap();
        let sink = DirectorySink::new(dir.path());

        let results = extract_all(entries, &sink, &ExtractOptions::default());
        let names = results.into_iter().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(names, ["hello_world.txt", "bye_world.txt", "nested/notes.txt"]);

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("hello_world.txt"), "Hello World");
        assert_eq!(read("bye_world.txt"), "Bye World");
        assert_eq!(read("nested/notes.txt"), "first linesecond line");
    }

    #[test]
    fn test_extract_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FailingSink {
            inner: DirectorySink::new(dir.path()),
            fail_on: "b.txt",
        };

        let results = extract_all(three_entries(), &sink, &ExtractOptions::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), "a.txt");
        assert!(matches!(
            &results[1],
            Err(ExtractError::Create { name, .. }) if name == "b.txt"
        ));
        assert_eq!(results[2].as_ref().unwrap(), "c.txt");

        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "first");
        assert!(!dir.path().join("b.txt").exists());
        assert_eq!(fs::read_to_string(dir.path().join("c.txt")).unwrap(), "third");
    }

    #[test]
    fn test_extract_write_failure() {
        let results = extract_all(three_entries(), &BrokenSink, &ExtractOptions::default());
        assert_eq!(results.len(), 3);
        for (result, expected) in results.iter().zip(["a.txt", "b.txt", "c.txt"]) {
            let err = result.as_ref().unwrap_err();
            assert!(matches!(err, ExtractError::Write { .. }));
            assert_eq!(err.name(), expected);
        }
    }

    #[test]
    fn test_extract_rejects_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let archive = ArchiveBuilder::new()
            .file("../evil.txt", b"evil")
            .file("/absolute.txt", b"absolute")
            .finish()
            .cursor();
        let entries = decode_archive(archive).unwrap();

        let results = extract_all(entries, &DirectorySink::new(&root), &ExtractOptions::default());
        assert!(matches!(
            &results[0],
            Err(ExtractError::UnsafePath { name }) if name == "../evil.txt"
        ));
        assert!(!dir.path().join("evil.txt").exists());

        assert_eq!(results[1].as_ref().unwrap(), "/absolute.txt");
        assert_eq!(fs::read_to_string(root.join("absolute.txt")).unwrap(), "absolute");
    }

    #[test]
    fn test_extract_directories() {
        let dir = tempfile::tempdir().unwrap();
        let options = DecodeOptions::default().with_content_span(ContentSpan::BlockAligned);
        let entries = TarArchive::with_options(
            Cursor::new(include_bytes!("../tests/ustar_aligned.tar")),
            options,
        )
        .entries()
        .unwrap();

        let results = extract_all(entries, &DirectorySink::new(dir.path()), &ExtractOptions::default());
        assert!(results.iter().all(Result::is_ok));
        assert!(dir.path().join("docs").is_dir());
        assert_eq!(fs::read(dir.path().join("empty.txt")).unwrap(), b"");
        assert_eq!(
            fs::read_to_string(dir.path().join("bye_world_513b.txt")).unwrap().len(),
            512
        );
    }

    #[test]
    fn test_bounded_pool_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = ArchiveBuilder::new();
        for i in 0..64 {
            builder = builder.file(&format!("file_{i}.txt"), format!("content {i}").as_bytes());
        }
        let entries = decode_archive(builder.finish().cursor()).unwrap();

        let options = ExtractOptions::default().with_concurrency(NonZeroUsize::new(3).unwrap());
        let results = extract_all(entries, &DirectorySink::new(dir.path()), &options);
        assert_eq!(results.len(), 64);
        for (i, result) in results.into_iter().enumerate() {
            let name = format!("file_{i}.txt");
            assert_eq!(result.unwrap(), name);
            assert_eq!(
                fs::read_to_string(dir.path().join(&name)).unwrap(),
                format!("content {i}")
            );
        }
    }

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(sanitize_path("./a/./b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(sanitize_path("/etc/passwd"), Some(PathBuf::from("etc/passwd")));
        assert_eq!(sanitize_path("docs/"), Some(PathBuf::from("docs")));
        assert_eq!(sanitize_path("a/../../b"), None);
        assert_eq!(sanitize_path(".."), None);
        assert_eq!(sanitize_path(""), None);
        assert_eq!(sanitize_path("/"), None);
    }
}
