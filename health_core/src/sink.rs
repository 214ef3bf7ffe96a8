//! Destinations for finished export documents.
//!
//! A sink receives the rendered bytes together with the generated file name.
//! Files are written atomically with file locking so a half-written export
//! never appears under its final name.

use crate::csv_export::ExportDocument;
use crate::{Error, Result};
use fs2::FileExt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Document sink trait for delivering exports
pub trait DocumentSink {
    fn deliver(&mut self, filename: &str, contents: &[u8]) -> Result<()>;

    /// Render `document` and deliver it
    fn deliver_document(&mut self, filename: &str, document: &ExportDocument) -> Result<()> {
        let bytes = document.to_bytes()?;
        self.deliver(filename, &bytes)
    }
}

/// Atomically replace `path` with `contents`
///
/// Writes to a locked temp file in the same directory, syncs it and
/// renames it over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::Other, "output path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = io::BufWriter::new(temp.as_file());
        writer.write_all(contents)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Writes each document as a file inside a directory
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    last_written: Option<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_written: None,
        }
    }

    /// Path of the most recent successful delivery
    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }
}

impl DocumentSink for DirectorySink {
    fn deliver(&mut self, filename: &str, contents: &[u8]) -> Result<()> {
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(Error::WriteFailed(format!(
                "invalid file name {:?}",
                filename
            )));
        }

        let path = self.dir.join(filename);
        write_atomic(&path, contents)
            .map_err(|e| Error::WriteFailed(format!("{}: {}", path.display(), e)))?;

        tracing::info!("Saved {} bytes to {:?}", contents.len(), path);
        self.last_written = Some(path);
        Ok(())
    }
}

/// Streams documents to any writer, typically stdout
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> DocumentSink for WriterSink<W> {
    fn deliver(&mut self, filename: &str, contents: &[u8]) -> Result<()> {
        self.writer
            .write_all(contents)
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::WriteFailed(e.to_string()))?;
        tracing::debug!("Streamed {} ({} bytes)", filename, contents.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &[u8] = b"Date,ISO8601,Metric,Value,Unit\n";

    #[test]
    fn test_directory_sink_writes_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(temp_dir.path().join("exports"));

        sink.deliver("HealthExporter_2024-01-15_093000.csv", CSV)
            .unwrap();

        let path = sink.last_written().unwrap().to_path_buf();
        assert_eq!(
            path,
            temp_dir
                .path()
                .join("exports/HealthExporter_2024-01-15_093000.csv")
        );
        assert_eq!(std::fs::read(&path).unwrap(), CSV);
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(temp_dir.path());

        sink.deliver("out.csv", b"old contents that are longer\n").unwrap();
        sink.deliver("out.csv", CSV).unwrap();

        assert_eq!(std::fs::read(temp_dir.path().join("out.csv")).unwrap(), CSV);
        // No temp files left behind
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_rejects_path_in_filename() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(temp_dir.path());

        let result = sink.deliver("../escape.csv", CSV);
        assert!(matches!(result, Err(Error::WriteFailed(_))));
        assert!(sink.last_written().is_none());
    }

    #[test]
    fn test_unwritable_directory_is_write_failed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();

        let mut sink = DirectorySink::new(&blocker);
        let result = sink.deliver("out.csv", CSV);
        assert!(matches!(result, Err(Error::WriteFailed(_))));
    }

    #[test]
    fn test_writer_sink_streams_document() {
        let mut sink = WriterSink::new(Vec::new());
        sink.deliver_document("x.csv", &ExportDocument::default())
            .unwrap();
        assert_eq!(sink.into_inner(), CSV);
    }
}
