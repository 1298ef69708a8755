//! File sink: numbered rotation, optional gzip, circular-buffer staging.
//!
//! Owns a `File`, tracks current size, and rotates into numbered files
//! (`path.0..path.K`), staged through a [`crate::buffer::CircularBuffer`]
//! rather than writing straight through.

use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::buffer::CircularBuffer;
use crate::error::{ErrorContext, ErrorHandler, NexlogError, Result, StderrErrorHandler};
use crate::format::TemplateFormatter;
use crate::level::{Level, Metadata};

use super::{Sink, SinkKind};

/// Which triggers rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    Size,
    Time,
    Both,
}

pub struct FileSinkConfig {
    pub path: PathBuf,
    pub min_level: Level,
    pub max_size: u64,
    pub rotation_interval_secs: u64,
    pub rotation_mode: RotationMode,
    pub max_rotated_files: usize,
    pub compress: bool,
    pub flush_interval_ms: u64,
    pub buffer_capacity: usize,
}

pub struct FileSink {
    path: PathBuf,
    min_level: Level,
    max_size: u64,
    rotation_interval_secs: u64,
    rotation_mode: RotationMode,
    max_rotated_files: usize,
    compress: bool,
    flush_interval_ms: u64,

    file: Option<File>,
    current_size: u64,
    buffer: CircularBuffer,
    last_flush: Instant,
    last_rotation: Instant,
    formatter: TemplateFormatter,
    error_handler: Arc<dyn ErrorHandler>,
}

impl FileSink {
    pub fn new(config: FileSinkConfig, formatter: TemplateFormatter) -> Result<Self> {
        Self::with_error_handler(config, formatter, Arc::new(StderrErrorHandler))
    }

    pub fn with_error_handler(
        config: FileSinkConfig,
        formatter: TemplateFormatter,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&config.path)?;
        let current_size = file.metadata()?.len();
        Ok(FileSink {
            path: config.path,
            min_level: config.min_level,
            max_size: config.max_size,
            rotation_interval_secs: config.rotation_interval_secs,
            rotation_mode: config.rotation_mode,
            max_rotated_files: config.max_rotated_files,
            compress: config.compress,
            flush_interval_ms: config.flush_interval_ms,
            file: Some(file),
            current_size,
            buffer: CircularBuffer::new(config.buffer_capacity),
            last_flush: Instant::now(),
            last_rotation: Instant::now(),
            formatter,
            error_handler,
        })
    }

    fn should_flush(&self) -> bool {
        let half_full = self.buffer.occupancy() * 2 >= self.buffer.capacity();
        let interval_elapsed = self.last_flush.elapsed().as_millis() as u64 >= self.flush_interval_ms;
        half_full || interval_elapsed
    }

    fn should_rotate(&self, upcoming: u64) -> bool {
        let size_trigger = matches!(self.rotation_mode, RotationMode::Size | RotationMode::Both)
            && self.current_size + upcoming >= self.max_size;
        let time_trigger = matches!(self.rotation_mode, RotationMode::Time | RotationMode::Both)
            && self.last_rotation.elapsed().as_secs() >= self.rotation_interval_secs;
        size_trigger || time_trigger
    }

    fn report(&self, kind: &str, message: String) {
        self.error_handler
            .handle(&ErrorContext::new(kind, message, file!(), line!()));
    }

    /// Drain all staged bytes into the active file with a single `write_all`,
    /// then sync, matching the drain-before-rotate contract.
    fn flush_to_file(&mut self) -> Result<()> {
        let pending = self.buffer.drain_all();
        if pending.is_empty() {
            return Ok(());
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| NexlogError::State("file sink has no active file handle".to_string()))?;
        file.write_all(&pending)?;
        file.sync_all()?;
        self.current_size += pending.len() as u64;
        self.last_flush = Instant::now();
        Ok(())
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn gz_path(&self, index: usize) -> PathBuf {
        let mut name = self.rotated_path(index).into_os_string();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// 5-step rotation: close the active file, shift numbered files down,
    /// stage the old active file into `path.0`, optionally compress it, then
    /// open a fresh active file.
    fn rotate(&mut self) -> Result<()> {
        self.flush_to_file()?;

        self.file = None;

        let highest = self.rotated_path(self.max_rotated_files.saturating_sub(1));
        let highest_gz = self.gz_path(self.max_rotated_files.saturating_sub(1));
        if self.max_rotated_files > 0 {
            let _ = fs::remove_file(&highest);
            let _ = fs::remove_file(&highest_gz);
            for i in (1..self.max_rotated_files).rev() {
                let from_plain = self.rotated_path(i - 1);
                let to_plain = self.rotated_path(i);
                let from_gz = self.gz_path(i - 1);
                let to_gz = self.gz_path(i);
                if from_gz.exists() {
                    let _ = fs::rename(&from_gz, &to_gz);
                } else if from_plain.exists() {
                    let _ = fs::rename(&from_plain, &to_plain);
                }
            }

            let staged = self.rotated_path(0);
            let tmp = {
                let mut name = staged.clone().into_os_string();
                name.push(".tmp");
                PathBuf::from(name)
            };
            match fs::rename(&self.path, &tmp) {
                Ok(()) => {
                    if let Err(err) = fs::rename(&tmp, &staged) {
                        self.report("Io", format!("failed to finalize rotated file: {}", err));
                        let _ = fs::rename(&tmp, &staged);
                    }
                }
                Err(_) => {
                    let _ = fs::rename(&self.path, &staged);
                }
            }

            if self.compress && staged.exists() {
                if let Err(err) = compress_file(&staged) {
                    self.report("Io", format!("rotation compression failed, keeping plain file: {}", err));
                }
            }
        } else {
            let _ = fs::remove_file(&self.path);
        }

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.file = Some(file);
        self.current_size = 0;
        self.last_rotation = Instant::now();
        Ok(())
    }

    fn maybe_flush_and_rotate(&mut self, upcoming: u64) -> Result<()> {
        if self.should_flush() {
            self.flush_to_file()?;
        }
        if self.should_rotate(upcoming) {
            self.rotate()?;
        }
        Ok(())
    }
}

fn compress_file(path: &Path) -> std::io::Result<()> {
    let gz_tmp = {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz.tmp");
        PathBuf::from(name)
    };
    let gz_final = {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    };

    let input = fs::read(path)?;
    let out_file = File::create(&gz_tmp)?;
    let mut encoder = GzEncoder::new(out_file, Compression::default());
    encoder.write_all(&input)?;
    encoder.finish()?;

    fs::rename(&gz_tmp, &gz_final)?;
    fs::remove_file(path)?;
    Ok(())
}

impl Sink for FileSink {
    fn write_structured(&mut self, level: Level, message: &str, metadata: Option<&Metadata>) -> Result<()> {
        if level < self.min_level {
            return Ok(());
        }
        let mut rendered = self.formatter.format(level, message, metadata);
        rendered.push('\n');
        self.write_preformatted(rendered.as_bytes())
    }

    fn write_preformatted(&mut self, bytes: &[u8]) -> Result<()> {
        match self.buffer.write(bytes) {
            Ok(_) => {}
            Err(_) => {
                self.flush_to_file()?;
                self.buffer.write(bytes).map_err(NexlogError::from)?;
            }
        }
        self.maybe_flush_and_rotate(bytes.len() as u64)
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_to_file()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn min_level(&self) -> Level {
        self.min_level
    }

    fn kind(&self) -> SinkKind {
        SinkKind::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatterConfig;
    use ahash::AHashMap;
    use tempfile::tempdir;

    fn make_sink(dir: &Path, max_size: u64, max_rotated_files: usize) -> FileSink {
        let formatter = TemplateFormatter::new(FormatterConfig::file_default(), AHashMap::new()).unwrap();
        let config = FileSinkConfig {
            path: dir.join("app.log"),
            min_level: Level::Trace,
            max_size,
            rotation_interval_secs: 3600,
            rotation_mode: RotationMode::Size,
            max_rotated_files,
            compress: false,
            flush_interval_ms: 0,
            buffer_capacity: 4096,
        };
        FileSink::new(config, formatter).unwrap()
    }

    #[test]
    fn writes_are_flushed_to_disk() {
        let dir = tempdir().unwrap();
        let mut sink = make_sink(dir.path(), 1024 * 1024, 3);
        sink.write_structured(Level::Info, "hello", None).unwrap();
        sink.flush().unwrap();
        let contents = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert!(contents.contains("hello"));
    }

    #[test]
    fn rotation_produces_numbered_files() {
        let dir = tempdir().unwrap();
        let mut sink = make_sink(dir.path(), 64, 3);
        for i in 0..20 {
            sink.write_structured(Level::Info, &format!("line {}", i), None)
                .unwrap();
        }
        sink.flush().unwrap();
        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.log.0").exists());
    }

    #[test]
    fn rotation_retention_caps_file_count() {
        let dir = tempdir().unwrap();
        let mut sink = make_sink(dir.path(), 32, 2);
        for i in 0..200 {
            sink.write_structured(Level::Info, &format!("line {}", i), None)
                .unwrap();
        }
        sink.flush().unwrap();
        assert!(!dir.path().join("app.log.2").exists());
    }

    #[test]
    fn below_min_level_is_a_no_op() {
        let dir = tempdir().unwrap();
        let mut sink = make_sink(dir.path(), 1024, 3);
        let mut sink_with_gate = sink;
        sink_with_gate.min_level = Level::Warn;
        sink_with_gate.write_structured(Level::Debug, "ignored", None).unwrap();
        sink_with_gate.flush().unwrap();
        let contents = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert!(!contents.contains("ignored"));
    }
}
