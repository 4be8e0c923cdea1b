//! G-code file reading
//!
//! Files are streamed line by line through a large buffer so that multi
//! hundred megabyte prints never sit in memory at once. Bytes that are not
//! valid UTF-8 are replaced rather than failing the whole file; G-code is
//! ASCII in practice and stray bytes only ever show up in comments.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

/// Buffer size for reading large files (256 KB)
const READ_BUFFER_SIZE: usize = 256 * 1024;

const UTF8_BOM: &str = "\u{feff}";

/// G-code file reader with streaming support
#[derive(Debug, Clone)]
pub struct GcodeFileReader {
    path: PathBuf,
    file_size: u64,
}

impl GcodeFileReader {
    /// Create a new G-code file reader
    ///
    /// # Errors
    /// Returns error if the file does not exist or cannot be accessed
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow!("Path is not a file: {}", path.display()));
        }

        let metadata = fs::metadata(&path)?;
        let file_size = metadata.len();

        Ok(Self { path, file_size })
    }

    /// Get file size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file for streaming
    ///
    /// # Errors
    /// Returns error if the file cannot be opened
    pub fn lines(&self) -> Result<GcodeLines> {
        let file = File::open(&self.path)
            .map_err(|e| anyhow!("Failed to open {}: {}", self.path.display(), e))?;
        Ok(GcodeLines {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, file),
            buffer: Vec::new(),
            first_line: true,
        })
    }
}

/// Lines of a G-code file without their terminators
pub struct GcodeLines {
    reader: BufReader<File>,
    buffer: Vec<u8>,
    first_line: bool,
}

impl Iterator for GcodeLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(self.buffer.last(), Some(b'\n' | b'\r')) {
                    self.buffer.pop();
                }
                let mut line = String::from_utf8_lossy(&self.buffer).into_owned();
                if std::mem::take(&mut self.first_line) {
                    if let Some(stripped) = line.strip_prefix(UTF8_BOM) {
                        line = stripped.to_string();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
