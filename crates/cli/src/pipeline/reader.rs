//! JSON Lines frame result reader.

use std::path::{Path, PathBuf};

use contracts::FrameResult;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::error::{CliError, Result};

/// Reads one `FrameResult` per line. Blank lines and `#` comments are skipped.
pub struct FrameReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: u64,
}

impl FrameReader {
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::input_not_found(path.display().to_string()));
        }
        let file = File::open(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line: 0,
        })
    }

    /// Line number of the last line read
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Next frame result, or `None` at end of input
    pub async fn next_frame(&mut self) -> Result<Option<FrameResult>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return serde_json::from_str(trimmed).map(Some).map_err(|e| {
                CliError::input_parse(self.path.display().to_string(), self.line, e.to_string())
            });
        }
        Ok(None)
    }
}
