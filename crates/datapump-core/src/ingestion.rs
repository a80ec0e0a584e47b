use std::fs;
use std::path::{Path, PathBuf};

use datapump_parser::{parse_candles, Candle, HeaderCheck, EXPECTED_HEADER};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

/// One file's worth of normalized candles, ready for insertion.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub pair: String,
    pub path: PathBuf,
    pub header: HeaderCheck,
    pub candles: Vec<Candle>,
}

impl ImportJob {
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Path of the source file for `pair`.
pub fn source_path(dir: &Path, pair: &str, extension: &str) -> PathBuf {
    dir.join(format!("{pair}{extension}"))
}

/// Lists the pair labels of the regular files in `dir` ending in `extension`.
///
/// Subdirectories are not entered. Labels come back sorted.
pub fn discover_files(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let discovery_error = |source| PipelineError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut labels = Vec::new();
    for entry in fs::read_dir(dir).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        let path = entry.path();

        // fs::metadata follows symlinks, so a link to a regular file counts.
        let is_file = fs::metadata(&path).map(|meta| meta.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %path.display(), "skipping file with a non UTF-8 name");
            continue;
        };
        let Some(label) = name.strip_suffix(extension) else {
            continue;
        };
        if label.is_empty() {
            warn!(path = %path.display(), "skipping file without a pair label");
            continue;
        }
        labels.push(label.to_string());
    }

    labels.sort();
    Ok(labels)
}

/// Reads and normalizes the file for `pair`.
pub fn load_job(dir: &Path, pair: &str, extension: &str) -> Result<ImportJob> {
    let path = source_path(dir, pair, extension);
    let content = fs::read_to_string(&path).map_err(|source| PipelineError::Read {
        pair: pair.to_string(),
        path: path.clone(),
        source,
    })?;

    let parsed = parse_candles(pair, &content)?;
    report_header(pair, &parsed.header);

    Ok(ImportJob {
        pair: parsed.pair,
        path,
        header: parsed.header,
        candles: parsed.candles,
    })
}

fn report_header(pair: &str, header: &HeaderCheck) {
    let expected = EXPECTED_HEADER.join(", ");
    match header {
        HeaderCheck::Canonical => {
            info!(pair, given = %header, "header matches expected column order");
        }
        HeaderCheck::Mismatch(_) => {
            warn!(pair, expected, given = %header, "header differs from expected column order");
        }
        HeaderCheck::Absent => {
            warn!(pair, expected, "no header given");
        }
    }
}
