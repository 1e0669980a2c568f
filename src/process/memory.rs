//! PSS sampling from `/proc/<pid>/smaps_rollup` and `/proc/<pid>/smaps`.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read buffer sizes for the smaps parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    pub smaps_kb: usize,
    pub smaps_rollup_kb: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            smaps_kb: 512,
            smaps_rollup_kb: 256,
        }
    }
}

/// Parses kilobyte values from smaps file lines.
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

/// Sums every `Pss:` line of an smaps-formatted stream, in bytes.
///
/// Malformed values count as zero. `Pss_Anon:`, `Pss_File:` and friends are
/// breakdowns of `Pss:` and are not added again.
pub fn sum_pss<R: BufRead>(reader: R) -> Result<u64, std::io::Error> {
    let mut pss_kb: u64 = 0;
    // Mapping headers carry file names, which need not be UTF-8
    for line in reader.split(b'\n') {
        let l = line?;
        if let Some(v) = l.strip_prefix(b"Pss:") {
            let value = std::str::from_utf8(v).ok().and_then(parse_kb_value);
            pss_kb = pss_kb.saturating_add(value.unwrap_or(0));
        }
    }
    Ok(pss_kb.saturating_mul(1024))
}

/// Parses PSS from a single smaps-format file.
pub fn parse_pss_file(path: &Path, buf_kb: usize) -> Result<u64, std::io::Error> {
    let file = fs::File::open(path)?;
    sum_pss(BufReader::with_capacity(buf_kb * 1024, file))
}

/// PSS of the process at `proc_path`, in bytes.
/// Uses smaps_rollup (Linux >= 4.14) when available, otherwise the full smaps.
pub fn read_pss(proc_path: &Path, buffers: &BufferConfig) -> Result<u64, std::io::Error> {
    let rollup = proc_path.join("smaps_rollup");
    if rollup.exists() {
        return parse_pss_file(&rollup, buffers.smaps_rollup_kb);
    }

    parse_pss_file(&proc_path.join("smaps"), buffers.smaps_kb)
}
