//! Process discovery and per-process metadata from /proc.

use std::fs;
use std::path::{Path, PathBuf};

/// Default proc filesystem mount point.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Bytes of the command line kept for the report.
pub const DEFAULT_CMDLINE_MAX_LEN: usize = 60;

/// Process entry representing a directory in /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

/// Scans the proc root for process entries with numeric PIDs, sorted by PID.
pub fn collect_proc_entries(root: &Path, max: Option<usize>) -> Vec<ProcEntry> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let p = entry.path();
            let name = match p.file_name().and_then(|s| s.to_str()) {
                Some(v) => v,
                None => continue,
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let pid: u32 = match name.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            out.push(ProcEntry { pid, proc_path: p });
        }
    }
    out.sort_by_key(|e| e.pid);
    if let Some(maxp) = max {
        out.truncate(maxp);
    }
    out
}

/// Target of the `exe` link, or an empty string if it cannot be resolved
/// (kernel thread, process gone, permission denied).
pub fn read_exe(proc_path: &Path) -> String {
    fs::read_link(proc_path.join("exe"))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Command line with NUL separators shown as spaces, cut to `max_len` bytes.
pub fn read_cmdline(proc_path: &Path, max_len: usize) -> String {
    match fs::read(proc_path.join("cmdline")) {
        Ok(content) => summarize_cmdline(&content, max_len),
        Err(_) => String::new(),
    }
}

/// Renders a raw cmdline blob as a bounded, single-line summary.
pub fn summarize_cmdline(raw: &[u8], max_len: usize) -> String {
    let text = String::from_utf8_lossy(raw).replace('\0', " ");
    let mut cut = max_len.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text[..cut].trim().to_string()
}
