//! Report rendering: aligned text table or structured JSON/YAML.

use serde::Serialize;

use crate::aggregate::{PackageUsage, UsageReport};

const HEADER: (&str, &str) = ("Package/Proc", "Memory (PSS)");
const RULE: &str = "------------";
const MIN_NAME_WIDTH: usize = 12;
const COLUMN_GAP: usize = 4;

/// Formats bytes with SI units, e.g. `0 B`, `999 B`, `1.5 MB`, `300 kB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

    if bytes < 10 {
        return format!("{} B", bytes);
    }

    let mut exp = 0;
    let mut scale = 1u64;
    while exp + 1 < UNITS.len() && bytes / scale >= 1000 {
        scale *= 1000;
        exp += 1;
    }

    // Round to one decimal place.
    let val = ((bytes as f64 / scale as f64) * 10.0 + 0.5).floor() / 10.0;
    if val < 10.0 {
        format!("{:.1} {}", val, UNITS[exp])
    } else {
        format!("{:.0} {}", val, UNITS[exp])
    }
}

/// Table rendering options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Show per-process sub-rows under each package.
    pub verbose: bool,
    /// Only list the N largest packages; the total row still covers all.
    pub top: Option<usize>,
}

/// Packages largest first, honoring `top`.
fn largest_first<'a>(report: &'a UsageReport, top: Option<usize>) -> Vec<&'a PackageUsage> {
    let limit = top.unwrap_or(usize::MAX);
    report.packages.iter().rev().take(limit).collect()
}

/// Renders the two-column report table.
pub fn render_table(report: &UsageReport, opts: TableOptions) -> String {
    let mut rows: Vec<(String, String)> = Vec::new();
    rows.push((HEADER.0.to_string(), HEADER.1.to_string()));
    rows.push((RULE.to_string(), RULE.to_string()));

    for pkg in largest_first(report, opts.top) {
        rows.push((pkg.package.clone(), format_bytes(pkg.total_bytes)));
        if opts.verbose {
            for p in pkg.processes.iter().rev() {
                rows.push((
                    format!("- [{}] {}", p.sample.pid, p.sample.cmdline),
                    format_bytes(p.attributed_bytes),
                ));
            }
        }
    }

    rows.push((RULE.to_string(), RULE.to_string()));
    rows.push(("total".to_string(), format_bytes(report.total_bytes())));

    let width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max(MIN_NAME_WIDTH);

    let mut out = String::new();
    for (name, size) in rows {
        let pad = width - name.chars().count() + COLUMN_GAP;
        out.push_str(&name);
        out.push_str(&" ".repeat(pad));
        out.push_str(&size);
        out.push('\n');
    }
    out
}

/// Structured form of the report, largest package first.
#[derive(Debug, Serialize)]
pub struct ReportView<'a> {
    pub total_bytes: u64,
    pub processes_sampled: usize,
    pub processes_attributed: usize,
    pub packages: Vec<&'a PackageUsage>,
}

impl<'a> ReportView<'a> {
    pub fn new(report: &'a UsageReport, top: Option<usize>) -> Self {
        Self {
            total_bytes: report.total_bytes(),
            processes_sampled: report.processes_sampled,
            processes_attributed: report.processes_attributed,
            packages: largest_first(report, top),
        }
    }
}

pub fn render_json(report: &UsageReport, top: Option<usize>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ReportView::new(report, top))
}

pub fn render_yaml(report: &UsageReport, top: Option<usize>) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&ReportView::new(report, top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregation, SharePolicy};
    use crate::process::ProcessSample;
    use std::sync::Arc;

    fn report() -> UsageReport {
        let mut agg = Aggregation::new(SharePolicy::FairShare);
        let rec = |agg: &mut Aggregation, pid, cmd: &str, pss, pkg: &str| {
            agg.record(
                ProcessSample {
                    pid,
                    exe: String::new(),
                    cmdline: cmd.to_string(),
                    pss_bytes: pss,
                },
                &[Arc::from(pkg)],
            )
        };
        rec(&mut agg, 1, "/sbin/init", 2_000_000, "systemd");
        rec(&mut agg, 2, "bash", 300_000, "bash");
        rec(&mut agg, 3, "bash -l", 100_000, "bash");
        agg.finish()
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(9), "9 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1000), "1.0 kB");
        assert_eq!(format_bytes(300_000), "300 kB");
        assert_eq!(format_bytes(1_500_000), "1.5 MB");
        assert_eq!(format_bytes(82_854_982), "83 MB");
        assert_eq!(format_bytes(u64::MAX), "18 EB");
    }

    #[test]
    fn test_render_table_largest_first_with_total() {
        let out = render_table(&report(), TableOptions::default());
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Package/Proc"));
        assert!(lines[2].starts_with("systemd") && lines[2].ends_with("2.0 MB"));
        assert!(lines[3].starts_with("bash") && lines[3].ends_with("400 kB"));
        assert!(lines[5].starts_with("total") && lines[5].ends_with("2.4 MB"));
    }

    #[test]
    fn test_render_table_verbose_rows() {
        let opts = TableOptions {
            verbose: true,
            top: None,
        };
        let out = render_table(&report(), opts);
        let bash_at = out.find("\nbash").unwrap();
        let tail = &out[bash_at..];
        let first = tail.find("- [2] bash").unwrap();
        let second = tail.find("- [3] bash -l").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_render_table_columns_align() {
        let out = render_table(&report(), TableOptions::default());
        let lines: Vec<&str> = out.lines().collect();
        let size_col = |line: &str| line.find(char::is_numeric).unwrap();

        // Size column of package and total rows starts where the header's does
        let header_col = lines[0].find("Memory").unwrap();
        assert_eq!(size_col(lines[2]), header_col);
        assert_eq!(size_col(lines[3]), header_col);
        assert_eq!(size_col(lines[5]), header_col);
    }

    #[test]
    fn test_top_limits_rows_not_total() {
        let opts = TableOptions {
            verbose: false,
            top: Some(1),
        };
        let out = render_table(&report(), opts);
        assert!(out.contains("systemd"));
        assert!(!out.contains("\nbash"));
        assert!(out.lines().last().unwrap().ends_with("2.4 MB"));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&report(), None).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["total_bytes"], 2_400_000);
        assert_eq!(v["packages"][0]["package"], "systemd");
        assert_eq!(v["packages"][1]["processes"][0]["pid"], 3);
    }
}
