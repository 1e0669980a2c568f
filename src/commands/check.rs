//! Check command implementation.
//!
//! Validates system requirements and configuration.

use anyhow::{bail, Result};
use dpkg_memstats::format_bytes;
use dpkg_memstats::manifest::discover_manifests;
use dpkg_memstats::process::{collect_proc_entries, read_pss};
use nix::unistd::geteuid;

use crate::config::{validate_effective_config, Config};

/// Validates system requirements and configuration.
pub fn command_check(manifests: bool, proc: bool, all: bool, config: &Config) -> Result<()> {
    println!("🔍 dpkg-memstats - System Check");
    println!("===============================");

    let mut all_ok = true;

    if manifests || all {
        let dir = config.manifest_dir();
        println!("\n📦 Checking package file lists in {}...", dir.display());
        match discover_manifests(&dir, config.manifest_suffix()) {
            Ok(found) if found.is_empty() => {
                println!(
                    "   ⚠️  No *{} files found - every process will be unattributed",
                    config.manifest_suffix()
                );
            }
            Ok(found) => {
                println!("   ✅ {} package file lists found", found.len());
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    if proc || all {
        let proc_fs = config.proc_fs();
        println!("\n📁 Checking {} filesystem...", proc_fs.root.display());

        let entries = collect_proc_entries(&proc_fs.root, Some(5));
        if entries.is_empty() {
            println!("   ❌ Cannot read any process entries");
            all_ok = false;
        } else {
            println!("   ✅ Can read process entries");
        }

        let self_path = proc_fs.root.join(std::process::id().to_string());
        match read_pss(&self_path, &proc_fs.buffers) {
            Ok(pss) => println!("   ✅ PSS parsing successful: own PSS={}", format_bytes(pss)),
            Err(e) => {
                println!("   ❌ PSS parsing failed: {}", e);
                all_ok = false;
            }
        }

        if geteuid().is_root() {
            println!("   ✅ Running as root - all processes can be sampled");
        } else {
            println!("   ⚠️  Not running as root - other users' processes will count as zero");
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        bail!("system check failed");
    }
}
