//! Owners command implementation.
//!
//! Prints the packages a path is attributed to, using the same resolver as the report.

use anyhow::Result;
use dpkg_memstats::Resolver;

use crate::commands::report::load_index;
use crate::config::Config;

/// Prints `pkg1, pkg2: path` for each path, like `dpkg -S`.
pub fn command_owners(paths: &[String], config: &Config) -> Result<()> {
    let index = load_index(config)?;
    let overrides = config.overrides();
    let resolver = Resolver::new(&index, &overrides, config.unattributed_label());

    for path in paths {
        let owners = resolver.resolve(path);
        let names: Vec<&str> = owners.iter().map(|p| p.as_ref()).collect();
        println!("{}: {}", names.join(", "), path);
    }
    Ok(())
}
