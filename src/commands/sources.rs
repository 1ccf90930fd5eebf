//! Sources listing command.

use anyhow::Result;

use crate::sources::all_sources;

/// List registered sources
pub fn run() -> Result<()> {
    println!("Available sources:");
    println!("──────────────────\n");
    println!("  {:<18} {:<8} NAME", "ID", "DEFAULT");

    for source in all_sources() {
        let default = if source.used_by_default() { "yes" } else { "no" };
        println!("  {:<18} {:<8} {}", source.id(), default, source.name());
    }

    println!();
    println!("Select with --sources, --include and --exclude-source.");
    Ok(())
}
