//! Formats listing command.

use anyhow::Result;

use crate::output::FORMATS;

/// List output formats
pub fn run() -> Result<()> {
    println!("Available formats:");
    println!("──────────────────\n");

    for (id, description) in FORMATS {
        println!("  {:<10} {}", id, description);
    }

    println!();
    println!("Select with -f/--format.");
    Ok(())
}
