use std::io::Write;

use super::{join_sources, Formatter};
use crate::aggregator::Collection;
use crate::error::RenderError;

/// `prefix,family,sources` rows. Prefixes and source ids never contain a
/// comma, so no quoting is needed.
pub struct CsvFormatter;

impl CsvFormatter {
    pub const ID: &'static str = "csv";
    pub const DESCRIPTION: &'static str = "CSV with family and sources columns";
}

impl Formatter for CsvFormatter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn render(&self, collection: &Collection, out: &mut dyn Write) -> Result<(), RenderError> {
        writeln!(out, "prefix,family,sources")?;
        for entry in collection.iter() {
            writeln!(
                out,
                "{},{},{}",
                entry.prefix,
                entry.prefix.family().section_name(),
                join_sources(&entry.sources, ";")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::{render_to_string, sample_collection};

    #[test]
    fn test_csv() {
        let output = render_to_string(&CsvFormatter, &sample_collection());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "prefix,family,sources",
                "10.0.0.0/8,ipv4,alpha;beta",
                "1.2.3.4/32,ipv4,alpha",
                "2001:db8::/32,ipv6,beta",
            ]
        );
    }

    #[test]
    fn test_csv_empty_has_header() {
        let output = render_to_string(&CsvFormatter, &Collection::new());
        assert_eq!(output, "prefix,family,sources\n");
    }
}
