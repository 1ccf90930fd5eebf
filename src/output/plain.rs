use std::io::Write;

use super::{join_sources, Formatter};
use crate::aggregator::Collection;
use crate::error::RenderError;

/// One canonical prefix per line, IPv4 first.
pub struct PlainFormatter {
    with_sources: bool,
}

impl PlainFormatter {
    pub const ID: &'static str = "plain";
    pub const DESCRIPTION: &'static str = "One prefix per line";

    pub fn new(with_sources: bool) -> Self {
        Self { with_sources }
    }
}

impl Formatter for PlainFormatter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn render(&self, collection: &Collection, out: &mut dyn Write) -> Result<(), RenderError> {
        for entry in collection.iter() {
            if self.with_sources {
                writeln!(out, "{} # {}", entry.prefix, join_sources(&entry.sources, ","))?;
            } else {
                writeln!(out, "{}", entry.prefix)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::{render_to_string, sample_collection};

    #[test]
    fn test_plain() {
        let output = render_to_string(&PlainFormatter::new(false), &sample_collection());
        assert_eq!(output, "10.0.0.0/8\n1.2.3.4/32\n2001:db8::/32\n");
    }

    #[test]
    fn test_plain_with_sources() {
        let output = render_to_string(&PlainFormatter::new(true), &sample_collection());
        assert_eq!(
            output,
            "10.0.0.0/8 # alpha,beta\n1.2.3.4/32 # alpha\n2001:db8::/32 # beta\n"
        );
    }

    #[test]
    fn test_plain_empty() {
        let output = render_to_string(&PlainFormatter::new(false), &Collection::new());
        assert!(output.is_empty());
    }
}
