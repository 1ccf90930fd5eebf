use std::io::Write;

use super::Formatter;
use crate::aggregator::Collection;
use crate::error::RenderError;
use crate::snapshot::BatchDocument;

/// The batch document, readable back by `ipmerge replay`.
pub struct JsonFormatter;

impl JsonFormatter {
    pub const ID: &'static str = "json";
    pub const DESCRIPTION: &'static str = "Batch document with sources (replayable)";
}

impl Formatter for JsonFormatter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn render(&self, collection: &Collection, out: &mut dyn Write) -> Result<(), RenderError> {
        let document = BatchDocument::from_collection(collection);
        serde_json::to_writer_pretty(&mut *out, &document)?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::{render_to_string, sample_collection};

    #[test]
    fn test_json_shape_and_order() {
        let output = render_to_string(&JsonFormatter, &sample_collection());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["ipv4"]["10.0.0.0/8"], serde_json::json!(["alpha", "beta"]));
        assert_eq!(value["ipv6"]["2001:db8::/32"], serde_json::json!(["beta"]));

        // Collection order survives in the text
        let first = output.find("10.0.0.0/8").unwrap();
        let second = output.find("1.2.3.4/32").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_json_parses_back() {
        let collection = sample_collection();
        let output = render_to_string(&JsonFormatter, &collection);
        let document = BatchDocument::from_json(&output).unwrap();
        assert_eq!(document, BatchDocument::from_collection(&collection));
    }

    #[test]
    fn test_json_empty() {
        let output = render_to_string(&JsonFormatter, &Collection::new());
        let document = BatchDocument::from_json(&output).unwrap();
        assert!(document.is_empty());
    }
}
