//! Output formatters for the aggregated collection.
//!
//! Formatters are registered statically and resolved by identifier when the
//! configuration is validated, so an unknown format fails before any fetch.

mod csv;
mod ipset;
mod json;
mod nftables;
mod plain;

use std::io::Write;

pub use self::csv::CsvFormatter;
pub use self::ipset::IpsetFormatter;
pub use self::json::JsonFormatter;
pub use self::nftables::NftablesFormatter;
pub use self::plain::PlainFormatter;

use crate::aggregator::Collection;
use crate::error::{ConfigError, RenderError};
use crate::utils::is_safe_name;

/// Longest set name `ipset` accepts.
pub const MAX_SET_NAME_LEN: usize = 31;
const MAX_TABLE_NAME_LEN: usize = 64;

/// Renders a collection to a byte sink.
pub trait Formatter {
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn render(&self, collection: &Collection, out: &mut dyn Write) -> Result<(), RenderError>;
}

/// Settings shared by the formatters that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterOptions {
    /// Base name of the generated ipset/nftables sets.
    pub set_name: String,
    /// nftables table name.
    pub table_name: String,
    /// Annotate entries with their sources where the format allows it.
    pub with_sources: bool,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            set_name: "ipmerge".to_string(),
            table_name: "ipmerge".to_string(),
            with_sources: false,
        }
    }
}

impl FormatterOptions {
    /// Set and table names end up verbatim in generated scripts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Room for the "-v4"/"_v6" suffix
        check_name("set name", &self.set_name, MAX_SET_NAME_LEN - 3)?;
        check_name("table name", &self.table_name, MAX_TABLE_NAME_LEN)?;
        Ok(())
    }
}

fn check_name(kind: &'static str, value: &str, max: usize) -> Result<(), ConfigError> {
    if is_safe_name(value, max) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            kind,
            value: value.to_string(),
            max,
        })
    }
}

/// `(id, description)` of every formatter, in listing order.
pub const FORMATS: &[(&str, &str)] = &[
    (PlainFormatter::ID, PlainFormatter::DESCRIPTION),
    (JsonFormatter::ID, JsonFormatter::DESCRIPTION),
    (CsvFormatter::ID, CsvFormatter::DESCRIPTION),
    (IpsetFormatter::ID, IpsetFormatter::DESCRIPTION),
    (NftablesFormatter::ID, NftablesFormatter::DESCRIPTION),
];

/// Resolve a formatter by identifier.
pub fn formatter_for(
    id: &str,
    options: &FormatterOptions,
) -> Result<Box<dyn Formatter>, ConfigError> {
    options.validate()?;
    let formatter: Box<dyn Formatter> = match id {
        PlainFormatter::ID => Box::new(PlainFormatter::new(options.with_sources)),
        JsonFormatter::ID => Box::new(JsonFormatter),
        CsvFormatter::ID => Box::new(CsvFormatter),
        IpsetFormatter::ID => Box::new(IpsetFormatter::new(
            &options.set_name,
            options.with_sources,
        )),
        NftablesFormatter::ID => Box::new(NftablesFormatter::new(
            &options.table_name,
            &options.set_name,
        )),
        other => return Err(ConfigError::UnknownFormat(other.to_string())),
    };
    Ok(formatter)
}

/// Source ids of an entry joined with `sep`.
fn join_sources(sources: &std::collections::BTreeSet<String>, sep: &str) -> String {
    sources.iter().map(String::as_str).collect::<Vec<_>>().join(sep)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_format_resolves() {
        let options = FormatterOptions::default();
        for (id, description) in FORMATS {
            let formatter = formatter_for(id, &options).unwrap();
            assert_eq!(formatter.id(), *id);
            assert_eq!(formatter.description(), *description);
        }
    }

    #[test]
    fn test_unknown_format() {
        let err = formatter_for("yaml", &FormatterOptions::default()).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownFormat(id) if id == "yaml"));
    }

    #[test]
    fn test_names_are_validated() {
        let options = FormatterOptions {
            set_name: "bad name; flush ruleset".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidName { kind: "set name", .. })
        ));

        let options = FormatterOptions {
            set_name: "a".repeat(MAX_SET_NAME_LEN),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = FormatterOptions {
            table_name: String::new(),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        assert!(FormatterOptions::default().validate().is_ok());
    }
}
