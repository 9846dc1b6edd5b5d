/*!
# Read name parser
Extracts tile, x and y from Illumina style read names.
*/

use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flowcell coordinates parsed from a read name
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParsedReadName {
    pub tile: i16,
    pub x: i32,
    pub y: i32
}

/// Extracts tile, x and y from Illumina style read names.
/// Both the 5 field (`HWUSI-EAS100R:6:73:941:1973`) and the 7 field
/// (`M00123:8:000000000-A1B2C:1:1101:15589:1331`) layouts carry them in the last three `:` fields.
#[derive(Debug, Default)]
pub struct ReadNameParser {
    /// Set after the first unparsable name is reported
    warned: AtomicBool
}

impl ReadNameParser {
    /// Constructor
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a read name, returning None if it does not have the expected layout.
    /// Only the first failure is logged.
    pub fn parse(&self, read_name: &str) -> Option<ParsedReadName> {
        let parsed = parse_fields(read_name);
        if parsed.is_none() && !self.warned.swap(true, Ordering::Relaxed) {
            warn!("Could not parse tile and coordinates from read name {read_name:?}, optical duplicates will not be detected for such reads. This warning is only shown once.");
        }
        parsed
    }
}

fn parse_fields(read_name: &str) -> Option<ParsedReadName> {
    let fields: Vec<&str> = read_name.split(':').collect();
    if fields.len() != 5 && fields.len() != 7 {
        return None;
    }

    let n = fields.len();
    Some(ParsedReadName {
        tile: fields[n - 3].parse().ok()?,
        x: fields[n - 2].parse().ok()?,
        y: fields[n - 1].parse().ok()?
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let parser = ReadNameParser::new();
        assert_eq!(
            parser.parse("HWUSI-EAS100R:6:73:941:1973"),
            Some(ParsedReadName { tile: 73, x: 941, y: 1973 })
        );
        assert_eq!(
            parser.parse("M00123:8:000000000-A1B2C:1:1101:15589:1331"),
            Some(ParsedReadName { tile: 1101, x: 15589, y: 1331 })
        );
    }

    #[test]
    fn test_unparsable() {
        let parser = ReadNameParser::new();
        assert_eq!(parser.parse("read1"), None);
        assert_eq!(parser.parse("a:b:c:d:e:f"), None);
        assert_eq!(parser.parse("A:1:x:941:1973"), None);
        // tile does not fit in an i16
        assert_eq!(parser.parse("A:1:99999:941:1973"), None);
        assert!(parser.warned.load(Ordering::Relaxed));
    }
}
