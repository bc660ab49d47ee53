//! The `_order.txt` listing written next to every extracted sub-archive.
//!
//! One line per file table entry: the name of the extracted file, or the
//! literal `skip` for an empty slot. Together they preserve the exact shape
//! of the original entry table.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Line used for an empty file table slot
pub const SKIP_MARKER: &str = "skip";

/// One line of an order file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderEntry {
    Skip,
    File(String),
}

impl fmt::Display for OrderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEntry::Skip => f.write_str(SKIP_MARKER),
            OrderEntry::File(name) => f.write_str(name),
        }
    }
}

impl FromStr for OrderEntry {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim() {
            "" => Err(Error::CustomError("empty order line".into())),
            SKIP_MARKER => Ok(OrderEntry::Skip),
            name => Ok(OrderEntry::File(name.to_string())),
        }
    }
}

/// Render entries as the contents of an order file
pub fn render(entries: &[OrderEntry]) -> String {
    entries.iter().map(|e| format!("{e}\n")).collect()
}

/// Parse the contents of an order file, blank lines are ignored
pub fn parse(contents: &str) -> Vec<OrderEntry> {
    contents
        .lines()
        .filter_map(|line| line.parse().ok())
        .collect()
}
