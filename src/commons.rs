// things shared between the front end and the middle end.

use derive_more::Display;
use serde::{Deserialize, Serialize};

// use ordered sets and maps to allow for deterministic outputs.
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

/// A source position: 1-based line and column of the first character of a
/// node.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[display(fmt = "[{}, {}]", line, column)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }

    // computes the line and column of the given byte offset in `code`.
    pub fn of_offset(code: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut line_start = 0;
        for (idx, _) in code.match_indices('\n') {
            if idx >= offset {
                break;
            }
            line += 1;
            line_start = idx + 1;
        }
        Span {
            line,
            column: (code[line_start..offset].chars().count() + 1) as u32,
        }
    }
}
