//! Parser for the descriptor's task listing.
//!
//! The listing is one task name per line. The first line is the tool's own
//! banner and is always dropped, whatever it contains.

use crate::task::TaskIdentifier;

/// Lazily parse `stdout` into task identifiers.
///
/// Blank and whitespace-only lines are skipped. Leading whitespace is
/// trimmed; the rest of the line is the identifier. The returned iterator
/// borrows `stdout` and can be cloned to restart parsing.
pub fn parse(stdout: &str) -> Tasks<'_> {
    let mut lines = stdout.split('\n');
    lines.next();
    Tasks { lines }
}

#[derive(Debug, Clone)]
pub struct Tasks<'a> {
    lines: std::str::Split<'a, char>,
}

impl Iterator for Tasks<'_> {
    type Item = TaskIdentifier;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let name = line.trim_start();
            if !name.is_empty() {
                return Some(TaskIdentifier::new(name));
            }
        }
        None
    }
}
