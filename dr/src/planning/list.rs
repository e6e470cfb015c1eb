//! List reply parsing

use regex::Regex;
use tracing::debug;

/// Leading ordinal or bullet: `1.`, `1)`, `(1)`, `-`, `*`, `•`
const MARKER: &str = r"^\s*(?:\(\d+\)|\d+[.)]|[-*•])\s+(.*?)\s*$";

/// Extracts items from a model's numbered or bulleted list reply
pub struct ListParser {
    marker: Regex,
}

impl ListParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            marker: Regex::new(MARKER)?,
        })
    }

    /// Items of `text`, markers stripped, in order
    ///
    /// When any line carries a marker, only marked lines count, so a
    /// preamble such as "Here are the questions:" is dropped. A reply with
    /// no markers at all is taken one non-blank line per item.
    pub fn parse(&self, text: &str) -> Vec<String> {
        let marked: Vec<String> = text
            .lines()
            .filter_map(|line| self.marker.captures(line))
            .map(|c| c[1].to_string())
            .filter(|item| !item.is_empty())
            .collect();

        if !marked.is_empty() {
            debug!(count = marked.len(), "ListParser::parse: marked items");
            return marked;
        }

        let plain: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = plain.len(), "ListParser::parse: unmarked lines");
        plain
    }
}
