//! Code-point indexed view of a script.
//!
//! Every position handed around by the tokenizer, the parser and the diagnostics layer is an
//! index into [`Source`]'s code points, never a byte offset. Line breaks of any flavour
//! (`\r\n`, `\r`, `\n`) are normalized to a single `'\n'` at construction.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use miette::NamedSource;

/// One-based line and column, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Immutable script text stored as code points, plus the start position of each line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    raw_lines: Vec<String>,
    code_points: Vec<char>,
    line_starts: Vec<usize>,
}

impl Source {
    /// Creates a source from a string, splitting on `\r\n`, `\r` and `\n`.
    pub fn of(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    lines.push(std::mem::take(&mut current));
                }
                '\n' => lines.push(std::mem::take(&mut current)),
                c => current.push(c),
            }
        }
        lines.push(current);
        Self::from_lines(lines)
    }

    /// Creates a source from already split lines. Lines must not contain line breaks.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw_lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let mut code_points = Vec::new();
        let mut line_starts = Vec::with_capacity(raw_lines.len().max(1));
        for (i, line) in raw_lines.iter().enumerate() {
            if i != 0 {
                code_points.push('\n');
            }
            line_starts.push(code_points.len());
            code_points.extend(line.chars());
        }
        if line_starts.is_empty() {
            line_starts.push(0);
        }
        Self {
            raw_lines,
            code_points,
            line_starts,
        }
    }

    /// Reads the whole reader into a source.
    pub fn read(mut reader: impl Read) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::of(&text))
    }

    pub fn raw_lines(&self) -> &[String] {
        &self.raw_lines
    }

    pub fn total_length(&self) -> usize {
        self.code_points.len()
    }

    pub fn total_lines(&self) -> usize {
        self.line_starts.len()
    }

    /// Code point at `position`, or `None` past the end of the source.
    pub fn code_point_at(&self, position: usize) -> Option<char> {
        self.code_points.get(position).copied()
    }

    /// Code points from `position` to the end; empty past the end.
    pub fn code_points_from(&self, position: usize) -> &[char] {
        self.code_points.get(position..).unwrap_or(&[])
    }

    pub fn is_in_bounds(&self, position: usize) -> bool {
        position < self.code_points.len()
    }

    /// Zero-based index of the line containing `position`. Saturates to the last line.
    pub fn line_at(&self, position: usize) -> usize {
        match self.line_starts.binary_search(&position) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        }
    }

    /// Position of the first code point of `line`; aligned with the line break if the line is
    /// empty.
    ///
    /// # Panics
    /// If `line >= total_lines()`.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts[line]
    }

    /// Position of the line break ending `line`, or [`Source::total_length`] for the last line.
    ///
    /// # Panics
    /// If `line >= total_lines()`.
    pub fn line_end(&self, line: usize) -> usize {
        if line + 1 == self.line_starts.len() {
            self.total_length()
        } else {
            self.line_starts[line + 1] - 1
        }
    }

    /// Length of `line` in code points, line break excluded.
    pub fn line_size(&self, line: usize) -> usize {
        self.line_end(line) - self.line_start(line)
    }

    pub fn line_column(&self, position: usize) -> LineColumn {
        let line = self.line_at(position);
        LineColumn {
            line: line + 1,
            column: position - self.line_start(line) + 1,
        }
    }

    /// Renders the line around `position`, marking the position itself.
    ///
    /// Long lines are windowed to 50 code points, starting at most 30 before `position`.
    pub fn line_snippet(&self, position: usize) -> String {
        let line = self.line_at(position);
        let mut start = self.line_start(line);
        let mut size = self.line_size(line);
        if size > 50 {
            start = start.max(position.saturating_sub(30));
            size = 50;
        }

        let mut snippet = String::new();
        let mut i = 0;
        while i < size {
            let Some(c) = self.code_point_at(start + i) else {
                break;
            };
            if start + i == position {
                snippet.push_str("/* HERE >>> */");
            }
            if c != '\r' && c != '\n' {
                snippet.push(c);
            }
            i += 1;
        }
        if start + i <= position {
            snippet.push_str("  // <<< HERE");
        }
        snippet
    }

    /// UTF-8 byte offset of the code point at `position`, clamped to the end of the text.
    pub fn byte_offset(&self, position: usize) -> usize {
        self.code_points[..position.min(self.code_points.len())]
            .iter()
            .map(|c| c.len_utf8())
            .sum()
    }

    /// UTF-8 byte length of the code point at `position`; zero past the end.
    pub fn byte_len_at(&self, position: usize) -> usize {
        self.code_point_at(position).map_or(0, char::len_utf8)
    }

    /// The normalized text, lines joined with `'\n'`.
    pub fn text(&self) -> String {
        self.code_points.iter().collect()
    }

    pub fn to_named_source(&self, name: impl AsRef<str>) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(name, self.text()))
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Self::of(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_line_breaks() {
        let source = Source::of("a\r\nbc\rd\n");
        assert_eq!(source.total_lines(), 4);
        assert_eq!(source.text(), "a\nbc\nd\n");
        assert_eq!(source.line_start(1), 2);
        assert_eq!(source.line_end(1), 4);
        assert_eq!(source.line_size(3), 0);
    }

    #[test]
    fn line_column_is_one_based() {
        let source = Source::of("ab\ncd");
        assert_eq!(source.line_column(0), LineColumn { line: 1, column: 1 });
        assert_eq!(source.line_column(4), LineColumn { line: 2, column: 2 });
        assert_eq!(source.line_column(100).line, 2);
        assert_eq!(source.code_point_at(5), None);
    }

    #[test]
    fn snippet_marks_position() {
        let source = Source::of("key: value");
        assert_eq!(source.line_snippet(5), "key: /* HERE >>> */value");
        assert_eq!(source.line_snippet(10), "key: value  // <<< HERE");
    }

    #[test]
    fn byte_offsets_follow_utf8_width() {
        let source = Source::of("é=1");
        assert_eq!(source.byte_offset(1), 2);
        assert_eq!(source.byte_len_at(0), 2);
    }
}
