use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Serialize)]
pub struct SourceLocation {
    pub line: u32,
    pub col: u32,
    pub offset: usize,
}

impl SourceLocation {
    pub fn start() -> SourceLocation {
        SourceLocation {
            line: 1,
            col: 1,
            offset: 0,
        }
    }
}

/// A region of source text. `end` points just past the last character.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn single(loc: SourceLocation) -> SourceSpan {
        SourceSpan {
            start: loc,
            end: loc,
        }
    }

    pub fn extend(&self, other: &SourceSpan) -> SourceSpan {
        debug_assert!(self.start <= other.start);
        debug_assert!(self.end <= other.end);

        SourceSpan {
            start: self.start,
            end: other.end,
        }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source
            .get(self.start.offset..self.end.offset)
            .unwrap_or_default()
    }
}
