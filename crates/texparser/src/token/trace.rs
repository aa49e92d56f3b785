//! Mapping tokens back to where they came from in the source code.
//!
//! Storing a full position on every token would triple the size of a token.
//! Instead each character of each registered source gets a unique [Key],
//! and a token only stores the key of the character it was lexed from.
//! The [Tracer] keeps the registered sources and turns keys back into
//! line, column and byte offset when an error needs them.

/// Key identifying a character in a registered source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u32);

impl Key {
    /// Key that does not point at any source.
    pub fn dummy() -> Key {
        Key(u32::MAX)
    }
}

/// The keys allocated to one source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyRange {
    start: u32,
    len: u32,
}

impl KeyRange {
    /// Returns the key of the character at the given char offset.
    ///
    /// Offsets past the end of the source map to the end of input key.
    #[inline]
    pub fn key(&self, offset: usize) -> Key {
        let offset = u32::try_from(offset).unwrap_or(u32::MAX).min(self.len - 1);
        Key(self.start + offset)
    }

    /// Returns the key pointing just past the last character.
    pub fn end(&self) -> Key {
        Key(self.start + self.len - 1)
    }

    pub fn for_testing() -> KeyRange {
        KeyRange {
            start: 0,
            len: u32::MAX,
        }
    }
}

/// Human readable location in a source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// 0-based byte offset from the start of the source.
    pub byte_offset: usize,
}

/// Everything needed to point at a token in an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCodeTrace {
    /// Name of the source, usually a file name.
    pub origin: String,
    /// The full line containing the token, without the line terminator.
    pub line_content: String,
    pub position: Position,
    /// Text of the token.
    pub value: String,
}

struct Source {
    origin: String,
    content: String,
    range: KeyRange,
}

/// Registry of sources used to resolve trace keys.
#[derive(Default)]
pub struct Tracer {
    sources: Vec<Source>,
    next_key: u32,
}

impl Tracer {
    /// Registers a source and returns the keys allocated to its characters.
    ///
    /// One extra key is allocated for the end of the source.
    pub fn register_source(&mut self, origin: &str, content: &str) -> KeyRange {
        let num_chars = u32::try_from(content.chars().count()).unwrap_or(u32::MAX - 1);
        let range = KeyRange {
            start: self.next_key,
            len: num_chars.saturating_add(1),
        };
        self.next_key = self.next_key.saturating_add(range.len);
        self.sources.push(Source {
            origin: origin.to_string(),
            content: content.to_string(),
            range,
        });
        range
    }

    /// Resolves the key.
    ///
    /// The value is the text of the thing being pointed at and is copied into the trace.
    pub fn trace(&self, key: Key, value: String) -> SourceCodeTrace {
        let i = self.sources.partition_point(|s| s.range.start <= key.0);
        let source = match i.checked_sub(1).and_then(|i| self.sources.get(i)) {
            Some(source) if key.0 - source.range.start < source.range.len => source,
            _ => {
                return SourceCodeTrace {
                    origin: "<unknown>".to_string(),
                    line_content: String::new(),
                    position: Position::default(),
                    value,
                }
            }
        };
        let (position, line_content) =
            locate(&source.content, (key.0 - source.range.start) as usize);
        SourceCodeTrace {
            origin: source.origin.clone(),
            line_content,
            position,
            value,
        }
    }
}

fn locate(content: &str, char_offset: usize) -> (Position, String) {
    let mut line = 1;
    let mut line_start = 0;
    let mut column = 1;
    let mut byte_offset = content.len();
    for (i, (b, c)) in content.char_indices().enumerate() {
        if i == char_offset {
            byte_offset = b;
            break;
        }
        if c == '\n' {
            line += 1;
            line_start = b + 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    let line_end = content[line_start..]
        .find('\n')
        .map(|n| line_start + n)
        .unwrap_or(content.len());
    let line_content = content[line_start..line_end].trim_end_matches('\r');
    (
        Position {
            line,
            column,
            byte_offset,
        },
        line_content.to_string(),
    )
}
