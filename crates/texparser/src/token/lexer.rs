//! The TeX lexer, which reads characters and outputs tokens.
//!
//! Lexing in TeX is controlled by category codes, which can change at runtime as a result
//! of the tokens the lexer has already produced.
//! For this reason the lexer is "just in time": it produces exactly one token per call to
//! [Lexer::next] and consults the category code function every time it reads a character.
//! Consider the following snippet, assuming default category codes:
//! ```tex
//! \catcode`\A=10 AB
//! ```
//! If it were tokenized as a batch, the lexer would return a letter token for `A`.
//! But by the time `A` is read the `\catcode` assignment has made it a space character,
//! and the correct output is only the letter `B`.
//!
//! The lexer is the three state machine described in chapter 8 of the TeXBook:
//!
//! - [State::LineStart]: at the beginning of a line. Blanks are skipped and an end of line
//!     character produces a `\par` token.
//! - [State::MidLine]: after most tokens. A blank produces a single space token
//!     and an end of line character produces a space token.
//! - [State::SkipBlanks]: after a space or a control word. Blanks are skipped and
//!     an end of line character produces nothing.
//!
//! A comment character discards the rest of the physical line, including the line terminator,
//! and the lexer continues in [State::LineStart].
//! So `a%comment` followed by a newline and `b` produces `ab`.
//! An end of line character discards the rest of its physical line too.
//! This holds even when the character was written with `^^` notation, as in `^^M`.

use crate::token::catcode::{CatCode, CatCodeFn};
use crate::token::trace;
use crate::token::{CsNameInterner, Token, Value};

/// Lexer error.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// A character with category [CatCode::Invalid] was read.
    InvalidCharacter(char, trace::Key),
}

/// State of the lexer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    LineStart,
    MidLine,
    SkipBlanks,
}

/// The lexer for one source.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    keys: trace::KeyRange,
    state: State,
    // Position of the last character produced by `^^` notation.
    caret_pos: Option<usize>,
    // Control sequence names are read into a shared buffer to avoid allocating for each one.
    buffer: String,
}

impl Lexer {
    pub fn new(source_code: &str, keys: trace::KeyRange) -> Lexer {
        Lexer {
            chars: source_code.chars().collect(),
            pos: 0,
            keys,
            state: State::LineStart,
            caret_pos: None,
            buffer: Default::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the trace key for the end of this source.
    pub fn end_key(&self) -> trace::Key {
        self.keys.end()
    }

    /// Returns the next token, or [None] if the source is exhausted.
    pub fn next<F: CatCodeFn>(
        &mut self,
        cat_code_fn: &F,
        cs_name_interner: &mut CsNameInterner,
    ) -> Result<Option<Token>, Error> {
        loop {
            let c = match self.chars.get(self.pos) {
                None => return Ok(None),
                Some(c) => *c,
            };
            let cat_code = cat_code_fn.cat_code(c);
            if cat_code == CatCode::Superscript && self.apply_caret_notation(c) {
                continue;
            }
            let trace_key = self.keys.key(self.pos);
            self.pos += 1;
            let value = match cat_code {
                CatCode::Escape => {
                    let is_control_word = self.read_control_sequence_name(cat_code_fn);
                    self.state = if is_control_word {
                        State::SkipBlanks
                    } else {
                        State::MidLine
                    };
                    let name = cs_name_interner.get_or_intern(&self.buffer);
                    return Ok(Some(Token::new_control_sequence(name, trace_key)));
                }
                CatCode::EndOfLine => {
                    if is_line_terminator(c) && self.caret_pos != Some(self.pos - 1) {
                        self.skip_line_feed_after(c);
                    } else {
                        self.skip_to_next_line();
                    }
                    let previous_state = self.state;
                    self.state = State::LineStart;
                    match previous_state {
                        State::LineStart => {
                            let par = cs_name_interner.get_or_intern("par");
                            return Ok(Some(Token::new_control_sequence(par, trace_key)));
                        }
                        State::MidLine => Value::Space(' '),
                        State::SkipBlanks => continue,
                    }
                }
                CatCode::Space => match self.state {
                    State::MidLine => {
                        self.state = State::SkipBlanks;
                        Value::Space(' ')
                    }
                    State::LineStart | State::SkipBlanks => continue,
                },
                CatCode::Comment => {
                    self.skip_to_next_line();
                    self.state = State::LineStart;
                    continue;
                }
                CatCode::Ignored => continue,
                CatCode::Invalid => return Err(Error::InvalidCharacter(c, trace_key)),
                _ => {
                    self.state = State::MidLine;
                    match Value::try_new(c, cat_code) {
                        None => continue,
                        Some(value) => value,
                    }
                }
            };
            return Ok(Some(Token::new(value, trace_key)));
        }
    }

    /// Reads a control sequence name into the buffer and returns whether it is a control word.
    ///
    /// An escape character at the end of the input produces the empty name.
    fn read_control_sequence_name<F: CatCodeFn>(&mut self, cat_code_fn: &F) -> bool {
        self.buffer.clear();
        let (first, first_cat_code) = loop {
            let c = match self.chars.get(self.pos) {
                None => return false,
                Some(c) => *c,
            };
            let cat_code = cat_code_fn.cat_code(c);
            if cat_code == CatCode::Superscript && self.apply_caret_notation(c) {
                continue;
            }
            break (c, cat_code);
        };
        self.pos += 1;
        self.buffer.push(first);
        if first_cat_code != CatCode::Letter {
            return false;
        }
        while let Some(c) = self.chars.get(self.pos).copied() {
            let cat_code = cat_code_fn.cat_code(c);
            if cat_code == CatCode::Superscript && self.apply_caret_notation(c) {
                continue;
            }
            if cat_code != CatCode::Letter {
                break;
            }
            self.buffer.push(c);
            self.pos += 1;
        }
        true
    }

    /// Discards the rest of the physical line, including its terminator.
    fn skip_to_next_line(&mut self) {
        while let Some(next) = self.chars.get(self.pos).copied() {
            self.pos += 1;
            if is_line_terminator(next) {
                self.skip_line_feed_after(next);
                return;
            }
        }
    }

    /// Treats `\r\n` as a single terminator.
    fn skip_line_feed_after(&mut self, terminator: char) {
        if terminator == '\r' && self.chars.get(self.pos) == Some(&'\n') {
            self.pos += 1;
        }
    }

    /// Applies TeX's `^^` notation at the current position, if present.
    ///
    /// Returns true if the notation was applied, in which case the replacement character
    /// is at the current position and needs to be lexed again.
    ///
    /// Two forms are supported: `^^` followed by two lowercase hexadecimal digits,
    /// and `^^` followed by an ASCII character `c`, which is replaced by the character
    /// with code `c+64` or `c-64`.
    fn apply_caret_notation(&mut self, c: char) -> bool {
        if self.chars.get(self.pos + 1) != Some(&c) {
            return false;
        }
        let third = match self.chars.get(self.pos + 2) {
            // TeX doesn't transform at the end of the input; see the TeXBook section 355.
            None => return false,
            Some(third) => *third,
        };
        if let (Some(high), Some(low)) = (
            lowercase_hex_value(third),
            self.chars.get(self.pos + 3).copied().and_then(lowercase_hex_value),
        ) {
            self.pos += 3;
            self.chars[self.pos] = char::from(high * 16 + low);
            self.caret_pos = Some(self.pos);
            return true;
        }
        if !third.is_ascii() {
            return false;
        }
        let u = third as u8;
        let replacement = if u < 0x40 { u + 0x40 } else { u - 0x40 };
        self.pos += 2;
        self.chars[self.pos] = char::from(replacement);
        self.caret_pos = Some(self.pos);
        true
    }
}

fn is_line_terminator(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn lowercase_hex_value(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'a'..='f' => Some(c as u8 - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::catcode::CatCode::*;
    use std::collections::HashMap;

    enum TokenValue {
        Character(char, CatCode),
        ControlSequence(&'static str),
    }
    use TokenValue::Character;
    use TokenValue::ControlSequence;

    impl TokenValue {
        fn convert(self, interner: &mut CsNameInterner) -> Value {
            match self {
                ControlSequence(name) => {
                    Value::CommandRef(crate::token::CommandRef::ControlSequence(
                        interner.get_or_intern(name),
                    ))
                }
                Character(c, cat_code) => Value::try_new(c, cat_code).unwrap(),
            }
        }
    }

    fn lexer_test(input: &str, expected_tokens: Vec<TokenValue>) {
        let mut lexer = Lexer::new(input, trace::KeyRange::for_testing());
        let mut map: HashMap<char, CatCode> = HashMap::new();
        map.insert('X', EndOfLine);
        map.insert('Y', Space);
        map.insert('Z', Ignored);
        map.insert('!', Invalid);
        let mut interner: CsNameInterner = Default::default();
        let mut actual = Vec::new();
        while let Some(t) = lexer.next(&map, &mut interner).unwrap() {
            actual.push(t.value());
        }
        let expected: Vec<Value> = expected_tokens
            .into_iter()
            .map(|t| t.convert(&mut interner))
            .collect();
        assert_eq!(expected, actual);
    }

    macro_rules! lexer_tests {
        ($( ( $name: ident, $input: expr, $ ( $expected_token : expr, ) * ), )+) => {
            $(
            #[test]
            fn $name() {
                let input = $input;
                let expected_tokens = vec!( $( $expected_token ),* );
                lexer_test(&input, expected_tokens);
            }
            )+
        };
    }

    lexer_tests![
        (
            three_letters,
            "abc",
            Character('a', Letter),
            Character('b', Letter),
            Character('c', Letter),
        ),
        (
            control_word_then_group,
            r"\a{b}",
            ControlSequence("a"),
            Character('{', BeginGroup),
            Character('b', Letter),
            Character('}', EndGroup),
        ),
        (control_word_skips_space, r"\a b", ControlSequence("a"), Character('b', Letter),),
        (
            control_word_skips_spaces,
            "\\a  b",
            ControlSequence("a"),
            Character('b', Letter),
        ),
        (
            control_word_skips_newline,
            "\\a\n b",
            ControlSequence("a"),
            Character('b', Letter),
        ),
        (
            control_word_then_blank_line,
            "\\a\n\nb",
            ControlSequence("a"),
            ControlSequence("par"),
            Character('b', Letter),
        ),
        (multi_letter_control_word, "\\ABC", ControlSequence("ABC"),),
        (
            control_symbol,
            "\\{{",
            ControlSequence("{"),
            Character('{', BeginGroup),
        ),
        (
            control_symbol_does_not_skip_space,
            "\\% b",
            ControlSequence("%"),
            Character(' ', Space),
            Character('b', Letter),
        ),
        (control_word_ends_at_non_letter, "\\A1", ControlSequence("A"), Character('1', Other),),
        (escape_at_end_of_input, "a\\", Character('a', Letter), ControlSequence(""),),
        (
            comment_discards_end_of_line,
            "a%comment\nb",
            Character('a', Letter),
            Character('b', Letter),
        ),
        (
            empty_comment_joins_lines,
            "a%\nb",
            Character('a', Letter),
            Character('b', Letter),
        ),
        (
            comment_then_indented_line,
            "}%\n   x",
            Character('}', EndGroup),
            Character('x', Letter),
        ),
        (
            comment_with_crlf,
            "a%\r\n  b",
            Character('a', Letter),
            Character('b', Letter),
        ),
        (
            comment_then_blank_line_creates_par,
            "a%\n\nb",
            Character('a', Letter),
            ControlSequence("par"),
            Character('b', Letter),
        ),
        (comment_at_line_start, "%comment\nb", Character('b', Letter),),
        (
            comment_line_between_lines,
            "a\n%comment\nb",
            Character('a', Letter),
            Character(' ', Space),
            Character('b', Letter),
        ),
        (
            comment_after_control_word,
            "\\A %\nB",
            ControlSequence("A"),
            Character('B', Letter),
        ),
        (comment_at_end_of_input, "A%a comment here", Character('A', Letter),),
        (
            double_space_creates_one_space,
            "A  B",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
        ),
        (
            single_newline_creates_one_space,
            "A\nB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
        ),
        (
            space_and_newline_creates_space,
            "A \nB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
        ),
        (
            double_newline_creates_par,
            "A\n\nB",
            Character('A', Letter),
            Character(' ', Space),
            ControlSequence("par"),
            Character('B', Letter),
        ),
        (
            newline_space_newline_creates_par,
            "A\n \nB",
            Character('A', Letter),
            Character(' ', Space),
            ControlSequence("par"),
            Character('B', Letter),
        ),
        (
            crlf_is_one_end_of_line,
            "A\r\nB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
        ),
        (
            leading_spaces_skipped,
            "  A",
            Character('A', Letter),
        ),
        (
            non_standard_space_character,
            "AYB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
        ),
        (
            non_standard_end_of_line_discards_rest_of_line,
            "AXB\nC",
            Character('A', Letter),
            Character(' ', Space),
            Character('C', Letter),
        ),
        (single_ignored_character, "Z",),
        (
            parameter_token,
            "#1",
            Character('#', Parameter),
            Character('1', Other),
        ),
        (active_character, "~", Character('~', Active),),
        (double_superscript_1, "^^k", Character('+', Other),),
        (double_superscript_2, "^^+", Character('k', Letter),),
        (double_superscript_hex, "^^41", Character('A', Letter),),
        (
            double_superscript_uppercase_is_not_hex,
            "^^4A",
            Character('t', Letter),
            Character('A', Letter),
        ),
        (
            double_superscript_end_of_input,
            "^^",
            Character('^', Superscript),
            Character('^', Superscript),
        ),
        (
            double_superscript_end_of_line_discards_rest_of_line,
            "a^^Mb c\nd",
            Character('a', Letter),
            Character(' ', Space),
            Character('d', Letter),
        ),
        (double_superscript_cs_1, "\\^^m", ControlSequence("-"),),
        (double_superscript_cs_2, "\\^^-a", ControlSequence("ma"),),
        (double_superscript_cs_3, "\\a^^-", ControlSequence("am"),),
        (
            single_superscript_in_cs,
            "\\a^a",
            ControlSequence("a"),
            Character('^', Superscript),
            Character('a', Letter),
        ),
    ];

    #[test]
    fn invalid_character() {
        let mut lexer = Lexer::new("a!", trace::KeyRange::for_testing());
        let map: HashMap<char, CatCode> = [('!', Invalid)].into_iter().collect();
        let mut interner: CsNameInterner = Default::default();
        assert!(lexer.next(&map, &mut interner).unwrap().is_some());
        assert_eq!(
            lexer.next(&map, &mut interner),
            Err(Error::InvalidCharacter('!', trace::KeyRange::for_testing().key(1)))
        );
    }

    #[test]
    fn cat_code_change_affects_unread_characters() {
        let mut lexer = Lexer::new("ab", trace::KeyRange::for_testing());
        let mut map: HashMap<char, CatCode> = HashMap::new();
        let mut interner: CsNameInterner = Default::default();
        assert_eq!(
            lexer.next(&map, &mut interner).unwrap().map(|t| t.value()),
            Some(Value::Letter('a'))
        );
        map.insert('b', Other);
        assert_eq!(
            lexer.next(&map, &mut interner).unwrap().map(|t| t.value()),
            Some(Value::Other('b'))
        );
    }
}
