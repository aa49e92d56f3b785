//! Tokens and related types.
//!
//! A [Token] is either a character token, which carries the character and the
//! category it had when it was lexed, or a reference to a command.
//! Tokens are small and [Copy].

pub mod catcode;
pub mod lexer;
pub mod trace;

use catcode::CatCode;
use string_interner::{DefaultStringInterner, DefaultSymbol, Symbol};

/// Interned name of a control sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsName(DefaultSymbol);

impl CsName {
    #[inline]
    pub fn to_usize(&self) -> usize {
        self.0.to_usize()
    }
}

/// Interner for control sequence names.
#[derive(Default)]
pub struct CsNameInterner {
    interner: DefaultStringInterner,
}

impl CsNameInterner {
    pub fn get_or_intern(&mut self, name: &str) -> CsName {
        CsName(self.interner.get_or_intern(name))
    }

    /// Returns the interned name, if it has been interned.
    pub fn get(&self, name: &str) -> Option<CsName> {
        self.interner.get(name).map(CsName)
    }

    pub fn resolve(&self, cs_name: CsName) -> Option<&str> {
        self.interner.resolve(cs_name.0)
    }
}

/// Reference to a command: a control sequence or an active character.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandRef {
    ControlSequence(CsName),
    ActiveCharacter(char),
}

impl CommandRef {
    /// Writes the reference the way it appears in source, using `\` as the escape character.
    pub fn to_string(&self, interner: &CsNameInterner) -> String {
        match self {
            CommandRef::ControlSequence(cs_name) => {
                format!("\\{}", interner.resolve(*cs_name).unwrap_or("<unknown>"))
            }
            CommandRef::ActiveCharacter(c) => c.to_string(),
        }
    }
}

/// Value of a token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    BeginGroup(char),
    EndGroup(char),
    MathShift(char),
    AlignmentTab(char),
    Parameter(char),
    Superscript(char),
    Subscript(char),
    Space(char),
    Letter(char),
    Other(char),
    CommandRef(CommandRef),
}

impl Value {
    /// Builds the value for a character of the given category.
    ///
    /// Returns [None] for categories that never produce a token on their own.
    pub fn try_new(c: char, cat_code: CatCode) -> Option<Value> {
        use CatCode::*;
        Some(match cat_code {
            BeginGroup => Value::BeginGroup(c),
            EndGroup => Value::EndGroup(c),
            MathShift => Value::MathShift(c),
            AlignmentTab => Value::AlignmentTab(c),
            Parameter => Value::Parameter(c),
            Superscript => Value::Superscript(c),
            Subscript => Value::Subscript(c),
            Space => Value::Space(c),
            Letter => Value::Letter(c),
            Other => Value::Other(c),
            Active => Value::CommandRef(CommandRef::ActiveCharacter(c)),
            Escape | EndOfLine | Ignored | Comment | Invalid => return None,
        })
    }

    /// Returns the character of a character token, or of an active character.
    pub fn char(&self) -> Option<char> {
        match *self {
            Value::BeginGroup(c)
            | Value::EndGroup(c)
            | Value::MathShift(c)
            | Value::AlignmentTab(c)
            | Value::Parameter(c)
            | Value::Superscript(c)
            | Value::Subscript(c)
            | Value::Space(c)
            | Value::Letter(c)
            | Value::Other(c)
            | Value::CommandRef(CommandRef::ActiveCharacter(c)) => Some(c),
            Value::CommandRef(CommandRef::ControlSequence(_)) => None,
        }
    }

    /// Returns the category of a character token.
    ///
    /// Active characters report [CatCode::Active]; control sequences have no category.
    pub fn cat_code(&self) -> Option<CatCode> {
        Some(match self {
            Value::BeginGroup(_) => CatCode::BeginGroup,
            Value::EndGroup(_) => CatCode::EndGroup,
            Value::MathShift(_) => CatCode::MathShift,
            Value::AlignmentTab(_) => CatCode::AlignmentTab,
            Value::Parameter(_) => CatCode::Parameter,
            Value::Superscript(_) => CatCode::Superscript,
            Value::Subscript(_) => CatCode::Subscript,
            Value::Space(_) => CatCode::Space,
            Value::Letter(_) => CatCode::Letter,
            Value::Other(_) => CatCode::Other,
            Value::CommandRef(CommandRef::ActiveCharacter(_)) => CatCode::Active,
            Value::CommandRef(CommandRef::ControlSequence(_)) => return None,
        })
    }
}

/// A TeX token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    value: Value,
    trace_key: trace::Key,
}

macro_rules! token_constructor {
    ($name: ident, $value: expr) => {
        #[inline]
        pub fn $name(c: char, trace_key: trace::Key) -> Token {
            Token {
                value: $value(c),
                trace_key,
            }
        }
    };
}

impl Token {
    token_constructor!(new_begin_group, Value::BeginGroup);
    token_constructor!(new_end_group, Value::EndGroup);
    token_constructor!(new_math_shift, Value::MathShift);
    token_constructor!(new_alignment_tab, Value::AlignmentTab);
    token_constructor!(new_parameter, Value::Parameter);
    token_constructor!(new_superscript, Value::Superscript);
    token_constructor!(new_subscript, Value::Subscript);
    token_constructor!(new_space, Value::Space);
    token_constructor!(new_letter, Value::Letter);
    token_constructor!(new_other, Value::Other);

    #[inline]
    pub fn new_active_character(c: char, trace_key: trace::Key) -> Token {
        Token::new(Value::CommandRef(CommandRef::ActiveCharacter(c)), trace_key)
    }

    #[inline]
    pub fn new_control_sequence(name: CsName, trace_key: trace::Key) -> Token {
        Token::new(Value::CommandRef(CommandRef::ControlSequence(name)), trace_key)
    }

    #[inline]
    pub fn new(value: Value, trace_key: trace::Key) -> Token {
        Token { value, trace_key }
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn trace_key(&self) -> trace::Key {
        self.trace_key
    }

    #[inline]
    pub fn char(&self) -> Option<char> {
        self.value.char()
    }

    #[inline]
    pub fn cat_code(&self) -> Option<CatCode> {
        self.value.cat_code()
    }

    /// Returns true if the token is a control sequence or an active character.
    #[inline]
    pub fn is_command_ref(&self) -> bool {
        matches!(self.value, Value::CommandRef(_))
    }

    /// Returns the text of the token as it would appear in source.
    pub fn text(&self, interner: &CsNameInterner) -> String {
        match self.value {
            Value::CommandRef(command_ref) => command_ref.to_string(interner),
            _ => self.char().map(String::from).unwrap_or_default(),
        }
    }
}

/// Returns true if the name is a control word rather than a control symbol.
///
/// The lexer only produces multi-character names from letters, so any name that is
/// not a single non-letter character is treated as a word.
pub fn is_control_word(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_alphabetic(),
        (None, _) => false,
        (Some(_), Some(_)) => true,
    }
}

/// Writes tokens as text.
///
/// Runs of spaces are written as a single space and a control word is followed by a space
/// when the next token is a letter, so that the text lexes back to the same tokens.
/// Each `\par` is written as one more line break, so a blank line gives back one `\par`
/// and two blank lines give back two.
/// A `\par` that directly follows a character is written after a `%` so that
/// no space is lexed before it.
pub struct Writer<W: std::fmt::Write> {
    out: W,
    pending_space: bool,
    pending_pars: usize,
    line: LineState,
}

// Lexer state that the text written so far leaves behind.
#[derive(PartialEq, Eq)]
enum LineState {
    Start,
    Middle,
    AfterControlWord,
}

impl<W: std::fmt::Write> Writer<W> {
    pub fn new(out: W) -> Self {
        Writer {
            out,
            pending_space: false,
            pending_pars: 0,
            line: LineState::Start,
        }
    }

    pub fn write(&mut self, interner: &CsNameInterner, token: &Token) -> std::fmt::Result {
        match token.value() {
            Value::Space(_) => {
                if self.pending_pars == 0 {
                    self.pending_space = true;
                }
                return Ok(());
            }
            Value::CommandRef(CommandRef::ControlSequence(cs_name))
                if interner.resolve(cs_name) == Some("par") =>
            {
                self.pending_pars += 1;
                return Ok(());
            }
            _ => {}
        }
        self.flush()?;
        match token.value() {
            Value::CommandRef(CommandRef::ControlSequence(cs_name)) => {
                let name = interner.resolve(cs_name).unwrap_or("<unknown>");
                write!(self.out, "\\{name}")?;
                self.line = if is_control_word(name) {
                    LineState::AfterControlWord
                } else {
                    LineState::Middle
                };
            }
            value => {
                let c = value.char().unwrap_or_default();
                if self.line == LineState::AfterControlWord && matches!(value, Value::Letter(_)) {
                    self.out.write_char(' ')?;
                }
                self.out.write_char(c)?;
                self.line = LineState::Middle;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> std::fmt::Result {
        if self.pending_pars > 0 {
            match self.line {
                LineState::Start => {}
                LineState::Middle if !self.pending_space => self.out.write_str("%\n")?,
                LineState::Middle | LineState::AfterControlWord => self.out.write_char('\n')?,
            }
            for _ in 0..self.pending_pars {
                self.out.write_char('\n')?;
            }
            self.line = LineState::Start;
        } else if self.pending_space {
            self.out.write_char(' ')?;
            self.line = LineState::Middle;
        }
        self.pending_space = false;
        self.pending_pars = 0;
        Ok(())
    }

    /// Writes any pending whitespace and returns the output.
    pub fn finish(mut self) -> Result<W, std::fmt::Error> {
        self.flush()?;
        Ok(self.out)
    }
}

/// Writes the tokens to a string.
pub fn write_tokens<'a, T>(tokens: T, interner: &CsNameInterner) -> String
where
    T: IntoIterator<Item = &'a Token>,
{
    let mut writer = Writer::new(String::new());
    for token in tokens {
        // Writing to a String cannot fail.
        let _ = writer.write(interner, token);
    }
    writer.finish().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_size() {
        assert!(std::mem::size_of::<Token>() <= 16);
    }

    #[test]
    fn write_tokens_canonicalizes_whitespace() {
        let mut interner = CsNameInterner::default();
        let key = trace::Key::dummy();
        let par = interner.get_or_intern("par");
        let foo = interner.get_or_intern("foo");
        let tokens = vec![
            Token::new_letter('a', key),
            Token::new_space(' ', key),
            Token::new_space('\n', key),
            Token::new_control_sequence(foo, key),
            Token::new_letter('b', key),
            Token::new_control_sequence(par, key),
            Token::new_other('1', key),
        ];
        assert_eq!(write_tokens(&tokens, &interner), "a \\foo b%\n\n1");
    }

    fn lex(input: &str, interner: &mut CsNameInterner) -> Vec<Token> {
        let mut lexer = lexer::Lexer::new(input, trace::KeyRange::for_testing());
        let cat_codes = catcode::CatCodeTable::default();
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next(&cat_codes, interner).unwrap() {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn write_tokens_round_trips_through_lexer() {
        for input in [
            "a\n\nb\n\n\nc",
            "\n\n\nstart",
            "a%comment\n\nb",
            "a%\n\n\n\nb",
            "\\foo\n\n\n\\%x \\bar y",
            "\\par\\par a\\par\n\nb",
            "a \\ b\\{c\\}  d\n",
            "{a}\n\n  {b}\n",
        ] {
            let mut interner = CsNameInterner::default();
            let tokens = lex(input, &mut interner);
            let written = write_tokens(&tokens, &interner);
            let relexed = lex(&written, &mut interner);
            let want: Vec<Value> = tokens.iter().map(Token::value).collect();
            let got: Vec<Value> = relexed.iter().map(Token::value).collect();
            assert_eq!(got, want, "input {input:?} was written as {written:?}");
        }
    }

    #[test]
    fn control_symbol_is_not_followed_by_space() {
        let mut interner = CsNameInterner::default();
        let key = trace::Key::dummy();
        let percent = interner.get_or_intern("%");
        let tokens = vec![
            Token::new_control_sequence(percent, key),
            Token::new_letter('b', key),
        ];
        assert_eq!(write_tokens(&tokens, &interner), "\\%b");
    }

    #[test]
    fn value_round_trips_through_cat_code() {
        for cat_code in [
            CatCode::BeginGroup,
            CatCode::EndGroup,
            CatCode::MathShift,
            CatCode::Letter,
            CatCode::Other,
            CatCode::Active,
        ] {
            let value = Value::try_new('x', cat_code).unwrap();
            assert_eq!(value.cat_code(), Some(cat_code));
        }
        assert_eq!(Value::try_new('x', CatCode::Comment), None);
    }
}
