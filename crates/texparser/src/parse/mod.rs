//! Logic for parsing elements of the TeX grammar from token streams.
//!
//! This module is based around the [Parsable] trait.
//! The trait is implemented by Rust types that correspond to elements of the TeX grammar,
//! and provides a way to parse those elements out of the input stream.
//!
//! [Parsable] is implemented for tuples where each element is parsable.
//! This allows expressions like `<integer><relation><integer>` to be parsed by one invocation
//!     of [Parsable::parse], in this case on the type `(i32, std::cmp::Ordering, i32)`.
//!
//! The module also contains functions for reading braced groups of tokens.

#[macro_use]
mod helpers;

mod keyword;
mod number;
mod relation;

pub use keyword::OptionalBy;

use crate::engine::{EngineState, ExpandedStream, TokenStream};
use crate::error;
use crate::prelude as txl;
use crate::token;
use crate::token::{Token, Value};

/// Implementations of this trait are elements of the TeX grammar than can be parsed from a stream of tokens.
pub trait Parsable<S: EngineState>: Sized {
    /// Parses a value from an input stream.
    ///
    /// This method just delegates to [Parsable::parse_impl].
    #[inline]
    fn parse<I>(input: &mut I) -> txl::Result<Self>
    where
        I: AsMut<ExpandedStream<S>>,
    {
        Parsable::parse_impl(input.as_mut())
    }

    /// Parses a value from the [ExpandedStream].
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self>;
}

macro_rules! generate_tuple_impls {
    ( $first: ident ) => {};
    ( $first: ident, $( $name: ident ),+ ) => {
        generate_tuple_impls![ $( $name ),+];

        impl<S: EngineState, $first : Parsable<S>, $( $name : Parsable<S> ),+> Parsable<S> for ($first, $( $name ),+) {
            fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
                Ok(($first::parse(input)?, $( $name::parse(input)? ),+))
            }
        }
    };
}

generate_tuple_impls![T1, T2, T3, T4, T5];

/// A control sequence or active character, read without expansion.
///
/// Leading spaces are skipped.
impl<S: EngineState> Parsable<S> for token::CommandRef {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        let (_, command_ref) = parse_command_ref(input.unexpanded())?;
        Ok(command_ref)
    }
}

/// Reads a control sequence or active character and returns it along with its token.
pub fn parse_command_ref<T: TokenStream>(stream: &mut T) -> txl::Result<(Token, token::CommandRef)> {
    skip_spaces(stream)?;
    let token = stream.next_or_else(|| {
        error::EndOfInputError::new("reading a control sequence")
            .with_note("a control sequence like \\foo or an active character like ~ was expected")
    })?;
    match token.value() {
        Value::CommandRef(command_ref) => Ok((token, command_ref)),
        _ => Err(stream.error(
            error::SimpleTokenError::new(
                token,
                format!(
                    "expected a control sequence, found {}",
                    describe(token, stream.engine().cs_name_interner())
                ),
            )
            .with_note("a control sequence like \\foo or an active character like ~ was expected"),
        )),
    }
}

/// When parsed, this type consumes an optional equals sign from the token stream.
///
/// Spaces before the equals sign, and at most one space after it, are also consumed.
pub struct OptionalEquals;

impl<S: EngineState> Parsable<S> for OptionalEquals {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        parse_optional_equals(input)?;
        Ok(OptionalEquals)
    }
}

/// Like [OptionalEquals] but without performing expansion.
///
/// This is the form `\let` uses.
pub struct OptionalEqualsUnexpanded;

impl<S: EngineState> Parsable<S> for OptionalEqualsUnexpanded {
    fn parse_impl(input: &mut ExpandedStream<S>) -> txl::Result<Self> {
        parse_optional_equals(input.unexpanded())?;
        Ok(OptionalEqualsUnexpanded)
    }
}

fn parse_optional_equals<T: TokenStream>(input: &mut T) -> txl::Result<()> {
    skip_spaces(input)?;
    if get_optional_element![input, Value::Other('=') => (),].is_some() {
        get_optional_element![input, Value::Space(_) => (),];
    }
    Ok(())
}

/// Consumes space tokens from the front of the stream.
pub fn skip_spaces<T: TokenStream>(stream: &mut T) -> txl::Result<()> {
    while get_optional_element![stream, Value::Space(_) => (),].is_some() {}
    Ok(())
}

/// Reads the rest of a balanced group into the result.
///
/// This must be called after the opening begin group token has been read.
/// Every token up to and including the matching end group token is pushed to the result.
/// If the input ends first, the error built by the function is returned.
pub fn finish_balanced_group<T, E, F>(
    stream: &mut T,
    result: &mut Vec<Token>,
    err: F,
) -> txl::Result<()>
where
    T: TokenStream,
    E: error::TexError,
    F: Fn() -> E,
{
    let mut depth = 0_usize;
    loop {
        let token = stream.next_or_else(&err)?;
        result.push(token);
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => match depth.checked_sub(1) {
                None => return Ok(()),
                Some(d) => depth = d,
            },
            _ => {}
        }
    }
}

/// Reads a braced group of tokens into the result, without the outer braces.
///
/// Leading spaces are skipped. It is an error if the first other token is not a begin group token.
/// The doing argument describes what is being read, for error messages.
pub fn parse_braced_tokens<T: TokenStream>(
    stream: &mut T,
    doing: &str,
    result: &mut Vec<Token>,
) -> txl::Result<()> {
    skip_spaces(stream)?;
    let end_of_input = || error::EndOfInputError::new(doing.to_string());
    let opening = stream.next_or_else(end_of_input)?;
    if !matches!(opening.value(), Value::BeginGroup(_)) {
        return Err(stream.error(
            error::SimpleTokenError::new(
                opening,
                format!(
                    "expected a begin group character while {doing}, found {}",
                    describe(opening, stream.engine().cs_name_interner())
                ),
            )
            .with_note("the tokens must be surrounded by braces like {...}"),
        ));
    }
    finish_balanced_group(stream, result, end_of_input)?;
    // Drop the closing brace.
    result.pop();
    Ok(())
}

/// Returns a short description of the token for use in error messages.
pub fn describe(token: Token, interner: &token::CsNameInterner) -> String {
    match token.value() {
        Value::CommandRef(command_ref) => {
            format!("the control sequence {}", command_ref.to_string(interner))
        }
        Value::Letter(c) => format!("the letter {c}"),
        Value::Other(c) => format!("the character {c}"),
        Value::Space(_) => "a space".into(),
        value => match (value.char(), value.cat_code()) {
            (Some(c), Some(cat_code)) => format!("the character {c} with category {cat_code}"),
            _ => "a token".into(),
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::engine::{Engine, ExpansionInput, Options, TokenStream};
    use crate::prelude as txl;

    /// Runs the function on an engine whose input is the source.
    ///
    /// Returns the value and the text that was left unread.
    pub fn run<T, F>(source: &str, f: F) -> (txl::Result<T>, String)
    where
        F: FnOnce(&mut ExpansionInput<()>) -> txl::Result<T>,
    {
        let mut engine = Engine::new((), Options::default());
        engine.push_source("input.tex", source);
        let result = f(ExpansionInput::new(&mut engine));
        let mut rest = vec![];
        let input = ExpansionInput::new(&mut engine);
        while let Ok(Some(token)) = input.unexpanded().next() {
            rest.push(token);
        }
        let rest = crate::token::write_tokens(&rest, engine.cs_name_interner());
        (result, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::run;
    use super::*;
    use crate::error::Kind;

    #[test]
    fn command_ref_skips_spaces() {
        let (result, rest) = run("  \\a b", |input| token::CommandRef::parse(input));
        assert!(result.is_ok());
        assert_eq!(rest, "b");
    }

    #[test]
    fn command_ref_rejects_character() {
        let (result, _) = run("a", |input| token::CommandRef::parse(input));
        assert_eq!(result.unwrap_err().kind(), Kind::InvalidArgument);
    }

    #[test]
    fn optional_equals() {
        let (_, rest) = run(" = b", |input| OptionalEquals::parse(input));
        assert_eq!(rest, "b");
        let (_, rest) = run("b", |input| OptionalEquals::parse(input));
        assert_eq!(rest, "b");
    }

    #[test]
    fn braced_tokens() {
        let mut result = vec![];
        let (r, rest) = run(" {a{b}c}d", |input| {
            parse_braced_tokens(input.unexpanded(), "testing", &mut result)
        });
        assert!(r.is_ok());
        assert_eq!(result.len(), 5);
        assert_eq!(rest, "d");
    }

    #[test]
    fn braced_tokens_end_of_input() {
        let mut result = vec![];
        let (r, _) = run("{a{b}", |input| {
            parse_braced_tokens(input.unexpanded(), "testing", &mut result)
        });
        assert_eq!(r.unwrap_err().kind(), Kind::InvalidArgument);
    }
}
