//! Primitives that convert their input to characters
//!
//! All of these primitives produce tokens with category code other,
//! except for spaces which become space tokens.

use texparser::parse;
use texparser::prelude::*;
use texparser::token;
use texparser::token::Value;
use texparser::traits::*;

pub const STRING_DOC: &str = "Convert the next token to other characters";
pub const DETOKENIZE_DOC: &str = "Convert a braced group of tokens to other characters";
pub const NUMBER_DOC: &str = "Write an integer in decimal";
pub const ROMANNUMERAL_DOC: &str = "Write an integer as a lowercase roman numeral";

/// Get the `\string` command.
pub fn get_string<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(string_primitive_fn).with_doc(STRING_DOC)
}

fn string_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let next = input.unexpanded().next_or_else(|| {
        texparser::error::EndOfInputError::new("reading the token after \\string")
            .with_note("\\string must be followed by a token")
    })?;
    let s = next.text(input.engine().cs_name_interner());
    input.push_string_tokens(token, &s);
    Ok(())
}

/// Get the `\detokenize` command.
///
/// The output is the text of the tokens as they would be written in source.
/// Every control word is followed by a space and parameter characters are doubled,
/// as in e-TeX.
pub fn get_detokenize<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(detokenize_primitive_fn).with_doc(DETOKENIZE_DOC)
}

fn detokenize_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let mut tokens = input.checkout_token_buffer();
    parse::parse_braced_tokens(input.unexpanded(), "reading the argument of \\detokenize", &mut tokens)?;
    let s = detokenize(&tokens, input.engine().cs_name_interner());
    input.return_token_buffer(tokens);
    input.push_string_tokens(token, &s);
    Ok(())
}

fn detokenize(tokens: &[Token], interner: &token::CsNameInterner) -> String {
    let mut s = String::new();
    for token in tokens {
        match token.value() {
            Value::CommandRef(token::CommandRef::ControlSequence(cs_name)) => {
                let name = interner.resolve(cs_name).unwrap_or_default();
                s.push('\\');
                s.push_str(name);
                if token::is_control_word(name) {
                    s.push(' ');
                }
            }
            Value::CommandRef(token::CommandRef::ActiveCharacter(c)) => s.push(c),
            Value::Parameter(c) => {
                s.push(c);
                s.push(c);
            }
            value => {
                if let Some(c) = value.char() {
                    s.push(c);
                }
            }
        }
    }
    s
}

/// Get the `\number` command.
pub fn get_number<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(number_primitive_fn).with_doc(NUMBER_DOC)
}

fn number_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let n = i32::parse(input)?;
    input.push_string_tokens(token, &n.to_string());
    Ok(())
}

/// Get the `\romannumeral` command.
///
/// Numbers that are zero or negative produce no output.
pub fn get_romannumeral<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(romannumeral_primitive_fn).with_doc(ROMANNUMERAL_DOC)
}

fn romannumeral_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let n = i32::parse(input)?;
    input.push_string_tokens(token, &roman_numeral(n));
    Ok(())
}

const ROMAN_NUMERALS: [(i32, &str); 13] = [
    (1000, "m"),
    (900, "cm"),
    (500, "d"),
    (400, "cd"),
    (100, "c"),
    (90, "xc"),
    (50, "l"),
    (40, "xl"),
    (10, "x"),
    (9, "ix"),
    (5, "v"),
    (4, "iv"),
    (1, "i"),
];

pub(crate) fn roman_numeral(mut n: i32) -> String {
    let mut s = String::new();
    for (value, numeral) in ROMAN_NUMERALS {
        while n >= value {
            s.push_str(numeral);
            n -= value;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, StdLibState};
    use std::collections::HashMap;
    use texparser::engine;
    use texparser::error::Kind;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("def", def::get_def()),
            ("detokenize", get_detokenize()),
            ("number", get_number()),
            ("romannumeral", get_romannumeral()),
            ("string", get_string()),
        ])
    }

    fn expand(source: &str) -> (String, Vec<Token>) {
        let mut engine = Engine::new(StdLibState::default(), engine::Options::default());
        engine.register_primitives(built_in_commands());
        engine.push_source("input.tex", source);
        let tokens: Vec<Token> = engine
            .tokens()
            .collect::<Result<_>>()
            .expect("expansion succeeds");
        (token::write_tokens(&tokens, engine.cs_name_interner()), tokens)
    }

    macro_rules! conversion_tests {
        ( $( ($name: ident, $input: expr, $want: expr $(,)? ) ),* $(,)? ) => {
            $(
                #[test]
                fn $name() {
                    let (got, tokens) = expand($input);
                    assert_eq!(got, $want);
                    for token in tokens {
                        assert!(
                            matches!(token.value(), Value::Other(_) | Value::Space(_)),
                            "unexpected token {token:?}"
                        );
                    }
                }
            )*
        };
    }

    conversion_tests![
        (string_control_word, r"\string\foo", r"\foo"),
        (string_control_symbol, r"\string\%", r"\%"),
        (string_letter, r"\string a", "a"),
        (string_begin_group, r"\string{", "{"),
        (string_does_not_expand, r"\def\a{b}\string\a", r"\a"),
        (detokenize_characters, r"\detokenize{abc}", "abc"),
        (detokenize_control_word, r"\detokenize{\a b}", r"\a b"),
        (detokenize_control_symbol, r"\detokenize{\%b}", r"\%b"),
        (detokenize_nested_braces, r"\detokenize{a{b}c}", "a{b}c"),
        (detokenize_parameter, r"\detokenize{#}", "##"),
        (detokenize_does_not_expand, r"\def\a{b}\detokenize{\a}", r"\a "),
        (romannumeral_small, r"\romannumeral 4", "iv"),
        (romannumeral_large, r"\romannumeral 1984", "mcmlxxxiv"),
        (romannumeral_thousands, r"\romannumeral 3000", "mmm"),
    ];

    #[test]
    fn roman_numerals() {
        for (n, want) in [
            (1, "i"),
            (9, "ix"),
            (14, "xiv"),
            (40, "xl"),
            (99, "xcix"),
            (444, "cdxliv"),
            (2024, "mmxxiv"),
        ] {
            assert_eq!(roman_numeral(n), want);
        }
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (number_base_case, r"\number 42", "42"),
            (number_leading_zeros, r"\number 0042", "42"),
            (number_negative, r"\number -17", "-17"),
            (number_double_negative, r"\number --17", "17"),
            (number_hex, r#"\number "FF"#, "255"),
            (number_octal, r"\number '17", "15"),
            (number_character_code, r"\number `a", "97"),
            (number_from_macro, r"\def\a{12}\number\a3", "123"),
            (number_of_number, r"\number\number 7", "7"),
            (romannumeral_zero, r"a\romannumeral 0 b", "ab"),
            (romannumeral_negative, r"a\romannumeral -5 b", "ab"),
        ),
        failure_tests(
            (string_end_of_input, r"\string", Kind::InvalidArgument),
            (detokenize_no_brace, r"\detokenize a", Kind::InvalidArgument),
            (detokenize_end_of_input, r"\detokenize{a", Kind::InvalidArgument),
            (number_missing, r"\number a", Kind::InvalidArgument),
        ),
    ];
}
