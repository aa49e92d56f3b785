//! The LaTeX `\verb` command
//!
//! `\verb<delimiter><text><delimiter>` writes the text exactly as it appears in the input.
//! While the text is read the special characters
//!     (space, `\`, `{`, `}`, `$`, `&`, `#`, `^`, `_`, `%` and `~`)
//! are other characters, so control sequences are not formed and comments are kept.
//! The delimiter can be any character other than a space,
//! so `\verb |x|` is an error rather than the text `|x|`.
//! In the starred form `\verb*` every space is written as a visible space `␣`.
//!
//! The text must end on the line it starts on.
//! When `\verb` appears inside a macro its text has already been lexed and the
//! category codes are not changed, exactly as in LaTeX.

use texparser::engine::GroupKind;
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::token::catcode::CatCode;
use texparser::token::Value;
use texparser::traits::*;

pub const VERB_DOC: &str = "Write text exactly as it appears in the input";

const SPECIAL_CHARACTERS: [char; 11] = [' ', '\\', '{', '}', '$', '&', '#', '^', '_', '%', '~'];

const VISIBLE_SPACE: char = '␣';

const DELIMITER_GUIDANCE: &str =
    "the text of \\verb is delimited by a character like |, as in \\verb|\\text|";

/// Get the `\verb` command.
pub fn get_verb<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(verb_primitive_fn).with_doc(VERB_DOC)
}

fn verb_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    input.begin_group(GroupKind::SemiSimple, token);
    for c in SPECIAL_CHARACTERS {
        input.set_cat_code(c, CatCode::Other, Scope::Local);
    }
    let text = read_verbatim_text(input)?;
    input.end_group(GroupKind::SemiSimple, token)?;
    log::debug!("writing {} verbatim tokens", text.len());
    for token in text {
        input.emit(token);
    }
    Ok(())
}

fn read_verbatim_text<S: EngineState>(input: &mut ExecutionInput<S>) -> Result<Vec<Token>> {
    let star = match input.unexpanded().peek()? {
        Some(next) => next.value() == Value::Other('*'),
        None => false,
    };
    if star {
        input.unexpanded().consume()?;
    }
    let delimiter = input.unexpanded().next_or_else(|| {
        error::EndOfInputError::new("reading the delimiter of \\verb").with_note(DELIMITER_GUIDANCE)
    })?;
    let delimiter_char = match delimiter.value() {
        Value::Other(' ') => None,
        Value::Letter(c) | Value::Other(c) => Some(c),
        _ => None,
    };
    let delimiter_char = match delimiter_char {
        None => {
            let found = parse::describe(delimiter, input.engine().cs_name_interner());
            return Err(input.error(
                error::SimpleTokenError::new(
                    delimiter,
                    format!("{found} cannot be used as the delimiter of \\verb"),
                )
                .with_note(DELIMITER_GUIDANCE),
            ));
        }
        Some(c) => c,
    };
    let mut text = Vec::new();
    loop {
        let next = input.unexpanded().next_or_else(|| {
            error::EndOfInputError::new("reading the text of \\verb")
                .with_note(format!("the text must end with the delimiter {delimiter_char}"))
        })?;
        let token = match next.value() {
            Value::Letter(c) | Value::Other(c) if c == delimiter_char => break,
            Value::Other(' ') if star => Token::new_other(VISIBLE_SPACE, next.trace_key()),
            Value::Other(' ') => Token::new_space(' ', next.trace_key()),
            Value::Space(_) | Value::CommandRef(_) => {
                return Err(input.error(
                    error::SimpleTokenError::new(next, "\\verb ended by the end of the line")
                        .with_note(format!(
                            "the text of \\verb must end with the delimiter {delimiter_char} on the line it starts on"
                        )),
                ));
            }
            _ => next,
        };
        text.push(token);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, StdLibState};
    use std::collections::HashMap;
    use texparser::engine;
    use texparser::error::Kind;
    use texparser::token;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([("def", def::get_def()), ("verb", get_verb())])
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

    #[test]
    fn verb_keeps_special_characters() {
        let (got, tokens) = expand(r"\verb|a{b}\c%d$#^_~|");
        assert_eq!(got, r"a{b}\c%d$#^_~");
        for token in tokens {
            assert!(
                matches!(token.value(), Value::Letter(_) | Value::Other(_)),
                "unexpected token {token:?}"
            );
        }
    }

    #[test]
    fn verb_keeps_spaces() {
        let (got, tokens) = expand(r"\verb+a  b+");
        assert_eq!(got, "a b");
        assert_eq!(tokens.len(), 4);
        assert!(matches!(tokens[1].value(), Value::Space(_)));
        assert!(matches!(tokens[2].value(), Value::Space(_)));
    }

    #[test]
    fn verb_star_shows_spaces() {
        let (got, _) = expand(r"\verb*|a b|\verb**c*");
        assert_eq!(got, "a␣bc");
    }

    #[test]
    fn verb_restores_category_codes() {
        let (got, tokens) = expand(r"\verb|{|{x}%comment");
        assert_eq!(got, "{{x}");
        assert_eq!(tokens[0].value(), Value::Other('{'));
        assert_eq!(tokens[1].value(), Value::BeginGroup('{'));
    }

    #[test]
    fn verb_does_not_expand() {
        let (got, _) = expand(r"\def\a{x}\verb!\a!\a");
        assert_eq!(got, r"\ax");
    }

    #[test]
    fn verb_empty_text() {
        let (got, _) = expand(r"a\verb||b");
        assert_eq!(got, "ab");
    }

    #[test]
    fn verb_keeps_trace_positions() {
        let mut engine = Engine::new(StdLibState::default(), engine::Options::default());
        engine.register_primitives(built_in_commands());
        engine.push_source("input.tex", r"\verb|ab|");
        let tokens: Vec<Token> = engine.tokens().collect::<Result<_>>().unwrap();
        assert_eq!(engine.trace(tokens[1]).position.column, 8);
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (verb_inside_group, r"{\verb|x|}y", "{x}y"),
            (verb_in_macro_uses_lexed_tokens, r"\def\a{\verb|x|}\a", "x"),
        ),
        failure_tests(
            (verb_end_of_input, r"\verb", Kind::InvalidArgument),
            (verb_unterminated, r"\verb|abc", Kind::InvalidArgument),
            (verb_end_of_line, "\\verb|ab\ncd|", Kind::InvalidArgument),
            (verb_space_delimiter, r"\verb |x|", Kind::InvalidArgument),
            (verb_begin_group_in_macro, r"\def\a{\verb{x}}\a", Kind::InvalidArgument),
        ),
    ];
}
