//! The paragraph separator
//!
//! The lexer turns a blank line into `\par`, so almost every document needs the command.
//! There is no typesetting here, so `\par` is delivered to the consumer as a token.
//! [texparser::token::write_tokens] writes each `\par` as one more line break,
//! so a blank line in the input is written back as a blank line.

use texparser::prelude::*;

pub const PAR_DOC: &str = "End the current paragraph";

/// Get the `\par` command.
pub fn get_par<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(par_primitive_fn).with_doc(PAR_DOC)
}

fn par_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    input.emit(token);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, StdLibState};
    use std::collections::HashMap;
    use texparser::engine;
    use texparser::token;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([("def", def::get_def()), ("par", get_par())])
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (blank_line, "a\n\nb", r"a \par b"),
            (several_blank_lines, "a\n\n\n\nb", r"a \par\par\par b"),
            (par_in_macro, r"\def\a{x\par y}\a", r"x\par y"),
        ),
    ];

    #[test]
    fn written_as_blank_line() {
        let mut engine = Engine::new(StdLibState::default(), engine::Options::default());
        engine.register_primitives(built_in_commands());
        engine.push_source("input.tex", "first line\nsecond\n\nnew paragraph");
        let tokens: Vec<Token> = engine
            .tokens()
            .collect::<Result<_>>()
            .expect("expansion succeeds");
        assert_eq!(
            token::write_tokens(&tokens, engine.cs_name_interner()),
            "first line second\n\nnew paragraph"
        );
    }
}
