//! Category code primitives

use texparser::command::{StaticTag, Tag};
use texparser::parse::OptionalEquals;
use texparser::prelude::*;
use texparser::token::catcode::CatCode;
use texparser::traits::*;

pub const CATCODE_DOC: &str = "Set the category code of a character";
pub const MAKEATLETTER_DOC: &str = "Make @ a letter so that it can be used in control sequence names";
pub const MAKEATOTHER_DOC: &str = "Make @ an other character again";

static CATCODE_TAG: StaticTag = StaticTag::new();

pub fn catcode_tag() -> Tag {
    CATCODE_TAG.get()
}

/// Get the `\catcode` command.
///
/// The syntax is `\catcode <character code> <optional equals> <category code>`.
/// The new category code only affects characters that are lexed after the assignment.
pub fn get_catcode<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(catcode_primitive_fn)
        .with_tag(catcode_tag())
        .with_doc(CATCODE_DOC)
}

fn catcode_primitive_fn<S: EngineState>(_: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let (c, _, cat_code) = <(char, OptionalEquals, CatCode)>::parse(input)?;
    log::debug!("setting the category code of {c:?} to {cat_code} ({scope:?})");
    input.set_cat_code(c, cat_code, scope);
    Ok(())
}

/// Get the LaTeX `\makeatletter` command.
pub fn get_makeatletter<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(makeatletter_primitive_fn).with_doc(MAKEATLETTER_DOC)
}

/// Get the LaTeX `\makeatother` command.
pub fn get_makeatother<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(makeatother_primitive_fn).with_doc(MAKEATOTHER_DOC)
}

fn makeatletter_primitive_fn<S: EngineState>(_: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    input.set_cat_code('@', CatCode::Letter, Scope::Local);
    Ok(())
}

fn makeatother_primitive_fn<S: EngineState>(_: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    input.set_cat_code('@', CatCode::Other, Scope::Local);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, prefix, StdLibState};
    use std::collections::HashMap;
    use texparser::error::Kind;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("catcode", get_catcode()),
            ("def", def::get_def()),
            ("global", prefix::get_global()),
            ("makeatletter", get_makeatletter()),
            ("makeatother", get_makeatother()),
        ])
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (catcode_base_case, r"\catcode 48 11 \def\A0{x}\A0", "x"),
            (catcode_with_equals, r"\catcode 48 = 11 \def\A0{x}\A0", "x"),
            (catcode_character_code, r"\catcode`\0=11 \def\A0{x}\A0", "x"),
            (
                catcode_local,
                r"{\catcode`\@=11 \def\a@{x}}\def\a{y}\a@",
                "{}y@"
            ),
            (catcode_global, r"{\global\catcode`\@=11 }\def\a@{x}\a@", "{}x"),
            (
                catcode_active,
                r"\catcode`\!=13 \def!{bang}!",
                "bang"
            ),
            (
                makeatletter,
                r"\makeatletter\def\a@b{x}\a@b\makeatother",
                "x"
            ),
            (
                makeatother,
                r"\makeatletter\makeatother\def\a{x}\a@b",
                "x@b"
            ),
        ),
        failure_tests(
            (catcode_value_too_large, r"\catcode 48 16", Kind::InvalidArgument),
            (catcode_value_negative, r"\catcode 48 -1", Kind::InvalidArgument),
            (catcode_missing_value, r"\catcode 48", Kind::InvalidArgument),
            (
                catcode_invalid_category,
                r"\catcode`\!=15 !",
                Kind::Lex
            ),
        ),
    ];
}
