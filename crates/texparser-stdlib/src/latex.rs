//! LaTeX commands for defining macros
//!
//! This module implements `\newcommand`, `\renewcommand` and `\providecommand`.
//! All three share the same syntax:
//! ```tex
//! \newcommand*{\name}[<number of arguments>][<default>]{<body>}
//! ```
//! The star and both bracketed options are optional, and the braces around the name
//! may be omitted.
//! If a default is given the first argument becomes optional:
//!     it is read from square brackets when the macro is used,
//!     and the default is used otherwise.
//!
//! The three commands differ in what happens when the name is already defined.
//! `\newcommand` fails if it is, `\renewcommand` fails if it isn't,
//! and `\providecommand` keeps the existing definition.
//! Definitions are always local.

use texparser::engine::ExpandedStream;
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::texmacro;
use texparser::token::{CommandRef, Value};

pub const NEWCOMMAND_DOC: &str = "Define a new LaTeX command";
pub const RENEWCOMMAND_DOC: &str = "Redefine an existing LaTeX command";
pub const PROVIDECOMMAND_DOC: &str = "Define a LaTeX command if it is not already defined";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    New,
    Renew,
    Provide,
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::New => "\\newcommand",
            Mode::Renew => "\\renewcommand",
            Mode::Provide => "\\providecommand",
        }
    }
}

/// Get the `\newcommand` command.
pub fn get_newcommand<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(newcommand_primitive_fn).with_doc(NEWCOMMAND_DOC)
}

/// Get the `\renewcommand` command.
pub fn get_renewcommand<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(renewcommand_primitive_fn).with_doc(RENEWCOMMAND_DOC)
}

/// Get the `\providecommand` command.
pub fn get_providecommand<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(providecommand_primitive_fn).with_doc(PROVIDECOMMAND_DOC)
}

fn newcommand_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    define_command(token, input, Mode::New)
}

fn renewcommand_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    define_command(token, input, Mode::Renew)
}

fn providecommand_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    define_command(token, input, Mode::Provide)
}

fn define_command<S: EngineState>(
    token: Token,
    input: &mut ExecutionInput<S>,
    mode: Mode,
) -> Result<()> {
    // The star only affects whether arguments may contain \par, which isn't tracked.
    _ = peek_other(input, '*')?;
    let (name_token, command_ref) = parse_name(input, mode)?;
    let (num_arguments, default) = parse_argument_spec(input, mode.name())?;
    let mut body = input.checkout_token_buffer();
    parse::parse_braced_tokens(
        input.unexpanded(),
        &format!("reading the body of {}", mode.name()),
        &mut body,
    )?;
    let replacements =
        texmacro::parse_replacement_text(&body, num_arguments).map_err(|err| input.error(err))?;
    input.return_token_buffer(body);

    let is_defined = input.commands_map().resolve(&command_ref).is_some();
    let name = command_ref.to_string(input.engine().cs_name_interner());
    match (mode, is_defined) {
        (Mode::New, true) => {
            return Err(input.error(
                error::SimpleTokenError::new(name_token, format!("{name} is already defined"))
                    .with_note("use \\renewcommand to change the definition of an existing command"),
            ));
        }
        (Mode::Renew, false) => {
            return Err(input.error(
                error::SimpleTokenError::new(name_token, format!("{name} is not defined"))
                    .with_note("use \\newcommand to define a new command"),
            ));
        }
        (Mode::Provide, true) => {
            log::debug!("{}: keeping the existing definition of {name}", mode.name());
            return Ok(());
        }
        _ => {}
    }

    let parameters = command_parameters(num_arguments, default);
    log::debug!(
        "{} defines {name} with {num_arguments} argument(s)",
        token.text(input.engine().cs_name_interner())
    );
    let tex_macro = texmacro::Macro::new(
        vec![],
        parameters,
        replacements,
        texmacro::ExpansionKind::OnUse,
    );
    input
        .commands_map_mut()
        .insert_macro(command_ref, tex_macro, Scope::Local);
    Ok(())
}

// Skips spaces and consumes the next token if it is the other character c.
pub(crate) fn peek_other<S: EngineState>(input: &mut ExecutionInput<S>, c: char) -> Result<Option<Token>> {
    parse::skip_spaces(input.unexpanded())?;
    let token = match input.unexpanded().peek()? {
        Some(token) if token.value() == Value::Other(c) => *token,
        _ => return Ok(None),
    };
    input.unexpanded().consume()?;
    Ok(Some(token))
}

// Reads the name of the command, which is either a command or a command in braces.
fn parse_name<S: EngineState>(input: &mut ExecutionInput<S>, mode: Mode) -> Result<(Token, CommandRef)> {
    parse::skip_spaces(input.unexpanded())?;
    let is_braced = matches!(
        input.unexpanded().peek()?.map(Token::value),
        Some(Value::BeginGroup(_))
    );
    if !is_braced {
        return parse::parse_command_ref(input.unexpanded());
    }
    input.unexpanded().consume()?;
    let result = parse::parse_command_ref(input.unexpanded())?;
    parse::skip_spaces(input.unexpanded())?;
    let closing = input.unexpanded().next_or_else(|| {
        error::EndOfInputError::new(format!("reading the name of the command in {}", mode.name()))
    })?;
    if !matches!(closing.value(), Value::EndGroup(_)) {
        let found = parse::describe(closing, input.engine().cs_name_interner());
        return Err(input.error(
            error::SimpleTokenError::new(
                closing,
                format!("expected a closing brace after the command name, found {found}"),
            )
            .with_note("the name must be a single command like {\\foo}"),
        ));
    }
    Ok(result)
}

/// Reads the optional number of arguments and the optional default of the first argument.
///
/// This is the `[<number of arguments>][<default>]` part of `\newcommand` and
/// `\newenvironment`.
pub(crate) fn parse_argument_spec<S: EngineState>(
    input: &mut ExecutionInput<S>,
    command: &str,
) -> Result<(usize, Option<Vec<Token>>)> {
    let num_arguments = match peek_other(input, '[')? {
        None => 0,
        Some(bracket) => parse_num_arguments(bracket, input, command)?,
    };
    let default = match peek_other(input, '[')? {
        None => None,
        Some(bracket) => {
            if num_arguments == 0 {
                return Err(input.error(
                    error::SimpleTokenError::new(
                        bracket,
                        format!("a default argument was given to {command} with no arguments"),
                    )
                    .with_note("the default is for the first argument, so there must be at least one"),
                ));
            }
            Some(parse_default(input, command)?)
        }
    };
    Ok((num_arguments, default))
}

/// Returns the parameters of a LaTeX command.
///
/// If there is a default the first parameter is optional.
pub(crate) fn command_parameters(num_arguments: usize, default: Option<Vec<Token>>) -> Vec<texmacro::Parameter> {
    let mut parameters = Vec::with_capacity(num_arguments);
    if let Some(default) = default {
        parameters.push(texmacro::Parameter::Optional(default));
    }
    while parameters.len() < num_arguments {
        parameters.push(texmacro::Parameter::Undelimited);
    }
    parameters
}

// Reads the number of arguments up to the closing square bracket.
fn parse_num_arguments<S: EngineState>(
    bracket: Token,
    input: &mut ExecutionInput<S>,
    command: &str,
) -> Result<usize> {
    let mut digits = String::new();
    loop {
        let token = input.unexpanded().next_or_else(|| {
            error::EndOfInputError::new(format!("reading the number of arguments in {command}"))
        })?;
        match token.value() {
            Value::Other(']') => break,
            Value::Space(_) => {}
            value => match value.char() {
                Some(c) => digits.push(c),
                None => digits.push('?'),
            },
        }
    }
    match digits.parse::<usize>() {
        Ok(n) if n <= 9 => Ok(n),
        _ => Err(input.error(
            error::SimpleTokenError::new(
                bracket,
                format!("invalid number of arguments [{digits}] in {command}"),
            )
            .with_note("the number of arguments must be between 0 and 9"),
        )),
    }
}

// Reads the default value of the first argument up to the closing square bracket.
//
// A closing bracket inside braces doesn't end the default.
fn parse_default<S: EngineState>(input: &mut ExecutionInput<S>, command: &str) -> Result<Vec<Token>> {
    let mut default = vec![];
    let mut depth = 0_usize;
    loop {
        let token = input.unexpanded().next_or_else(|| {
            error::EndOfInputError::new(format!("reading the default argument in {command}"))
            .with_note("the default must end with a closing square bracket ]")
        })?;
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => depth = depth.saturating_sub(1),
            Value::Other(']') if depth == 0 => return Ok(default),
            _ => {}
        }
        default.push(token);
    }
}

/// Reads a name in braces, like the name of a counter or an environment.
///
/// The name is expanded as it is read and must consist of character tokens.
/// Spaces are ignored.
/// Returns the opening brace along with the name.
pub(crate) fn parse_braced_name<S: EngineState>(
    input: &mut ExpandedStream<S>,
    doing: &str,
) -> Result<(Token, String)> {
    parse::skip_spaces(input)?;
    let opening = input.next_or_else(|| error::EndOfInputError::new(doing.to_string()))?;
    if !matches!(opening.value(), Value::BeginGroup(_)) {
        let found = parse::describe(opening, input.engine().cs_name_interner());
        return Err(input.error(
            error::SimpleTokenError::new(
                opening,
                format!("expected a begin group character while {doing}, found {found}"),
            )
            .with_note("the name must be surrounded by braces like {name}"),
        ));
    }
    let name = finish_name(input, doing, |value| matches!(value, Value::EndGroup(_)))?;
    Ok((opening, name))
}

/// Reads a name up to a closing square bracket.
///
/// This must be called after the opening bracket has been read.
pub(crate) fn parse_bracketed_name<S: EngineState>(
    input: &mut ExpandedStream<S>,
    doing: &str,
) -> Result<String> {
    finish_name(input, doing, |value| value == Value::Other(']'))
}

fn finish_name<S: EngineState>(
    input: &mut ExpandedStream<S>,
    doing: &str,
    is_end: fn(Value) -> bool,
) -> Result<String> {
    let mut name = String::new();
    loop {
        let token = input.next_or_else(|| error::EndOfInputError::new(doing.to_string()))?;
        if is_end(token.value()) {
            return Ok(name);
        }
        match token.value() {
            Value::Space(_) => {}
            Value::Letter(c) | Value::Other(c) => name.push(c),
            _ => {
                let found = parse::describe(token, input.engine().cs_name_interner());
                return Err(input.error(
                    error::SimpleTokenError::new(token, format!("unexpected {found} while {doing}"))
                        .with_note("names may only contain letters and other characters"),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, StdLibState};
    use std::collections::HashMap;
    use texparser::error::Kind;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("def", def::get_def()),
            ("newcommand", get_newcommand()),
            ("renewcommand", get_renewcommand()),
            ("providecommand", get_providecommand()),
        ])
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (newcommand_unbraced_name, r"\newcommand\a{x}\a", "x"),
            (newcommand_braced_name, r"\newcommand{\a}{x}\a", "x"),
            (newcommand_braced_name_spaces, r"\newcommand{ \a }{x}\a", "x"),
            (newcommand_star, r"\newcommand*{\a}{x}\a", "x"),
            (newcommand_zero_arguments, r"\newcommand{\a}[0]{x}\a", "x"),
            (newcommand_two_arguments, r"\newcommand{\a}[2]{#2#1}\a xy", "yx"),
            (
                newcommand_spaces_between_parts,
                r"\newcommand{\a} [1] {(#1)}\a b",
                "(b)"
            ),
            (
                newcommand_optional_default,
                r"\newcommand{\a}[2][d]{(#1,#2)}\a{x}",
                "(d,x)"
            ),
            (
                newcommand_optional_given,
                r"\newcommand{\a}[2][d]{(#1,#2)}\a[o]{x}",
                "(o,x)"
            ),
            (
                newcommand_optional_only,
                r"\newcommand{\a}[1][a b]{(#1)}\a",
                "(a b)"
            ),
            (
                newcommand_default_with_bracket_in_braces,
                r"\newcommand{\a}[1][x]{(#1)}\newcommand{\b}[1][{]}]{\a}\b",
                "(x)"
            ),
            (
                newcommand_is_local,
                r"{\newcommand\a{x}\a}\newcommand\a{y}\a",
                "{x}y"
            ),
            (newcommand_parameter_literal, r"\newcommand\a{##}\def\b#1{}\b\a", ""),
            (renewcommand_base_case, r"\def\a{x}\renewcommand{\a}{y}\a", "y"),
            (
                renewcommand_with_arguments,
                r"\newcommand\a{x}\renewcommand\a[1]{[#1]}\a y",
                "[y]"
            ),
            (
                providecommand_keeps_definition,
                r"\def\a{x}\providecommand{\a}{y}\a",
                "x"
            ),
            (providecommand_defines, r"\providecommand{\a}{y}\a", "y"),
        ),
        failure_tests(
            (newcommand_already_defined, r"\def\a{}\newcommand\a{x}", Kind::InvalidArgument),
            (
                newcommand_primitive_already_defined,
                r"\newcommand\def{x}",
                Kind::InvalidArgument
            ),
            (renewcommand_undefined, r"\renewcommand\a{x}", Kind::InvalidArgument),
            (newcommand_too_many_arguments, r"\newcommand\a[10]{}", Kind::InvalidArgument),
            (newcommand_invalid_arguments, r"\newcommand\a[x]{}", Kind::InvalidArgument),
            (newcommand_empty_arguments, r"\newcommand\a[]{}", Kind::InvalidArgument),
            (
                newcommand_default_without_arguments,
                r"\newcommand\a[0][d]{}",
                Kind::InvalidArgument
            ),
            (
                newcommand_invalid_parameter_reference,
                r"\newcommand\a[1]{#2}",
                Kind::InvalidArgument
            ),
            (newcommand_character_name, r"\newcommand a{x}", Kind::InvalidArgument),
            (newcommand_two_names, r"\newcommand{\a\b}{x}", Kind::InvalidArgument),
            (newcommand_end_of_input, r"\newcommand\a", Kind::InvalidArgument),
            (newcommand_no_body, r"\newcommand\a x", Kind::InvalidArgument),
            (
                newcommand_unterminated_default,
                r"\newcommand\a[1][x",
                Kind::InvalidArgument
            ),
            (
                optional_argument_extra_end_group,
                r"\newcommand\foo[1][d]{(#1)}\foo[a}b]",
                Kind::ParameterMatch
            ),
            (
                optional_argument_unterminated,
                r"\newcommand\foo[1][d]{(#1)}\foo[ab",
                Kind::ParameterMatch
            ),
        ),
    ];
}
