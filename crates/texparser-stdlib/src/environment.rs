//! LaTeX environments
//!
//! `\newenvironment{name}[<number of arguments>][<default>]{<begin code>}{<end code>}`
//! defines two macros:
//!     `\name`, which takes the arguments and expands to the begin code,
//!     and `\endname`, which expands to the end code.
//! The arguments are the same as for `\newcommand`.
//! `\renewenvironment` redefines an existing environment.
//! Both definitions are local.
//!
//! `\begin{name}` opens a group and expands `\name`.
//! `\end{name}` expands `\endname` inside the group and then closes the group,
//! so local definitions made by the begin code are visible in the end code.
//! Every `\end` must match the innermost open `\begin`.
//! The `document` environment may be used without being defined.

use crate::latex;
use texparser::engine::GroupKind;
use texparser::error;
use texparser::error::Kind;
use texparser::parse;
use texparser::prelude::*;
use texparser::texmacro;
use texparser::token::CommandRef;
use texparser::traits::*;

pub const NEWENVIRONMENT_DOC: &str = "Define a new LaTeX environment";
pub const RENEWENVIRONMENT_DOC: &str = "Redefine an existing LaTeX environment";
pub const BEGIN_DOC: &str = "Begin a LaTeX environment";
pub const END_DOC: &str = "End a LaTeX environment";

const DOCUMENT: &str = "document";

/// Component for LaTeX environments.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    // Names of the open environments, innermost last.
    open: Vec<String>,
    // Environments whose end code has been expanded and whose group is closed next.
    closing: Vec<String>,
}

impl Component {
    /// Returns the names of the open environments, innermost last.
    pub fn open_environments(&self) -> &[String] {
        &self.open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    New,
    Renew,
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::New => "\\newenvironment",
            Mode::Renew => "\\renewenvironment",
        }
    }
}

/// Get the `\newenvironment` command.
pub fn get_newenvironment<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(newenvironment_primitive_fn).with_doc(NEWENVIRONMENT_DOC)
}

/// Get the `\renewenvironment` command.
pub fn get_renewenvironment<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_execution(renewenvironment_primitive_fn).with_doc(RENEWENVIRONMENT_DOC)
}

fn newenvironment_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    define_environment(token, input, Mode::New)
}

fn renewenvironment_primitive_fn<S: EngineState>(token: Token, input: &mut ExecutionInput<S>) -> Result<()> {
    define_environment(token, input, Mode::Renew)
}

fn define_environment<S: EngineState>(
    _: Token,
    input: &mut ExecutionInput<S>,
    mode: Mode,
) -> Result<()> {
    _ = latex::peek_other(input, '*')?;
    let (opening, name) = latex::parse_braced_name(
        input.expanded(),
        &format!("reading the environment name in {}", mode.name()),
    )?;
    if name.is_empty() {
        return Err(input.error(
            error::SimpleTokenError::new(opening, "the name of an environment cannot be empty")
                .with_note(format!("the name is given in braces like {}{{quote}}", mode.name())),
        ));
    }
    let (num_arguments, default) = latex::parse_argument_spec(input, mode.name())?;

    let mut code = input.checkout_token_buffer();
    parse::parse_braced_tokens(
        input.unexpanded(),
        &format!("reading the begin code in {}", mode.name()),
        &mut code,
    )?;
    let begin_replacements =
        texmacro::parse_replacement_text(&code, num_arguments).map_err(|err| input.error(err))?;
    code.clear();
    parse::parse_braced_tokens(
        input.unexpanded(),
        &format!("reading the end code in {}", mode.name()),
        &mut code,
    )?;
    let end_replacements = texmacro::parse_replacement_text(&code, 0).map_err(|err| {
        input.error(err.with_note("the end code of an environment cannot refer to its arguments"))
    })?;
    input.return_token_buffer(code);

    let begin_name = input.cs_name_interner_mut().get_or_intern(&name);
    let end_name = input
        .cs_name_interner_mut()
        .get_or_intern(&format!("end{name}"));
    let begin_ref = CommandRef::ControlSequence(begin_name);
    let is_defined = input.commands_map().resolve(&begin_ref).is_some();
    match (mode, is_defined) {
        (Mode::New, true) => {
            return Err(input.error(
                error::SimpleTokenError::new(
                    opening,
                    format!("the environment {name} is already defined"),
                )
                .with_note("use \\renewenvironment to change the definition of an existing environment"),
            ));
        }
        (Mode::Renew, false) => {
            return Err(input.error(
                error::SimpleTokenError::new(opening, format!("the environment {name} is not defined"))
                    .with_note("use \\newenvironment to define a new environment"),
            ));
        }
        _ => {}
    }

    log::debug!(
        "{} defines the environment {name} with {num_arguments} argument(s)",
        mode.name()
    );
    let begin_macro = texmacro::Macro::new(
        vec![],
        latex::command_parameters(num_arguments, default),
        begin_replacements,
        texmacro::ExpansionKind::OnUse,
    );
    let end_macro = texmacro::Macro::new(
        vec![],
        vec![],
        end_replacements,
        texmacro::ExpansionKind::OnUse,
    );
    let commands_map = input.commands_map_mut();
    commands_map.insert_macro(begin_ref, begin_macro, Scope::Local);
    commands_map.insert_macro(CommandRef::ControlSequence(end_name), end_macro, Scope::Local);
    Ok(())
}

/// Get the `\begin` command.
pub fn get_begin<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(begin_primitive_fn).with_doc(BEGIN_DOC)
}

/// Get the `\end` command.
pub fn get_end<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(end_primitive_fn).with_doc(END_DOC)
}

fn begin_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let (opening, name) =
        latex::parse_braced_name(input.expanded(), "reading the environment name in \\begin")?;
    let begin_name = input.cs_name_interner_mut().get_or_intern(&name);
    let is_defined = input
        .commands_map()
        .resolve(&CommandRef::ControlSequence(begin_name))
        .is_some();
    if !is_defined && name != DOCUMENT {
        return Err(input.error(
            error::SimpleTokenError::new(opening, format!("the environment {name} is not defined"))
                .with_kind(Kind::UndefinedControlSequence)
                .with_note("environments are defined using \\newenvironment"),
        ));
    }
    log::debug!("beginning the environment {name}");
    input.begin_group(GroupKind::Environment, token);
    input.state_mut().component_mut().open.push(name);
    if is_defined {
        input.push_expansion(&[Token::new_control_sequence(begin_name, token.trace_key())]);
    }
    Ok(())
}

fn end_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let (opening, name) =
        latex::parse_braced_name(input.expanded(), "reading the environment name in \\end")?;
    let component = input.state_mut().component_mut();
    if component.closing.last() == Some(&name) {
        component.closing.pop();
        return close_environment(token, input, &name);
    }
    let mismatch = match component.open.last() {
        Some(open) if *open == name => None,
        Some(open) => Some(format!("\\end{{{name}}} does not match \\begin{{{open}}}")),
        None => Some(format!("\\end{{{name}}} has no matching \\begin")),
    };
    if let Some(title) = mismatch {
        return Err(input.error(
            error::SimpleTokenError::new(opening, title)
                .with_kind(Kind::UnbalancedGroup)
                .with_note("every \\end must match the innermost open \\begin"),
        ));
    }

    let end_name = input
        .cs_name_interner_mut()
        .get_or_intern(&format!("end{name}"));
    let has_end_code = input
        .commands_map()
        .resolve(&CommandRef::ControlSequence(end_name))
        .is_some();
    if !has_end_code {
        return close_environment(token, input, &name);
    }
    // The end code runs first and then this \end is read again to close the group.
    let trace_key = token.trace_key();
    let mut tokens = vec![
        Token::new_control_sequence(end_name, trace_key),
        token,
        Token::new_begin_group('{', trace_key),
    ];
    tokens.extend(name.chars().map(|c| Token::new_other(c, trace_key)));
    tokens.push(Token::new_end_group('}', trace_key));
    input.push_expansion(&tokens);
    input.state_mut().component_mut().closing.push(name);
    Ok(())
}

fn close_environment<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
    name: &str,
) -> Result<()> {
    log::debug!("ending the environment {name}");
    input.end_group(GroupKind::Environment, token)?;
    input.state_mut().component_mut().open.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, StdLibState};
    use std::collections::HashMap;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("begin", get_begin()),
            ("def", def::get_def()),
            ("end", get_end()),
            ("newcommand", latex::get_newcommand()),
            ("newenvironment", get_newenvironment()),
            ("renewenvironment", get_renewenvironment()),
        ])
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (
                environment_base_case,
                r"\newenvironment{box}{[}{]}\begin{box}x\end{box}",
                "[x]"
            ),
            (
                environment_is_a_group,
                r"\def\a{o}\newenvironment{e}{\def\a{i}}{}\begin{e}\a\end{e}\a",
                "io"
            ),
            (
                environment_end_code_is_inside_the_group,
                r"\newenvironment{e}{\def\a{in}}{\a}\def\a{out}\begin{e}\end{e}\a",
                "inout"
            ),
            (
                environment_arguments,
                r"\newenvironment{e}[2]{(#1,#2)}{.}\begin{e}{x}{y}z\end{e}",
                "(x,y)z."
            ),
            (
                environment_optional_argument,
                r"\newenvironment{e}[2][d]{(#1,#2)}{.}\begin{e}{x}\begin{e}[o]{y}\end{e}\end{e}",
                "(d,x)(o,y).."
            ),
            (
                environment_nested,
                r"\newenvironment{a}{<}{>}\newenvironment{b}{(}{)}\begin{a}\begin{b}x\end{b}\end{a}",
                "<(x)>"
            ),
            (
                environment_nested_same_name,
                r"\newenvironment{a}{<}{>}\begin{a}\begin{a}x\end{a}\end{a}",
                "<<x>>"
            ),
            (
                environment_inside_braces,
                r"\newenvironment{e}{x}{y}{\begin{e}\end{e}}",
                "{xy}"
            ),
            (
                newenvironment_star,
                r"\newenvironment*{e}{x}{y}\begin{e}\end{e}",
                "xy"
            ),
            (
                newenvironment_expanded_name,
                r"\def\n{e}\newenvironment{\n}{x}{y}\begin{e}\end{\n}",
                "xy"
            ),
            (
                newenvironment_is_local,
                r"{\newenvironment{e}{x}{y}}\newenvironment{e}{p}{q}\begin{e}\end{e}",
                "{}pq"
            ),
            (
                newenvironment_name_with_spaces,
                r"\newenvironment{ e }{x}{y}\begin{e}\end{ e }",
                "xy"
            ),
            (
                newenvironment_star_in_name,
                r"\newenvironment{e*}{x}{y}\begin{e*}\end{e*}",
                "xy"
            ),
            (
                renewenvironment_base_case,
                r"\newenvironment{e}{x}{y}\renewenvironment{e}{p}{q}\begin{e}\end{e}",
                "pq"
            ),
            (
                document_environment,
                r"\begin{document}x\end{document}",
                "x"
            ),
            (
                environment_defined_by_newcommand,
                r"\newcommand\e{[}\begin{e}x\end{e}",
                "[x"
            ),
        ),
        failure_tests(
            (
                end_does_not_match_begin,
                r"\newenvironment{a}{}{}\newenvironment{b}{}{}\begin{a}\end{b}",
                Kind::UnbalancedGroup
            ),
            (end_without_begin, r"\end{a}", Kind::UnbalancedGroup),
            (
                end_inside_braces,
                r"\newenvironment{a}{}{}\begin{a}{\end{a}}",
                Kind::UnbalancedGroup
            ),
            (
                environment_unterminated,
                r"\newenvironment{a}{}{}\begin{a}x",
                Kind::UnterminatedGroup
            ),
            (begin_undefined, r"\begin{a}", Kind::UndefinedControlSequence),
            (
                newenvironment_already_defined,
                r"\newenvironment{a}{}{}\newenvironment{a}{}{}",
                Kind::InvalidArgument
            ),
            (
                newenvironment_command_already_defined,
                r"\def\a{}\newenvironment{a}{}{}",
                Kind::InvalidArgument
            ),
            (renewenvironment_undefined, r"\renewenvironment{a}{}{}", Kind::InvalidArgument),
            (
                newenvironment_end_code_with_parameter,
                r"\newenvironment{a}[1]{}{#1}",
                Kind::InvalidArgument
            ),
            (newenvironment_missing_end_code, r"\newenvironment{a}{x}", Kind::InvalidArgument),
            (newenvironment_empty_name, r"\newenvironment{}{}{}", Kind::InvalidArgument),
            (newenvironment_unbraced_name, r"\newenvironment a{}{}", Kind::InvalidArgument),
        ),
    ];
}
