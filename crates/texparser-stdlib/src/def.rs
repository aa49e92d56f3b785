//! Primitives for creating user-defined macros (`\def` and friends).

use crate::prefix;
use texparser::command::StaticTag;
use texparser::command::Tag;
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::texmacro;
use texparser::token::Value;
use texparser::traits::*;

pub const DEF_DOC: &str = "Define a custom macro";
pub const GDEF_DOC: &str = "Define a custom macro globally";
pub const EDEF_DOC: &str = "Define a custom macro, expanding the replacement text first";
pub const XDEF_DOC: &str = "Define a custom macro globally, expanding the replacement text first";

static DEF_TAG: StaticTag = StaticTag::new();

/// Tag shared by `\def`, `\gdef`, `\edef` and `\xdef`.
///
/// The prefix commands use it to recognize definitions.
pub fn def_tag() -> Tag {
    DEF_TAG.get()
}

/// Get the `\def` command.
pub fn get_def<S: EngineState + HasComponent<prefix::Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(def_primitive_fn)
        .with_tag(def_tag())
        .with_doc(DEF_DOC)
}

/// Get the `\gdef` command.
pub fn get_gdef<S: EngineState + HasComponent<prefix::Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(gdef_primitive_fn)
        .with_tag(def_tag())
        .with_doc(GDEF_DOC)
}

/// Get the `\edef` command.
pub fn get_edef<S: EngineState + HasComponent<prefix::Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(edef_primitive_fn)
        .with_tag(def_tag())
        .with_doc(EDEF_DOC)
}

/// Get the `\xdef` command.
pub fn get_xdef<S: EngineState + HasComponent<prefix::Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(xdef_primitive_fn)
        .with_tag(def_tag())
        .with_doc(XDEF_DOC)
}

fn def_primitive_fn<S: EngineState + HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    parse_and_set_macro(def_token, input, false, false)
}

fn gdef_primitive_fn<S: EngineState + HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    parse_and_set_macro(def_token, input, true, false)
}

fn edef_primitive_fn<S: EngineState + HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    parse_and_set_macro(def_token, input, false, true)
}

fn xdef_primitive_fn<S: EngineState + HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    parse_and_set_macro(def_token, input, true, true)
}

fn parse_and_set_macro<S: EngineState + HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut ExecutionInput<S>,
    set_globally_override: bool,
    expand_replacement: bool,
) -> Result<()> {
    let mut scope = input.state_mut().component_mut().take_scope();
    if set_globally_override {
        scope = Scope::Global;
    }
    let (_, target) = parse::parse_command_ref(input.unexpanded())?;

    let mut parameter_tokens = input.checkout_token_buffer();
    let opening_brace = parse_parameter_tokens(input, &mut parameter_tokens)?;
    let parameter_text = texmacro::parse_parameter_text(&parameter_tokens, opening_brace)
        .map_err(|err| input.error(err))?;
    input.return_token_buffer(parameter_tokens);

    let mut replacement_tokens = input.checkout_token_buffer();
    let end_of_input = || {
        error::EndOfInputError::new("reading the replacement text of a macro")
            .with_note("the replacement text must end with a closing brace }")
    };
    match expand_replacement {
        // Expanding the replacement honors \noexpand, which is handled by the expansion
        // machinery.
        true => parse::finish_balanced_group(input, &mut replacement_tokens, end_of_input)?,
        false => parse::finish_balanced_group(
            input.unexpanded(),
            &mut replacement_tokens,
            end_of_input,
        )?,
    }
    // Drop the closing brace.
    replacement_tokens.pop();
    if let Some(token) = parameter_text.trailing_begin_group {
        replacement_tokens.push(token);
    }
    let replacements =
        texmacro::parse_replacement_text(&replacement_tokens, parameter_text.parameters.len())
            .map_err(|err| input.error(err))?;
    input.return_token_buffer(replacement_tokens);

    let kind = match expand_replacement {
        true => texmacro::ExpansionKind::OnDefine,
        false => texmacro::ExpansionKind::OnUse,
    };
    let user_defined_macro = texmacro::Macro::new(
        parameter_text.prefix,
        parameter_text.parameters,
        replacements,
        kind,
    );
    log::debug!(
        "{} defines {} ({scope:?})",
        def_token.text(input.engine().cs_name_interner()),
        target.to_string(input.engine().cs_name_interner()),
    );
    input
        .commands_map_mut()
        .insert_macro(target, user_defined_macro, scope);
    Ok(())
}

// Reads the parameter text without expansion and returns the opening brace of the
// replacement text.
fn parse_parameter_tokens<S: EngineState>(
    input: &mut ExecutionInput<S>,
    result: &mut Vec<Token>,
) -> Result<Token> {
    let guidance = "the parameter text of a macro must end with a begin group character like {";
    loop {
        let token = input.unexpanded().next_or_else(|| {
            error::EndOfInputError::new("reading the parameter text of a macro").with_note(guidance)
        })?;
        match token.value() {
            Value::BeginGroup(_) => return Ok(token),
            Value::EndGroup(_) => {
                return Err(input.error(
                    error::SimpleTokenError::new(
                        token,
                        "unexpected end group character while reading the parameter text of a macro",
                    )
                    .with_note(guidance),
                ));
            }
            _ => result.push(token),
        }
    }
}
