//! LaTeX counters
//!
//! A counter is an integer register with a name.
//! `\newcounter{name}` allocates a register, binds it to `\c@name`
//! and defines `\thename` to write the counter in decimal.
//! When a parent counter is given, as in `\newcounter{name}[parent]`,
//! stepping the parent with `\stepcounter` resets the new counter to zero.
//!
//! Counter assignments are always global.
//!
//! `\value{name}` refers to the counter's register wherever a number is expected,
//! and `\arabic`, `\roman`, `\Roman`, `\alph` and `\Alph` write the counter's value.

use crate::conversion;
use crate::latex;
use crate::registers;
use std::collections::{HashMap, HashSet};
use texparser::error;
use texparser::parse;
use texparser::prelude::*;
use texparser::texmacro;
use texparser::token::{CommandRef, Value};
use texparser::traits::*;

pub const NEWCOUNTER_DOC: &str = "Define a new LaTeX counter";
pub const SETCOUNTER_DOC: &str = "Set the value of a LaTeX counter";
pub const ADDTOCOUNTER_DOC: &str = "Add an integer to a LaTeX counter";
pub const STEPCOUNTER_DOC: &str = "Add one to a LaTeX counter and reset the counters within it";
pub const VALUE_DOC: &str = "Use the value of a LaTeX counter as a number";
pub const ARABIC_DOC: &str = "Write the value of a LaTeX counter in decimal";
pub const ROMAN_DOC: &str = "Write the value of a LaTeX counter as a lowercase roman numeral";
pub const UPPER_ROMAN_DOC: &str = "Write the value of a LaTeX counter as an uppercase roman numeral";
pub const ALPH_DOC: &str = "Write the value of a LaTeX counter as a lowercase letter";
pub const UPPER_ALPH_DOC: &str = "Write the value of a LaTeX counter as an uppercase letter";

/// Component for LaTeX counters.
///
/// The values of counters live in the register component.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    // Counters that are reset when the key counter is stepped.
    resets: HashMap<String, Vec<String>>,
}

fn counter_cs_name(name: &str) -> String {
    format!("c@{name}")
}

fn lookup_counter<T: TokenStream>(stream: &T, name: &str) -> Option<usize> {
    let cs_name = stream
        .engine()
        .cs_name_interner()
        .get(&counter_cs_name(name))?;
    stream
        .commands_map()
        .get_tag(&CommandRef::ControlSequence(cs_name))
        .and_then(registers::register_index)
}

fn counter_register<T: TokenStream>(stream: &T, token: Token, name: &str) -> Result<usize> {
    match lookup_counter(stream, name) {
        Some(index) => Ok(index),
        None => Err(stream.error(
            error::SimpleTokenError::new(token, format!("there is no counter named {name}"))
                .with_note("counters are defined using \\newcounter{name}"),
        )),
    }
}

fn parse_counter<S: EngineState>(input: &mut ExpandedStream<S>, command: &str) -> Result<(String, usize)> {
    let (opening, name) =
        latex::parse_braced_name(input, &format!("reading the counter name in {command}"))?;
    let index = counter_register(&*input, opening, &name)?;
    Ok((name, index))
}

// Reads an integer surrounded by braces, like the {5} in \setcounter{page}{5}.
fn parse_braced_integer<S: EngineState>(input: &mut ExpandedStream<S>, command: &str) -> Result<i32> {
    let doing = format!("reading the value in {command}");
    parse::skip_spaces(input)?;
    let opening = input.next_or_else(|| error::EndOfInputError::new(doing.clone()))?;
    check_token(input, opening, &doing, |value| matches!(value, Value::BeginGroup(_)))?;
    let value = i32::parse(input)?;
    parse::skip_spaces(input)?;
    let closing = input.next_or_else(|| error::EndOfInputError::new(doing.clone()))?;
    check_token(input, closing, &doing, |value| matches!(value, Value::EndGroup(_)))?;
    Ok(value)
}

fn check_token<S: EngineState>(
    input: &ExpandedStream<S>,
    token: Token,
    doing: &str,
    is_valid: fn(Value) -> bool,
) -> Result<()> {
    if is_valid(token.value()) {
        return Ok(());
    }
    let found = parse::describe(token, input.engine().cs_name_interner());
    Err(input.error(
        error::SimpleTokenError::new(token, format!("unexpected {found} while {doing}"))
            .with_note("the value must be a number in braces like {5}"),
    ))
}

/// Get the `\newcounter` command.
pub fn get_newcounter<S>() -> BuiltIn<S>
where
    S: EngineState + HasComponent<Component> + HasComponent<registers::Component>,
{
    BuiltIn::new_execution(newcounter_primitive_fn).with_doc(NEWCOUNTER_DOC)
}

fn newcounter_primitive_fn<S>(token: Token, input: &mut ExecutionInput<S>) -> Result<()>
where
    S: EngineState + HasComponent<Component> + HasComponent<registers::Component>,
{
    let (opening, name) =
        latex::parse_braced_name(input.expanded(), "reading the counter name in \\newcounter")?;
    if name.is_empty() {
        return Err(input.error(
            error::SimpleTokenError::new(opening, "the name of a counter cannot be empty")
                .with_note("the name is given in braces like \\newcounter{section}"),
        ));
    }
    let parent = match latex::peek_other(input, '[')? {
        None => None,
        Some(bracket) => {
            let parent = latex::parse_bracketed_name(
                input.expanded(),
                "reading the parent counter in \\newcounter",
            )?;
            counter_register(&*input, bracket, &parent)?;
            Some(parent)
        }
    };
    let cs_name = input
        .cs_name_interner_mut()
        .get_or_intern(&counter_cs_name(&name));
    let command_ref = CommandRef::ControlSequence(cs_name);
    if input.commands_map().resolve(&command_ref).is_some() {
        return Err(input.error(
            error::SimpleTokenError::new(opening, format!("the counter {name} is already defined"))
                .with_note(format!("\\c@{name} is already defined")),
        ));
    }
    let allocator: &mut registers::Component = input.state_mut().component_mut();
    let index = match allocator.allocate() {
        Some(index) => index,
        None => {
            return Err(input.error(error::SimpleTokenError::new(
                token,
                format!("no register is left for the counter {name}"),
            )))
        }
    };
    input
        .commands_map_mut()
        .insert(command_ref, registers::register_command(index), Scope::Global);

    let number = input.cs_name_interner_mut().get_or_intern("number");
    let the_name = input
        .cs_name_interner_mut()
        .get_or_intern(&format!("the{name}"));
    let replacement = vec![
        Token::new_control_sequence(number, token.trace_key()),
        Token::new_control_sequence(cs_name, token.trace_key()),
    ];
    let tex_macro = texmacro::Macro::new(
        vec![],
        vec![],
        vec![texmacro::Replacement::Tokens(replacement)],
        texmacro::ExpansionKind::OnUse,
    );
    input.commands_map_mut().insert_macro(
        CommandRef::ControlSequence(the_name),
        tex_macro,
        Scope::Global,
    );

    log::debug!("defined the counter {name} in \\count{index} (parent: {parent:?})");
    if let Some(parent) = parent {
        let counters: &mut Component = input.state_mut().component_mut();
        counters.resets.entry(parent).or_default().push(name);
    }
    Ok(())
}

/// Get the `\setcounter` command.
pub fn get_setcounter<S: EngineState + HasComponent<registers::Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(setcounter_primitive_fn).with_doc(SETCOUNTER_DOC)
}

fn setcounter_primitive_fn<S: EngineState + HasComponent<registers::Component>>(
    _: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let (name, index) = parse_counter(input.expanded(), "\\setcounter")?;
    let value = parse_braced_integer(input.expanded(), "\\setcounter")?;
    log::debug!("setting the counter {name} to {value}");
    input
        .state_mut()
        .component_mut()
        .set(index, value, Scope::Global);
    Ok(())
}

/// Get the `\addtocounter` command.
pub fn get_addtocounter<S: EngineState + HasComponent<registers::Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(addtocounter_primitive_fn).with_doc(ADDTOCOUNTER_DOC)
}

fn addtocounter_primitive_fn<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let (name, index) = parse_counter(input.expanded(), "\\addtocounter")?;
    let value = parse_braced_integer(input.expanded(), "\\addtocounter")?;
    add_to_counter(token, input, &name, index, value)
}

fn add_to_counter<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
    name: &str,
    index: usize,
    value: i32,
) -> Result<()> {
    let values: &mut registers::Component = input.state_mut().component_mut();
    let old = values.get(index);
    match old.checked_add(value) {
        Some(new) => {
            log::debug!("changing the counter {name} from {old} to {new}");
            values.set(index, new, Scope::Global);
            Ok(())
        }
        None => Err(input.error(error::SimpleTokenError::new(
            token,
            format!("arithmetic overflow when adding {value} to the counter {name}, which is {old}"),
        ))),
    }
}

/// Get the `\stepcounter` command.
pub fn get_stepcounter<S>() -> BuiltIn<S>
where
    S: EngineState + HasComponent<Component> + HasComponent<registers::Component>,
{
    BuiltIn::new_execution(stepcounter_primitive_fn).with_doc(STEPCOUNTER_DOC)
}

fn stepcounter_primitive_fn<S>(token: Token, input: &mut ExecutionInput<S>) -> Result<()>
where
    S: EngineState + HasComponent<Component> + HasComponent<registers::Component>,
{
    let (name, index) = parse_counter(input.expanded(), "\\stepcounter")?;
    add_to_counter(token, input, &name, index, 1)?;
    reset_within(input, &name);
    Ok(())
}

// Resets the counters within the named counter, and the counters within those.
fn reset_within<S>(input: &mut ExecutionInput<S>, name: &str)
where
    S: EngineState + HasComponent<Component> + HasComponent<registers::Component>,
{
    let counters: &Component = input.state().component();
    let mut pending: Vec<String> = counters.resets.get(name).cloned().unwrap_or_default();
    let mut seen: HashSet<String> = HashSet::new();
    while let Some(dependent) = pending.pop() {
        if !seen.insert(dependent.clone()) {
            continue;
        }
        let counters: &Component = input.state().component();
        if let Some(more) = counters.resets.get(&dependent) {
            pending.extend(more.iter().cloned());
        }
        if let Some(index) = lookup_counter(&*input, &dependent) {
            log::debug!("resetting the counter {dependent} within {name}");
            let values: &mut registers::Component = input.state_mut().component_mut();
            values.set(index, 0, Scope::Global);
        }
    }
}

/// Get the `\value` command.
pub fn get_value<S: EngineState>() -> BuiltIn<S> {
    BuiltIn::new_expansion(value_primitive_fn).with_doc(VALUE_DOC)
}

fn value_primitive_fn<S: EngineState>(token: Token, input: &mut ExpansionInput<S>) -> Result<()> {
    let (opening, name) =
        latex::parse_braced_name(input.expanded(), "reading the counter name in \\value")?;
    counter_register(&*input, opening, &name)?;
    let cs_name = input
        .cs_name_interner_mut()
        .get_or_intern(&counter_cs_name(&name));
    input.push_expansion(&[Token::new_control_sequence(cs_name, token.trace_key())]);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Arabic,
    Roman,
    UpperRoman,
    Alph,
    UpperAlph,
}

impl Style {
    fn command(&self) -> &'static str {
        match self {
            Style::Arabic => "\\arabic",
            Style::Roman => "\\roman",
            Style::UpperRoman => "\\Roman",
            Style::Alph => "\\alph",
            Style::UpperAlph => "\\Alph",
        }
    }

    // Returns None if the value can't be written in this style.
    fn format(&self, n: i32) -> Option<String> {
        match self {
            Style::Arabic => Some(n.to_string()),
            Style::Roman => Some(conversion::roman_numeral(n)),
            Style::UpperRoman => Some(conversion::roman_numeral(n).to_uppercase()),
            Style::Alph => alph(n),
            Style::UpperAlph => alph(n).map(|s| s.to_uppercase()),
        }
    }
}

fn alph(n: i32) -> Option<String> {
    match n {
        0 => Some(String::new()),
        1..=26 => Some(char::from(b'a' + (n - 1) as u8).to_string()),
        _ => None,
    }
}

/// Get the `\arabic` command.
pub fn get_arabic<S: EngineState + HasComponent<registers::Component>>() -> BuiltIn<S> {
    BuiltIn::new_expansion(arabic_primitive_fn).with_doc(ARABIC_DOC)
}

/// Get the `\roman` command.
pub fn get_roman<S: EngineState + HasComponent<registers::Component>>() -> BuiltIn<S> {
    BuiltIn::new_expansion(roman_primitive_fn).with_doc(ROMAN_DOC)
}

/// Get the `\Roman` command.
pub fn get_upper_roman<S: EngineState + HasComponent<registers::Component>>() -> BuiltIn<S> {
    BuiltIn::new_expansion(upper_roman_primitive_fn).with_doc(UPPER_ROMAN_DOC)
}

/// Get the `\alph` command.
///
/// Values between 1 and 26 become the letters a to z and zero produces no output.
pub fn get_alph<S: EngineState + HasComponent<registers::Component>>() -> BuiltIn<S> {
    BuiltIn::new_expansion(alph_primitive_fn).with_doc(ALPH_DOC)
}

/// Get the `\Alph` command.
pub fn get_upper_alph<S: EngineState + HasComponent<registers::Component>>() -> BuiltIn<S> {
    BuiltIn::new_expansion(upper_alph_primitive_fn).with_doc(UPPER_ALPH_DOC)
}

fn arabic_primitive_fn<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExpansionInput<S>,
) -> Result<()> {
    write_counter(token, input, Style::Arabic)
}

fn roman_primitive_fn<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExpansionInput<S>,
) -> Result<()> {
    write_counter(token, input, Style::Roman)
}

fn upper_roman_primitive_fn<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExpansionInput<S>,
) -> Result<()> {
    write_counter(token, input, Style::UpperRoman)
}

fn alph_primitive_fn<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExpansionInput<S>,
) -> Result<()> {
    write_counter(token, input, Style::Alph)
}

fn upper_alph_primitive_fn<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExpansionInput<S>,
) -> Result<()> {
    write_counter(token, input, Style::UpperAlph)
}

fn write_counter<S: EngineState + HasComponent<registers::Component>>(
    token: Token,
    input: &mut ExpansionInput<S>,
    style: Style,
) -> Result<()> {
    let (name, index) = parse_counter(input.expanded(), style.command())?;
    let value = input.state().component().get(index);
    match style.format(value) {
        Some(s) => {
            input.push_string_tokens(token, &s);
            Ok(())
        }
        None => Err(input.error(
            error::SimpleTokenError::new(
                token,
                format!("the counter {name} is too large for {}", style.command()),
            )
            .with_note(format!("the value is {value}, which is not between 0 and 26")),
        )),
    }
}
