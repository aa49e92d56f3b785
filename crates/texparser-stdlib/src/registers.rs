//! Integer registers and register arithmetic
//!
//! There are 32768 integer registers, `\count0` through `\count32767`.
//! Every register starts at zero.
//! Assignments like `\count1=5` are local to the current group unless they are
//! prefixed by `\global`.
//!
//! `\countdef\cs=n` binds the control sequence `\cs` to register n, and `\newcount\cs`
//! binds `\cs` to the next register that has not been allocated.
//! A bound command behaves like `\count n`.
//! It can be assigned to and used wherever a number is expected,
//! and `\let` copies of it refer to the same register.
//!
//! `\advance`, `\multiply` and `\divide` change a register in place.
//! Arithmetic that overflows, and division by zero, are errors.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};
use texparser::command::{Command, StaticTag, Tag};
use texparser::error;
use texparser::parse;
use texparser::parse::{OptionalBy, OptionalEquals};
use texparser::prelude::*;
use texparser::token::Value;
use texparser::traits::*;
use texparser_stdext::collections::scopedmap::ScopedMap;

pub const COUNT_DOC: &str = "Get or set an integer register";
pub const COUNTDEF_DOC: &str = "Bind an integer register to a control sequence";
pub const NEWCOUNT_DOC: &str = "Allocate a new integer register and bind it to a control sequence";
pub const ADVANCE_DOC: &str = "Add an integer to a register";
pub const MULTIPLY_DOC: &str = "Multiply a register by an integer";
pub const DIVIDE_DOC: &str = "Divide a register by an integer, rounding towards zero";

/// The number of integer registers.
pub const NUM_REGISTERS: usize = 32768;

// Registers below this one are left for scratch use.
const FIRST_ALLOCATED_REGISTER: usize = 10;

/// Component for integer registers.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    values: ScopedMap<usize, i32>,
    next_allocation: usize,
}

impl Default for Component {
    fn default() -> Self {
        Component {
            values: Default::default(),
            next_allocation: FIRST_ALLOCATED_REGISTER,
        }
    }
}

impl Component {
    /// Returns the value of the register.
    pub fn get(&self, index: usize) -> i32 {
        self.values.get(&index).copied().unwrap_or(0)
    }

    /// Sets the value of the register.
    pub fn set(&mut self, index: usize, value: i32, scope: Scope) {
        self.values.insert(index, value, scope);
    }

    /// Returns the index of a register that has not been allocated before.
    ///
    /// Allocation is global and is not undone when a group ends.
    pub fn allocate(&mut self) -> Option<usize> {
        if self.next_allocation >= NUM_REGISTERS {
            return None;
        }
        let index = self.next_allocation;
        self.next_allocation += 1;
        Some(index)
    }
}

/// Group hook for states that contain the register component.
pub fn begin_group_hook<S: HasComponent<Component>>(state: &mut S) {
    state.component_mut().values.begin_scope();
}

/// Group hook for states that contain the register component.
pub fn end_group_hook<S: HasComponent<Component>>(state: &mut S) {
    // The engine only ends groups it began, so there is always a scope to end.
    _ = state.component_mut().values.end_scope();
}

static COUNT_TAG: StaticTag = StaticTag::new();
static COUNTDEF_TAG: StaticTag = StaticTag::new();
static ADVANCE_TAG: StaticTag = StaticTag::new();
static MULTIPLY_TAG: StaticTag = StaticTag::new();
static DIVIDE_TAG: StaticTag = StaticTag::new();

pub fn count_tag() -> Tag {
    COUNT_TAG.get()
}

/// Returns true if the command with this tag may be prefixed by `\global`.
pub fn accepts_global(tag: Tag) -> bool {
    tag == COUNT_TAG.get()
        || tag == COUNTDEF_TAG.get()
        || tag == ADVANCE_TAG.get()
        || tag == MULTIPLY_TAG.get()
        || tag == DIVIDE_TAG.get()
        || register_index(tag).is_some()
}

// Every command bound to a register carries the tag of that register.
// The tags are shared by all engines, like the tags of primitives.
#[derive(Default)]
struct RegisterTags {
    by_index: HashMap<usize, Tag>,
    by_tag: HashMap<Tag, usize>,
}

static REGISTER_TAGS: OnceLock<Mutex<RegisterTags>> = OnceLock::new();

fn register_tags() -> MutexGuard<'static, RegisterTags> {
    REGISTER_TAGS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|err| err.into_inner())
}

fn register_tag(index: usize) -> Tag {
    let mut tags = register_tags();
    if let Some(tag) = tags.by_index.get(&index) {
        return *tag;
    }
    let tag = Tag::new();
    tags.by_index.insert(index, tag);
    tags.by_tag.insert(tag, index);
    tag
}

/// Returns the index of the register that commands with this tag are bound to.
pub fn register_index(tag: Tag) -> Option<usize> {
    register_tags().by_tag.get(&tag).copied()
}

/// Returns the register that a command refers to.
///
/// The tag is the tag of the command.
/// If the command is `\count` the index of the register is read from the input.
/// Returns [None] if the command doesn't refer to a register.
pub fn register_ref<S: EngineState>(
    token: Token,
    tag: Tag,
    input: &mut ExpandedStream<S>,
) -> Result<Option<usize>> {
    if tag == COUNT_TAG.get() {
        return Ok(Some(parse_index(token, input)?));
    }
    Ok(register_index(tag))
}

fn parse_index<S: EngineState>(token: Token, input: &mut ExpandedStream<S>) -> Result<usize> {
    let i = i32::parse(input)?;
    match usize::try_from(i) {
        Ok(index) if index < NUM_REGISTERS => Ok(index),
        _ => Err(input.error(
            error::SimpleTokenError::new(token, format!("register index {i} is out of range"))
                .with_note(format!(
                    "register indices are between 0 and {}",
                    NUM_REGISTERS - 1
                )),
        )),
    }
}

/// Get the `\count` command.
pub fn get_count<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(count_primitive_fn)
        .with_tag(COUNT_TAG.get())
        .with_doc(COUNT_DOC)
}

fn count_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let index = parse_index(token, input.expanded())?;
    assign(index, scope, input)
}

// The function behind every command that is bound to a register.
fn register_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let index = match token.value() {
        Value::CommandRef(command_ref) => input
            .commands_map()
            .get_tag(&command_ref)
            .and_then(register_index),
        _ => None,
    };
    match index {
        Some(index) => assign(index, scope, input),
        None => Err(input.error(error::SimpleTokenError::new(
            token,
            format!(
                "{} is not bound to a register",
                token.text(input.engine().cs_name_interner())
            ),
        ))),
    }
}

fn assign<S: EngineState + HasComponent<Component>>(
    index: usize,
    scope: Scope,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let (_, value) = <(OptionalEquals, i32)>::parse(input)?;
    log::debug!("setting \\count{index} to {value} ({scope:?})");
    input.state_mut().component_mut().set(index, value, scope);
    Ok(())
}

pub(crate) fn register_command<S: EngineState + HasComponent<Component>>(index: usize) -> Command<S> {
    Command::Execution(register_primitive_fn::<S>, Some(register_tag(index)))
}

/// Get the `\countdef` command.
///
/// The syntax is `\countdef <control sequence> <optional equals> <register index>`.
pub fn get_countdef<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(countdef_primitive_fn)
        .with_tag(COUNTDEF_TAG.get())
        .with_doc(COUNTDEF_DOC)
}

fn countdef_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let (_, command_ref) = parse::parse_command_ref(input.unexpanded())?;
    OptionalEquals::parse(input)?;
    let index = parse_index(token, input.expanded())?;
    log::debug!(
        "binding {} to \\count{index} ({scope:?})",
        command_ref.to_string(input.engine().cs_name_interner())
    );
    input
        .commands_map_mut()
        .insert(command_ref, register_command(index), scope);
    Ok(())
}

/// Get the `\newcount` command.
///
/// The new binding is always global.
pub fn get_newcount<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(newcount_primitive_fn).with_doc(NEWCOUNT_DOC)
}

fn newcount_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    let (_, command_ref) = parse::parse_command_ref(input.unexpanded())?;
    let index = match input.state_mut().component_mut().allocate() {
        Some(index) => index,
        None => {
            return Err(input.error(
                error::SimpleTokenError::new(token, "no more registers can be allocated")
                    .with_note(format!(
                        "\\newcount allocates registers {FIRST_ALLOCATED_REGISTER} to {}",
                        NUM_REGISTERS - 1
                    )),
            ))
        }
    };
    log::debug!(
        "allocated \\count{index} for {}",
        command_ref.to_string(input.engine().cs_name_interner())
    );
    input
        .commands_map_mut()
        .insert(command_ref, register_command(index), Scope::Global);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Advance,
    Multiply,
    Divide,
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Advance => "\\advance",
            Op::Multiply => "\\multiply",
            Op::Divide => "\\divide",
        }
    }

    fn apply(&self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            Op::Advance => lhs.checked_add(rhs),
            Op::Multiply => lhs.checked_mul(rhs),
            // Rounds towards zero. Division by zero gives None.
            Op::Divide => lhs.checked_div(rhs),
        }
    }
}

/// Get the `\advance` command.
///
/// The syntax is `\advance <register> <optional by> <integer>`.
pub fn get_advance<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(advance_primitive_fn)
        .with_tag(ADVANCE_TAG.get())
        .with_doc(ADVANCE_DOC)
}

/// Get the `\multiply` command.
pub fn get_multiply<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(multiply_primitive_fn)
        .with_tag(MULTIPLY_TAG.get())
        .with_doc(MULTIPLY_DOC)
}

/// Get the `\divide` command.
pub fn get_divide<S: EngineState + HasComponent<Component>>() -> BuiltIn<S> {
    BuiltIn::new_execution(divide_primitive_fn)
        .with_tag(DIVIDE_TAG.get())
        .with_doc(DIVIDE_DOC)
}

fn advance_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    arithmetic(token, input, Op::Advance)
}

fn multiply_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    arithmetic(token, input, Op::Multiply)
}

fn divide_primitive_fn<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> Result<()> {
    arithmetic(token, input, Op::Divide)
}

fn arithmetic<S: EngineState + HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
    op: Op,
) -> Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let target = input.next_or_else(|| {
        error::EndOfInputError::new(format!("reading the register after {}", op.name()))
            .with_note("a register like \\count1 or a command defined by \\countdef was expected")
    })?;
    let tag = match target.value() {
        Value::CommandRef(command_ref) => input.commands_map().get_tag(&command_ref),
        _ => None,
    };
    let index = match tag {
        Some(tag) => register_ref(target, tag, input.expanded())?,
        None => None,
    };
    let index = match index {
        Some(index) => index,
        None => {
            let found = parse::describe(target, input.engine().cs_name_interner());
            return Err(input.error(
                error::SimpleTokenError::new(
                    target,
                    format!("expected a register after {}, found {found}", op.name()),
                )
                .with_note("a register like \\count1 or a command defined by \\countdef was expected"),
            ));
        }
    };
    OptionalBy::parse(input)?;
    let operand = i32::parse(input)?;
    let value = input.state().component().get(index);
    match op.apply(value, operand) {
        Some(result) => {
            log::debug!(
                "{} \\count{index}: {value} -> {result} ({scope:?})",
                op.name()
            );
            input.state_mut().component_mut().set(index, result, scope);
            Ok(())
        }
        None => Err(input.error(
            error::SimpleTokenError::new(
                token,
                format!("arithmetic overflow in {} of {value} by {operand}", op.name()),
            )
            .with_note("register values must be between -2147483648 and 2147483647, and division by zero is not allowed"),
        )),
    }
}
