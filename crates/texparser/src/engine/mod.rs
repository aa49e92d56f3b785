//! The expansion engine.
//!
//! The [Engine] owns everything needed to turn TeX source into expanded tokens:
//! the stack of sources being lexed, the category code table, the commands map,
//! the group stack and the buffer of tokens produced by expansion.
//!
//! The engine is pull based.
//! Each call to [Engine::next] reads and expands input until a token is ready for
//! the consumer.
//! Along the way execution primitives like `\def` run and change the engine's state.
//! How the engine reacts to each kind of token is described on [Engine::next].

use crate::command;
use crate::command::BuiltIn;
use crate::command::Command;
use crate::conditional;
use crate::error;
use crate::prelude as txl;
use crate::texmacro;
use crate::token;
use crate::token::catcode::{CatCode, CatCodeTable};
use crate::token::lexer;
use crate::token::trace;
use crate::token::{CommandRef, CsNameInterner, Token, Value};
use std::collections::VecDeque;
use texparser_stdext::algorithms::spellcheck;
use texparser_stdext::collections::scopedmap::Scope;

mod streams;
pub use streams::*;

/// Implementations of this trait may be used as the state in an [Engine].
///
/// The trait has no required methods, so for any type it can be implemented trivially:
/// ```
/// # use texparser::engine::EngineState;
/// struct SomeNewType;
///
/// impl EngineState for SomeNewType {}
/// ```
///
/// The methods are invoked at certain points when the engine is running
/// and offer a way of customizing its behavior.
/// They are dispatched statically.
pub trait EngineState: Sized {
    /// Hook that is invoked after a TeX macro is expanded.
    ///
    /// The expansion is reversed: the first token of the expansion is the last element.
    /// The default implementation logs the expansion at trace level.
    fn post_macro_expansion_hook(
        token: Token,
        input: &ExpansionInput<Self>,
        tex_macro: &texmacro::Macro,
        arguments: &[&[Token]],
        reversed_expansion: &[Token],
    ) {
        _ = (tex_macro, arguments);
        if log::log_enabled!(log::Level::Trace) {
            let interner = input.engine().cs_name_interner();
            let expansion: Vec<Token> = reversed_expansion.iter().rev().copied().collect();
            log::trace!(
                "{} -> {}",
                token.text(interner),
                token::write_tokens(&expansion, interner)
            );
        }
    }

    /// Hook that potentially overrides the expansion of a command.
    ///
    /// This hook is invoked before an expandable primitive is expanded.
    /// If the hook returns a token, that token is the result of the expansion and
    /// it is not expanded again.
    ///
    /// This hook is designed to support the `\noexpand` primitive.
    fn expansion_override_hook(
        token: Token,
        input: &mut ExpansionInput<Self>,
        tag: Option<command::Tag>,
    ) -> txl::Result<Option<Token>> {
        _ = (token, input, tag);
        Ok(None)
    }

    /// Hook that is invoked when the input has been fully consumed.
    ///
    /// Tokens emitted by the hook are returned before the stream ends.
    fn end_of_input_hook(input: &mut ExecutionInput<Self>) -> txl::Result<()> {
        _ = input;
        Ok(())
    }

    /// Hook that determines the scope of an assignment.
    ///
    /// This hook is designed to support the `\global` prefix.
    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        _ = state;
        Scope::Local
    }

    /// Hook that is invoked after a group begins.
    ///
    /// State that follows TeX's grouping rules, like registers, opens a new scope here.
    fn begin_group_hook(state: &mut Self) {
        _ = state;
    }

    /// Hook that is invoked after a group ends.
    ///
    /// State that opened a scope in [EngineState::begin_group_hook] ends it here.
    fn end_group_hook(state: &mut Self) {
        _ = state;
    }

    /// Hook that reads an internal integer, like the value of a register, when a number
    /// is expected.
    ///
    /// The token is the first token of the number after any signs.
    /// It is a control sequence or active character that is not expandable.
    /// If the token refers to an internal integer the hook reads the rest of the quantity,
    /// like the index after `\count`, and returns its value.
    /// Otherwise it returns [None] and the number is invalid.
    fn internal_integer_hook(
        token: Token,
        input: &mut ExpandedStream<Self>,
    ) -> txl::Result<Option<i32>> {
        _ = (token, input);
        Ok(None)
    }
}

impl EngineState for () {}

/// What to do with a control sequence or active character that has no definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UndefinedCommandPolicy {
    /// Return an undefined control sequence error.
    #[default]
    Error,
    /// Pass the token through to the consumer unchanged and log a warning.
    PassThrough,
}

/// Options for an [Engine].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    /// Maximum number of expansions between two tokens delivered to the consumer.
    ///
    /// Exceeding the limit is an [error::Kind::ExpansionDepthExceeded] error.
    pub max_expansions: usize,
    pub undefined_command: UndefinedCommandPolicy,
    /// Category codes to use instead of the defaults.
    pub cat_code_overrides: Vec<(char, CatCode)>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_expansions: 100_000,
            undefined_command: Default::default(),
            cat_code_overrides: vec![],
        }
    }
}

/// Encoding of a source given as bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

/// The kind of a group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// A group started by a begin group character like `{`.
    Brace,
    /// A group started by `\begingroup`.
    SemiSimple,
    /// A group started by a LaTeX `\begin{...}`.
    Environment,
}

impl GroupKind {
    pub fn opener(&self) -> &'static str {
        match self {
            GroupKind::Brace => "begin group character {",
            GroupKind::SemiSimple => "\\begingroup",
            GroupKind::Environment => "\\begin",
        }
    }

    pub fn terminator(&self) -> &'static str {
        match self {
            GroupKind::Brace => "end group character }",
            GroupKind::SemiSimple => "\\endgroup",
            GroupKind::Environment => "\\end",
        }
    }
}

#[derive(Debug)]
struct Group {
    kind: GroupKind,
    opened_by: Token,
}

/// The TeX expansion engine.
pub struct Engine<S> {
    /// The custom state.
    pub state: S,
    pub options: Options,
    commands_map: command::Map<S>,
    internal: Internal,
}

#[derive(Default)]
struct Internal {
    // The innermost source is the last element.
    sources: Vec<lexer::Lexer>,
    // Tokens to read before returning to the sources.
    // The next token is the last element.
    expansions: Vec<Token>,
    // Indices into expansions of tokens that must not be expanded when read.
    // Sorted in increasing order.
    frozen: Vec<usize>,
    output: VecDeque<Token>,
    token_buffers: Vec<Vec<Token>>,
    cat_codes: CatCodeTable,
    interner: CsNameInterner,
    tracer: trace::Tracer,
    groups: Vec<Group>,
    branches: Vec<conditional::Branch>,
    expansions_since_output: usize,
    num_expansions: usize,
    end_of_input_key: Option<trace::Key>,
    finished: bool,
}

impl Internal {
    #[inline]
    fn pop_expansion(&mut self) -> Option<Token> {
        let token = self.expansions.pop()?;
        if self.frozen.last() == Some(&self.expansions.len()) {
            self.frozen.pop();
        }
        Some(token)
    }

    #[inline]
    fn front_is_frozen(&self) -> bool {
        match self.frozen.last() {
            None => false,
            Some(i) => *i + 1 == self.expansions.len(),
        }
    }

    fn push_frozen(&mut self, token: Token) {
        self.frozen.push(self.expansions.len());
        self.expansions.push(token);
    }

    fn push_expansion(&mut self, expansion: &[Token]) {
        self.expansions.extend(expansion.iter().rev());
    }
}

impl<S> Engine<S> {
    /// Create a new engine with no primitives defined.
    pub fn new(state: S, options: Options) -> Engine<S> {
        let mut internal = Internal::default();
        for (c, cat_code) in &options.cat_code_overrides {
            internal.cat_codes.set(*c, *cat_code, Scope::Global);
        }
        Engine {
            state,
            options,
            commands_map: Default::default(),
            internal,
        }
    }

    /// Add source code to the front of the input.
    ///
    /// The new source is read before any source that was added previously.
    pub fn push_source(&mut self, name: &str, source_code: &str) {
        let keys = self.internal.tracer.register_source(name, source_code);
        self.internal.end_of_input_key = Some(keys.end());
        self.internal.finished = false;
        self.internal
            .sources
            .push(lexer::Lexer::new(source_code, keys));
    }

    /// Add source code given as bytes to the front of the input.
    ///
    /// Invalid UTF-8 is a lexing error that points at the first invalid byte.
    pub fn push_source_bytes(
        &mut self,
        name: &str,
        source_code: &[u8],
        encoding: Encoding,
    ) -> txl::Result<()> {
        match encoding {
            Encoding::Latin1 => {
                let s: String = source_code.iter().map(|b| *b as char).collect();
                self.push_source(name, &s);
            }
            Encoding::Utf8 => match std::str::from_utf8(source_code) {
                Ok(s) => self.push_source(name, s),
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    let prefix = std::str::from_utf8(&source_code[..valid_up_to]).unwrap_or_default();
                    let keys = self.internal.tracer.register_source(name, prefix);
                    let token = Token::new_other(char::REPLACEMENT_CHARACTER, keys.end());
                    return Err(self.error(error::InvalidCharacterError {
                        token,
                        description: format!(
                            "invalid UTF-8 byte 0x{:02x}",
                            source_code[valid_up_to]
                        ),
                    }));
                }
            },
        }
        Ok(())
    }

    /// Lexes the source without performing any expansion.
    ///
    /// The current category codes are used.
    /// Nothing the tokens refer to is executed, so category code changes in the source
    /// have no effect.
    pub fn tokenize(&mut self, name: &str, source_code: &str) -> RawTokens<'_, S> {
        let keys = self.internal.tracer.register_source(name, source_code);
        RawTokens {
            lexer: lexer::Lexer::new(source_code, keys),
            engine: self,
            failed: false,
        }
    }

    /// Returns an iterator over the expanded tokens.
    ///
    /// The iterator stops after the first error.
    pub fn tokens(&mut self) -> Tokens<'_, S> {
        Tokens {
            engine: self,
            failed: false,
        }
    }

    /// Registers a primitive.
    ///
    /// Primitives are always defined globally.
    pub fn register_primitive(&mut self, name: &str, built_in: BuiltIn<S>) {
        let cs_name = self.internal.interner.get_or_intern(name);
        self.commands_map.register_built_in(cs_name, built_in);
    }

    /// Registers all of the primitives.
    pub fn register_primitives<'a, I>(&mut self, built_ins: I)
    where
        I: IntoIterator<Item = (&'a str, BuiltIn<S>)>,
    {
        for (name, built_in) in built_ins {
            self.register_primitive(name, built_in);
        }
    }

    /// Defines a macro as if by `\def\name<parameter_text>{<replacement_text>}`.
    ///
    /// The name is given without the escape character.
    /// Both texts are lexed using the current category codes.
    pub fn define_macro(
        &mut self,
        name: &str,
        parameter_text: &str,
        replacement_text: &str,
        scope: Scope,
    ) -> txl::Result<()> {
        let parameter_tokens = self.lex_all(&format!("<parameter text of \\{name}>"), parameter_text)?;
        let mut replacement_tokens =
            self.lex_all(&format!("<replacement text of \\{name}>"), replacement_text)?;
        let opening_brace = Token::new_begin_group('{', trace::Key::dummy());
        let parameter_text = texmacro::parse_parameter_text(&parameter_tokens, opening_brace)
            .map_err(|err| self.error(err))?;
        if let Some(token) = parameter_text.trailing_begin_group {
            replacement_tokens.push(token);
        }
        let replacements = texmacro::parse_replacement_text(
            &replacement_tokens,
            parameter_text.parameters.len(),
        )
        .map_err(|err| self.error(err))?;
        let tex_macro = texmacro::Macro::new(
            parameter_text.prefix,
            parameter_text.parameters,
            replacements,
            texmacro::ExpansionKind::OnUse,
        );
        log::debug!("defining macro \\{name} ({scope:?})");
        let cs_name = self.internal.interner.get_or_intern(name);
        self.commands_map
            .insert_macro(CommandRef::ControlSequence(cs_name), tex_macro, scope);
        Ok(())
    }

    fn lex_all(&mut self, origin: &str, source_code: &str) -> txl::Result<Vec<Token>> {
        let mut result = vec![];
        for token in self.tokenize(origin, source_code) {
            result.push(token?);
        }
        Ok(result)
    }

    /// Sets the category code of a character.
    ///
    /// Only characters that have not been lexed yet are affected.
    pub fn set_cat_code(&mut self, c: char, cat_code: CatCode, scope: Scope) {
        self.internal.cat_codes.set(c, cat_code, scope);
    }

    pub fn cat_code(&self, c: char) -> CatCode {
        self.internal.cat_codes.cat_code(c)
    }

    /// Returns the number of open groups, including the implicit outermost group.
    pub fn group_depth(&self) -> usize {
        self.internal.groups.len() + 1
    }

    /// Returns the commands map.
    pub fn commands_map(&self) -> &command::Map<S> {
        &self.commands_map
    }

    /// Returns the commands map.
    ///
    /// Changes made through this reference are subject to the usual scoping rules.
    pub fn commands_map_mut(&mut self) -> &mut command::Map<S> {
        &mut self.commands_map
    }

    pub fn cs_name_interner(&self) -> &CsNameInterner {
        &self.internal.interner
    }

    pub fn cs_name_interner_mut(&mut self) -> &mut CsNameInterner {
        &mut self.internal.interner
    }

    /// Returns the total number of expansions performed so far.
    pub fn num_expansions(&self) -> usize {
        self.internal.num_expansions
    }

    /// Returns the documentation of the command the name refers to.
    pub fn doc(&self, name: &str) -> Option<String> {
        let cs_name = self.internal.interner.get(name)?;
        let command_ref = CommandRef::ControlSequence(cs_name);
        if let Some(doc) = self.commands_map.doc(&command_ref) {
            return Some(doc.to_string());
        }
        match self.commands_map.resolve(&command_ref)? {
            Command::Macro(tex_macro) => Some(tex_macro.doc(&self.internal.interner)),
            command => Some(format!("{command}")),
        }
    }

    /// Returns a trace pointing at the token.
    pub fn trace(&self, token: Token) -> trace::SourceCodeTrace {
        self.internal
            .tracer
            .trace(token.trace_key(), token.text(&self.internal.interner))
    }

    /// Returns a trace pointing at the end of the input.
    pub fn trace_end_of_input(&self) -> trace::SourceCodeTrace {
        let key = self.internal.end_of_input_key.unwrap_or_else(trace::Key::dummy);
        self.internal.tracer.trace(key, String::new())
    }

    /// Builds a positioned error from the error.
    pub fn error<E: error::TexError>(&self, err: E) -> Box<error::Error> {
        error::Error::new(self, err)
    }

    #[inline]
    fn emit(&mut self, token: Token) {
        self.internal.output.push_back(token);
    }
}

impl<S: EngineState> Engine<S> {
    /// Begins a new group.
    pub fn begin_group(&mut self, kind: GroupKind, opened_by: Token) {
        self.internal.groups.push(Group { kind, opened_by });
        self.commands_map.begin_scope();
        self.internal.cat_codes.begin_scope();
        S::begin_group_hook(&mut self.state);
        log::debug!("began group ({kind:?}), depth is now {}", self.group_depth());
    }

    /// Ends the innermost group, undoing all local assignments made in it.
    ///
    /// It is an error if there is no group, or if the group is of a different kind.
    pub fn end_group(&mut self, kind: GroupKind, token: Token) -> txl::Result<()> {
        match self.internal.groups.last() {
            None => {
                return Err(self.error(error::UnbalancedGroupError {
                    token,
                    got: kind,
                    open: None,
                }))
            }
            Some(group) if group.kind != kind => {
                let open = Some(group.kind);
                return Err(self.error(error::UnbalancedGroupError {
                    token,
                    got: kind,
                    open,
                }));
            }
            Some(_) => {}
        }
        self.internal.groups.pop();
        self.commands_map.end_scope();
        self.internal.cat_codes.end_scope();
        S::end_group_hook(&mut self.state);
        log::debug!("ended group ({kind:?}), depth is now {}", self.group_depth());
        Ok(())
    }

    /// Returns the next expanded token, or [None] if the input has been consumed.
    ///
    /// Each token read from the input after expansion is handled as follows:
    ///
    /// | token | example | action |
    /// | --- | --- | --- |
    /// | execution command | `\def` | run the command |
    /// | character token alias | `\a` after `\let\a=b` | handle the aliased character |
    /// | begin group character | `{` | begin a group and return the token |
    /// | end group character | `}` | end the current group and return the token |
    /// | other character | `b` | return the token |
    /// | unexpanded expandable command | `\foo` in `\noexpand\foo` | nothing, like `\relax` |
    /// | undefined command | `\foo` with no definition | depends on [Options::undefined_command] |
    ///
    /// When the input ends it is an error if a group or conditional is still open.
    pub fn next(&mut self) -> txl::Result<Option<Token>> {
        loop {
            if let Some(token) = self.internal.output.pop_front() {
                self.internal.expansions_since_output = 0;
                return Ok(Some(token));
            }
            if self.internal.finished {
                return Ok(None);
            }
            match streams::next_expanded(self)? {
                None => self.finish()?,
                Some(token) => self.handle(token)?,
            }
        }
    }

    fn handle(&mut self, token: Token) -> txl::Result<()> {
        match token.value() {
            Value::BeginGroup(_) => {
                self.begin_group(GroupKind::Brace, token);
                self.emit(token);
            }
            Value::EndGroup(_) => {
                self.end_group(GroupKind::Brace, token)?;
                self.emit(token);
            }
            Value::CommandRef(command_ref) => match self.commands_map.resolve(&command_ref) {
                Some(Command::Execution(cmd, _)) => {
                    let cmd = *cmd;
                    if let Err(mut err) = cmd(token, ExecutionInput::new(self)) {
                        err.add_context(error::OperationKind::Execution, self.trace(token));
                        return Err(err);
                    }
                }
                Some(Command::CharacterTokenAlias(value)) => {
                    let value = *value;
                    self.handle(Token::new(value, token.trace_key()))?;
                }
                Some(Command::Expansion(..) | Command::Macro(..)) => {}
                None => match self.options.undefined_command {
                    UndefinedCommandPolicy::Error => {
                        return Err(self.undefined_command_error(token, command_ref));
                    }
                    UndefinedCommandPolicy::PassThrough => {
                        log::warn!(
                            "passing through undefined control sequence {}",
                            command_ref.to_string(&self.internal.interner)
                        );
                        self.emit(token);
                    }
                },
            },
            Value::MathShift(_)
            | Value::AlignmentTab(_)
            | Value::Parameter(_)
            | Value::Superscript(_)
            | Value::Subscript(_)
            | Value::Space(_)
            | Value::Letter(_)
            | Value::Other(_) => self.emit(token),
        }
        Ok(())
    }

    fn finish(&mut self) -> txl::Result<()> {
        if let Some(group) = self.internal.groups.last() {
            return Err(self.error(error::UnterminatedGroupError {
                opened_by: group.opened_by,
                kind: group.kind,
                depth: self.internal.groups.len(),
            }));
        }
        if let Some(branch) = self.internal.branches.last() {
            return Err(self.error(conditional::UnbalancedConditionalError::unterminated(
                branch.token(),
            )));
        }
        self.internal.finished = true;
        S::end_of_input_hook(ExecutionInput::new(self))
    }

    fn undefined_command_error(&self, token: Token, command_ref: CommandRef) -> Box<error::Error> {
        let name = command_ref.to_string(&self.internal.interner);
        let suggestions = match command_ref {
            CommandRef::ActiveCharacter(_) => vec![],
            CommandRef::ControlSequence(cs_name) => {
                let word = self.internal.interner.resolve(cs_name).unwrap_or_default();
                let dictionary = self
                    .commands_map
                    .cs_names()
                    .filter_map(|cs_name| self.internal.interner.resolve(cs_name));
                spellcheck::find_close_words(dictionary, word, 2, 3)
                    .into_iter()
                    .map(|s| format!("\\{s}"))
                    .collect()
            }
        };
        self.error(error::UndefinedControlSequenceError {
            token,
            name,
            suggestions,
        })
    }
}

/// Iterator over expanded tokens returned by [Engine::tokens].
pub struct Tokens<'a, S> {
    engine: &'a mut Engine<S>,
    failed: bool,
}

impl<S: EngineState> Iterator for Tokens<'_, S> {
    type Item = txl::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.engine.next() {
            Ok(None) => None,
            Ok(Some(token)) => Some(Ok(token)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Iterator over raw tokens returned by [Engine::tokenize].
pub struct RawTokens<'a, S> {
    engine: &'a mut Engine<S>,
    lexer: lexer::Lexer,
    failed: bool,
}

impl<S> Iterator for RawTokens<'_, S> {
    type Item = txl::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let internal = &mut self.engine.internal;
        match self.lexer.next(&internal.cat_codes, &mut internal.interner) {
            Ok(None) => None,
            Ok(Some(token)) => Some(Ok(token)),
            Err(lexer::Error::InvalidCharacter(c, trace_key)) => {
                self.failed = true;
                Some(Err(invalid_character_error(self.engine, c, trace_key)))
            }
        }
    }
}

fn invalid_character_error<S>(
    engine: &Engine<S>,
    c: char,
    trace_key: trace::Key,
) -> Box<error::Error> {
    engine.error(error::InvalidCharacterError {
        token: Token::new_other(c, trace_key),
        description: format!("invalid character {c:?} (U+{:04X})", c as u32),
    })
}

/// Implementations of this trait may be used as the state of an engine that includes
/// the component `C`.
///
/// Primitives that need their own state define a component type and require the
/// engine state to contain it.
/// The [implement_has_component] macro implements the trait.
pub trait HasComponent<C> {
    /// Return a immutable reference to the component.
    fn component(&self) -> &C;

    /// Return a mutable reference to the component.
    fn component_mut(&mut self) -> &mut C;
}

/// This macro is for implementing the [HasComponent] trait in the special (but common)
/// case when the state is a struct and the component is a direct field of the struct.
///
/// ```
/// # mod mylibrary1{
/// #   pub struct Component;
/// # }
/// # mod mylibrary2{
/// #   pub struct Component;
/// # }
/// # use texparser::engine::implement_has_component;
/// # use texparser::engine::EngineState;
/// #
/// struct MyState {
///     component_1: mylibrary1::Component,
///     component_2: mylibrary2::Component,
/// }
///
/// impl EngineState for MyState {}
///
/// implement_has_component![
///     MyState,
///     (mylibrary1::Component, component_1),
///     (mylibrary2::Component, component_2),
/// ];
/// ```
#[macro_export]
macro_rules! implement_has_component {
    ( $type: path, $component: path, $field: ident ) => {
        $crate::implement_has_component![$type, ($component, $field),];
    };
    ( $type: path, $(($component: path, $field: ident),)+) => {
        $(
            impl $crate::engine::HasComponent<$component> for $type {
                #[inline]
                fn component(&self) -> &$component {
                    &self.$field
                }
                #[inline]
                fn component_mut(&mut self) -> &mut $component {
                    &mut self.$field
                }
            }
        )*
    };
}

pub use implement_has_component;

#[cfg(test)]
mod tests {
    use super::*;

    fn run(engine: &mut Engine<()>) -> Result<String, Box<error::Error>> {
        let mut tokens = vec![];
        for token in engine.tokens() {
            tokens.push(token?);
        }
        Ok(token::write_tokens(&tokens, engine.cs_name_interner()))
    }

    fn new_engine(source: &str) -> Engine<()> {
        let mut engine = Engine::new((), Options::default());
        engine.push_source("input.tex", source);
        engine
    }

    #[test]
    fn characters_pass_through() {
        let mut engine = new_engine("abc");
        assert_eq!(run(&mut engine).unwrap(), "abc");
    }

    #[test]
    fn tokens_trace_after_their_source_is_exhausted() {
        let mut engine = new_engine("\\foo");
        engine.define_macro("foo", "", "xy", Scope::Local).unwrap();
        let tokens: Vec<Token> = engine.tokens().collect::<txl::Result<_>>().unwrap();
        engine.push_source("second.tex", "z");
        assert_eq!(run(&mut engine).unwrap(), "z");

        let trace = engine.trace(tokens[1]);
        assert_eq!(trace.origin, "<replacement text of \\foo>");
        assert_eq!(trace.line_content, "xy");
        assert_eq!(trace.position.column, 2);
    }

    #[test]
    fn macro_with_two_parameters() {
        let mut engine = new_engine("\\foo{X}{Y}");
        engine
            .define_macro("foo", "#1#2", "#2#1", Scope::Local)
            .unwrap();
        assert_eq!(run(&mut engine).unwrap(), "YX");
    }

    #[test]
    fn delimited_parameter_respects_braces() {
        let mut engine = new_engine("\\foo a{.}b.c");
        engine
            .define_macro("foo", "#1.", "(#1)", Scope::Local)
            .unwrap();
        assert_eq!(run(&mut engine).unwrap(), "(a{.}b)c");
    }

    #[test]
    fn delimited_parameter_strips_single_group() {
        let mut engine = new_engine("\\foo{a.b}.");
        engine
            .define_macro("foo", "#1.", "(#1)", Scope::Local)
            .unwrap();
        assert_eq!(run(&mut engine).unwrap(), "(a.b)");
    }

    #[test]
    fn prefix_mismatch() {
        let mut engine = new_engine("\\foo b");
        engine.define_macro("foo", "a", "", Scope::Local).unwrap();
        let err = run(&mut engine).unwrap_err();
        assert_eq!(err.kind(), error::Kind::ParameterMatch);
    }

    #[test]
    fn infinite_recursion() {
        let mut engine = new_engine("\\loop");
        engine.options.max_expansions = 100;
        engine
            .define_macro("loop", "", "\\loop", Scope::Local)
            .unwrap();
        let err = run(&mut engine).unwrap_err();
        assert_eq!(err.kind(), error::Kind::ExpansionDepthExceeded);
    }

    #[test]
    fn unterminated_group() {
        let mut engine = new_engine("x\n{abc");
        let err = run(&mut engine).unwrap_err();
        assert_eq!(err.kind(), error::Kind::UnterminatedGroup);
        assert_eq!(err.position().line, 2);
        assert_eq!(err.position().column, 1);
    }

    #[test]
    fn unbalanced_group() {
        let mut engine = new_engine("abc}");
        let err = run(&mut engine).unwrap_err();
        assert_eq!(err.kind(), error::Kind::UnbalancedGroup);
    }

    #[test]
    fn local_macro_is_undone() {
        let mut engine = new_engine("{\\a}\\a");
        engine.options.undefined_command = UndefinedCommandPolicy::PassThrough;
        let mut tokens = vec![];
        engine.begin_group(GroupKind::Brace, Token::new_begin_group('{', trace::Key::dummy()));
        engine.define_macro("a", "", "A", Scope::Local).unwrap();
        engine
            .end_group(GroupKind::Brace, Token::new_end_group('}', trace::Key::dummy()))
            .unwrap();
        for token in engine.tokens() {
            tokens.push(token.unwrap());
        }
        assert_eq!(
            token::write_tokens(&tokens, engine.cs_name_interner()),
            "{\\a}\\a"
        );
    }

    #[test]
    fn undefined_command() {
        let mut engine = new_engine("\\fooo");
        engine.define_macro("foo", "", "", Scope::Local).unwrap();
        let err = run(&mut engine).unwrap_err();
        assert_eq!(err.kind(), error::Kind::UndefinedControlSequence);
        assert_eq!(err.notes(), &["did you mean \\foo?".to_string()]);
    }

    #[test]
    fn undefined_command_pass_through() {
        let mut engine = new_engine("a\\foo b");
        engine.options.undefined_command = UndefinedCommandPolicy::PassThrough;
        assert_eq!(run(&mut engine).unwrap(), "a\\foo b");
    }

    #[test]
    fn group_depth() {
        let mut engine = new_engine("{{a}");
        assert_eq!(engine.group_depth(), 1);
        let mut tokens = engine.tokens();
        tokens.next();
        tokens.next();
        drop(tokens);
        assert_eq!(engine.group_depth(), 3);
    }

    #[test]
    fn invalid_utf8() {
        let mut engine = Engine::new((), Options::default());
        let err = engine
            .push_source_bytes("input.tex", b"ab\ncd\xffe", Encoding::Utf8)
            .unwrap_err();
        assert_eq!(err.kind(), error::Kind::Lex);
        assert_eq!(err.position().line, 2);
        assert_eq!(err.position().column, 3);
        assert_eq!(err.position().byte_offset, 5);
    }

    #[test]
    fn latin1() {
        let mut engine = Engine::new((), Options::default());
        engine
            .push_source_bytes("input.tex", b"caf\xe9", Encoding::Latin1)
            .unwrap();
        assert_eq!(run(&mut engine).unwrap(), "café");
    }

    #[test]
    fn tokenize_does_not_expand() {
        let mut engine = Engine::new((), Options::default());
        engine.define_macro("a", "", "A", Scope::Local).unwrap();
        let tokens: Vec<Token> = engine
            .tokenize("input.tex", "\\a b")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn cat_code_overrides() {
        let mut options = Options::default();
        options.cat_code_overrides.push(('@', CatCode::Letter));
        let engine = Engine::new((), options);
        assert_eq!(engine.cat_code('@'), CatCode::Letter);
    }
}
