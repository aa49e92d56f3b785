use super::*;
use crate::command;
use crate::error;
use crate::prelude as txl;
use crate::token;
use crate::token::{CsNameInterner, Token};

/// A stream of tokens generated on demand.
///
/// The front of the stream may be retrieved using [TokenStream::next] or peeked at using
/// [TokenStream::peek].
/// In practice every stream is one of [UnexpandedStream], [ExpandedStream],
/// [ExpansionInput] or [ExecutionInput].
/// This trait exists to allow a generic function to accept any of these types.
///
/// # Note on lazy loading
///
/// The contents of a stream cannot be determined in advance because the tokens already
/// read can change how the rest of the input is lexed.
/// The classic example is the following LaTeX snippet:
/// ```tex
/// \makeatletter \do@
/// ```
/// With the default category codes a batch lexer would produce the control sequence
/// `\do` followed by the character `@`.
/// But `\makeatletter` makes `@` a letter, so the correct second token is `\do@`.
pub trait TokenStream {
    /// The type of the custom state in the engine.
    type S;

    /// Gets the next token in the stream.
    ///
    /// As with iterators, a result of `Ok(None)` indicates that the stream is exhausted.
    fn next(&mut self) -> txl::Result<Option<Token>>;

    /// Peeks at the next token in the stream without removing it.
    ///
    /// Peeking requires a mutable reference because determining the next token may
    /// involve lexing more input or expanding a macro.
    /// Expansion performed while peeking is not undone.
    fn peek(&mut self) -> txl::Result<Option<&Token>>;

    /// Consumes the next token in the stream without returning it.
    ///
    /// This is typically used after a peek, when the token itself is not needed.
    fn consume(&mut self) -> txl::Result<()> {
        self.next().map(|_| ())
    }

    /// Returns a reference to the engine.
    fn engine(&self) -> &Engine<Self::S>;

    /// Returns a reference to the commands map.
    #[inline]
    fn commands_map(&self) -> &command::Map<Self::S> {
        &self.engine().commands_map
    }

    /// Returns a reference to the custom state.
    #[inline]
    fn state(&self) -> &Self::S {
        &self.engine().state
    }

    /// Builds a positioned error from the error.
    fn error<E: error::TexError>(&self, err: E) -> Box<error::Error> {
        self.engine().error(err)
    }

    /// Gets the next token, or returns the error built by the function if the stream is exhausted.
    fn next_or_else<E: error::TexError, F: FnOnce() -> E>(&mut self, f: F) -> txl::Result<Token> {
        match self.next()? {
            Some(token) => Ok(token),
            None => Err(self.error(f())),
        }
    }
}

/// Stream that returns input tokens without performing expansion.
///
/// This stream is used when reading tokens that must not be expanded,
/// like the arguments of a macro or the replacement text in `\def`.
#[repr(transparent)]
pub struct UnexpandedStream<S>(Engine<S>);

impl<S> TokenStream for UnexpandedStream<S> {
    type S = S;

    #[inline]
    fn next(&mut self) -> txl::Result<Option<Token>> {
        next_unexpanded(&mut self.0)
    }

    #[inline]
    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        peek_unexpanded(&mut self.0)
    }

    #[inline]
    fn engine(&self) -> &Engine<S> {
        &self.0
    }
}

/// A [TokenStream] that performs expansion.
///
/// The unexpanded tokens are retrieved from the stream returned by
/// [unexpanded](ExpandedStream::unexpanded).
#[repr(transparent)]
pub struct ExpandedStream<S>(UnexpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpandedStream<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        self
    }
}

impl<S> ExpandedStream<S> {
    /// Returns the underlying unexpanded stream.
    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0
    }

    /// Returns a mutable reference to the expanded tokens stack.
    ///
    /// The tokens are a stack, so the next token is the last token in the vector.
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        &mut self.0 .0.internal.expansions
    }

    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0 .0.internal.token_buffers.pop().unwrap_or_default()
    }

    /// Return a token buffer, allowing it to be reused.
    pub fn return_token_buffer(&mut self, mut token_buffer: Vec<Token>) {
        token_buffer.clear();
        self.0 .0.internal.token_buffers.push(token_buffer)
    }
}

impl<S: EngineState> ExpandedStream<S> {
    /// Expands the next token in the input.
    ///
    /// Only a single expansion is performed: if the first token of the expansion is
    /// itself expandable it is left alone.
    /// Returns false if the next token is not expandable.
    pub fn expand_once(&mut self) -> txl::Result<bool> {
        expand_once(&mut self.0 .0)
    }
}

impl<S: EngineState> TokenStream for ExpandedStream<S> {
    type S = S;

    #[inline]
    fn next(&mut self) -> txl::Result<Option<Token>> {
        next_expanded(&mut self.0 .0)
    }

    #[inline]
    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        peek_expanded(&mut self.0 .0)
    }

    #[inline]
    fn engine(&self) -> &Engine<S> {
        &self.0 .0
    }
}

/// Input type for expansion primitives.
///
/// This type provides:
///
/// - Access to the input stream, with or without expansion.
///     Its implementation of [TokenStream] returns expanded tokens.
///     To read without expansion use [unexpanded](ExpansionInput::unexpanded).
///
/// - Read only access to the engine and its state.
///
/// - The ability to push tokens to the front of the input, using
///     [ExpansionInput::push_expansion] or [ExpansionInput::expansions_mut].
///
/// - Access to token buffers using the [ExpansionInput::checkout_token_buffer] and
///     [ExpansionInput::return_token_buffer] methods.
#[repr(transparent)]
pub struct ExpansionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpansionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: EngineState> TokenStream for ExpansionInput<S> {
    type S = S;

    fn next(&mut self) -> txl::Result<Option<Token>> {
        self.0.next()
    }

    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        self.0.peek()
    }

    fn engine(&self) -> &Engine<S> {
        self.0.engine()
    }
}

impl<S> ExpansionInput<S> {
    /// Creates a mutable reference to this type from the [Engine] type.
    #[inline]
    pub(crate) fn new(engine: &mut Engine<S>) -> &mut ExpansionInput<S> {
        // SAFETY: ExpansionInput, ExpandedStream and UnexpandedStream are all
        // repr(transparent) wrappers around Engine, so the layouts are identical.
        unsafe { &mut *(engine as *mut Engine<S> as *mut ExpansionInput<S>) }
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn expanded(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }

    /// Push tokens to the front of the input stream.
    ///
    /// The first token in the provided slice will be the next token read.
    #[inline]
    pub fn push_expansion(&mut self, expansion: &[Token]) {
        self.0 .0 .0.internal.push_expansion(expansion)
    }

    /// Returns a reference to the expanded tokens stack.
    ///
    /// The tokens are a stack, so the next token is the last token in the vector.
    #[inline]
    pub fn expansions(&self) -> &Vec<Token> {
        &self.0 .0 .0.internal.expansions
    }

    /// Returns a mutable reference to the expanded tokens stack.
    ///
    /// Adding tokens to the front of the input this way avoids the allocation
    /// in [ExpansionInput::push_expansion].
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0.expansions_mut()
    }

    /// Returns a vector that can be used as a token buffer, potentially without allocating memory.
    ///
    /// The returned vector is empty but generally has capacity left over from previous uses.
    /// A single shared buffer wouldn't work because multiple macros can be in the
    /// middle of reading their arguments at the same time.
    ///
    /// When finished with the buffer, return it using
    /// [return_token_buffer](ExpansionInput::return_token_buffer).
    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0.checkout_token_buffer()
    }

    /// Return a token buffer, allowing it to be reused.
    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0.return_token_buffer(token_buffer)
    }

    /// Returns a mutable reference to the interner.
    ///
    /// Interning a name does not define it, so expansion primitives like `\csname` may use this.
    pub fn cs_name_interner_mut(&mut self) -> &mut CsNameInterner {
        &mut self.0 .0 .0.internal.interner
    }

    /// Returns a mutable reference to the commands map.
    ///
    /// Expansion normally doesn't change the state.
    /// The exception is `\csname`, which defines an undefined name as `\relax`.
    pub fn commands_map_mut(&mut self) -> &mut command::Map<S> {
        &mut self.0 .0 .0.commands_map
    }

    /// Pushes the characters of the string to the front of the input.
    ///
    /// Spaces become space tokens and all other characters become other tokens.
    /// All of the tokens point at the given token in error messages.
    pub fn push_string_tokens(&mut self, token: Token, s: &str) {
        let trace_key = token.trace_key();
        let expansions = self.expansions_mut();
        for c in s.chars().rev() {
            let token = match c {
                ' ' => token::Token::new_space(' ', trace_key),
                _ => token::Token::new_other(c, trace_key),
            };
            expansions.push(token);
        }
    }

    /// Pushes a token that will not be expanded when it is next read.
    ///
    /// This is used by `\noexpand`.
    pub fn push_frozen(&mut self, token: Token) {
        self.0 .0 .0.internal.push_frozen(token)
    }

    #[inline]
    pub(crate) fn branches_mut(&mut self) -> &mut Vec<conditional::Branch> {
        &mut self.0 .0 .0.internal.branches
    }
}

/// Input type for execution primitives.
///
/// This type provides everything [ExpansionInput] does, plus mutable access to the
/// state, the commands map, the category codes and the group stack.
#[repr(transparent)]
pub struct ExecutionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExecutionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: EngineState> TokenStream for ExecutionInput<S> {
    type S = S;

    fn next(&mut self) -> txl::Result<Option<Token>> {
        self.0.next()
    }

    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        self.0.peek()
    }

    fn engine(&self) -> &Engine<S> {
        self.0.engine()
    }
}

impl<S> ExecutionInput<S> {
    /// Creates a mutable reference to this type from the [Engine] type.
    #[inline]
    pub(crate) fn new(engine: &mut Engine<S>) -> &mut ExecutionInput<S> {
        // SAFETY: see ExpansionInput::new.
        unsafe { &mut *(engine as *mut Engine<S> as *mut ExecutionInput<S>) }
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn expanded(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }

    /// Returns a mutable reference to the state.
    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.0 .0 .0.state
    }

    #[inline]
    pub fn commands_map_mut(&mut self) -> &mut command::Map<S> {
        &mut self.0 .0 .0.commands_map
    }

    pub fn cs_name_interner_mut(&mut self) -> &mut CsNameInterner {
        &mut self.0 .0 .0.internal.interner
    }

    /// Sets the category code of a character.
    pub fn set_cat_code(&mut self, c: char, cat_code: CatCode, scope: Scope) {
        self.0 .0 .0.set_cat_code(c, cat_code, scope)
    }

    /// Sends the token to the consumer.
    ///
    /// Emitted tokens are delivered in order before anything else is read from the input.
    pub fn emit(&mut self, token: Token) {
        self.0 .0 .0.emit(token)
    }

    /// Push tokens to the front of the input stream.
    ///
    /// The first token in the provided slice will be the next token read.
    pub fn push_expansion(&mut self, expansion: &[Token]) {
        self.0 .0 .0.internal.push_expansion(expansion)
    }

    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0.expansions_mut()
    }

    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0.checkout_token_buffer()
    }

    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0.return_token_buffer(token_buffer)
    }
}

impl<S: EngineState> ExecutionInput<S> {
    pub fn begin_group(&mut self, kind: GroupKind, token: Token) {
        self.0 .0 .0.begin_group(kind, token)
    }

    pub fn end_group(&mut self, kind: GroupKind, token: Token) -> txl::Result<()> {
        self.0 .0 .0.end_group(kind, token)
    }
}

#[inline]
fn next_unexpanded<S>(engine: &mut Engine<S>) -> txl::Result<Option<Token>> {
    if let Some(token) = engine.internal.pop_expansion() {
        return Ok(Some(token));
    }
    lex_next(engine)
}

fn lex_next<S>(engine: &mut Engine<S>) -> txl::Result<Option<Token>> {
    let internal = &mut engine.internal;
    while let Some(lexer) = internal.sources.last_mut() {
        match lexer.next(&internal.cat_codes, &mut internal.interner) {
            Ok(Some(token)) => return Ok(Some(token)),
            Ok(None) => {
                internal.end_of_input_key = Some(lexer.end_key());
                internal.sources.pop();
            }
            Err(lexer::Error::InvalidCharacter(c, trace_key)) => {
                return Err(invalid_character_error(engine, c, trace_key));
            }
        }
    }
    Ok(None)
}

#[inline]
fn peek_unexpanded<S>(engine: &mut Engine<S>) -> txl::Result<Option<&Token>> {
    if engine.internal.expansions.is_empty() {
        match lex_next(engine)? {
            None => return Ok(None),
            Some(token) => engine.internal.expansions.push(token),
        }
    }
    Ok(engine.internal.expansions.last())
}

enum Outcome {
    NotExpandable,
    Expanded,
    Override(Token),
}

fn expand<S: EngineState>(engine: &mut Engine<S>, token: Token) -> txl::Result<Outcome> {
    let command_ref = match token.value() {
        token::Value::CommandRef(command_ref) => command_ref,
        _ => return Ok(Outcome::NotExpandable),
    };
    match engine.commands_map.resolve(&command_ref) {
        Some(command::Command::Expansion(f, tag)) => {
            let (f, tag) = (*f, *tag);
            count_expansion(engine, token)?;
            let input = ExpansionInput::new(engine);
            if let Some(t) = S::expansion_override_hook(token, input, tag)? {
                return Ok(Outcome::Override(t));
            }
            if let Err(mut err) = f(token, ExpansionInput::new(engine)) {
                err.add_context(error::OperationKind::Expansion, engine.trace(token));
                return Err(err);
            }
            Ok(Outcome::Expanded)
        }
        Some(command::Command::Macro(tex_macro)) => {
            let tex_macro = tex_macro.clone();
            count_expansion(engine, token)?;
            if let Err(mut err) = tex_macro.call(token, ExpansionInput::new(engine)) {
                err.add_context(error::OperationKind::MacroExpansion, engine.trace(token));
                return Err(err);
            }
            Ok(Outcome::Expanded)
        }
        _ => Ok(Outcome::NotExpandable),
    }
}

#[inline]
fn count_expansion<S>(engine: &mut Engine<S>, token: Token) -> txl::Result<()> {
    engine.internal.num_expansions += 1;
    engine.internal.expansions_since_output += 1;
    if engine.internal.expansions_since_output > engine.options.max_expansions {
        return Err(engine.error(error::ExpansionDepthExceededError {
            token,
            limit: engine.options.max_expansions,
        }));
    }
    Ok(())
}

pub(super) fn next_expanded<S: EngineState>(
    engine: &mut Engine<S>,
) -> txl::Result<Option<Token>> {
    loop {
        let frozen = engine.internal.front_is_frozen();
        let token = match next_unexpanded(engine)? {
            None => return Ok(None),
            Some(token) => token,
        };
        if frozen {
            return Ok(Some(token));
        }
        match expand(engine, token)? {
            Outcome::NotExpandable => return Ok(Some(token)),
            Outcome::Override(t) => return Ok(Some(t)),
            Outcome::Expanded => {}
        }
    }
}

fn expand_once<S: EngineState>(engine: &mut Engine<S>) -> txl::Result<bool> {
    if engine.internal.front_is_frozen() {
        return Ok(false);
    }
    let token = match peek_unexpanded(engine)? {
        None => return Ok(false),
        Some(token) => *token,
    };
    engine.internal.pop_expansion();
    match expand(engine, token)? {
        Outcome::NotExpandable => {
            engine.internal.expansions.push(token);
            Ok(false)
        }
        Outcome::Expanded => Ok(true),
        Outcome::Override(t) => {
            engine.internal.push_frozen(t);
            Ok(true)
        }
    }
}

fn peek_expanded<S: EngineState>(engine: &mut Engine<S>) -> txl::Result<Option<&Token>> {
    while expand_once(engine)? {}
    peek_unexpanded(engine)
}
