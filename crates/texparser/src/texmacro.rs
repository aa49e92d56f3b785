//! User defined macros.
//!
//! A macro is created from a *parameter text* and a *replacement text*, as in
//! `\def\name<parameter text>{<replacement text>}`.
//! The parameter text is split into a prefix, which must follow the macro name verbatim
//! whenever the macro is used, and a list of parameters.
//! A parameter followed by more non-parameter tokens is delimited by those tokens;
//! otherwise it is undelimited and takes one token or one braced group.

use crate::engine;
use crate::engine::TokenStream;
use crate::error;
use crate::parse;
use crate::prelude as txl;
use crate::token;
use crate::token::{Token, Value};
use crate::engine::EngineState;
use colored::Colorize;
use texparser_stdext::algorithms::substringsearch::Matcher;

/// When the replacement text of a macro was expanded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpansionKind {
    /// The replacement text is stored as written and expanded after each use, as with `\def`.
    OnUse,
    /// The replacement text was fully expanded when the macro was defined, as with `\edef`.
    OnDefine,
}

/// A TeX Macro.
#[derive(Debug, Clone)]
pub struct Macro {
    prefix: Vec<Token>,
    parameters: Vec<Parameter>,
    replacements: Vec<Replacement>,
    kind: ExpansionKind,
}

/// A token list or parameter in a replacement text.
#[derive(Debug, Clone)]
pub enum Replacement {
    /// A list of tokens, in the order they are written.
    Tokens(Vec<Token>),

    /// A parameter.
    ///
    /// In order to be valid, the parameter's index must be less than the number
    /// of parameters in the macro.
    Parameter(usize),
}

#[derive(Debug, Clone)]
pub enum Parameter {
    Undelimited,
    Delimited(Matcher<Value>),
    /// A LaTeX style optional argument in square brackets, with its default value.
    Optional(Vec<Token>),
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Parameter::Undelimited, Parameter::Undelimited) => true,
            (Parameter::Delimited(a), Parameter::Delimited(b)) => a == b,
            (Parameter::Optional(a), Parameter::Optional(b)) => values_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Macro {
    fn eq(&self, other: &Self) -> bool {
        values_eq(&self.prefix, &other.prefix)
            && self.parameters == other.parameters
            && self.replacements.len() == other.replacements.len()
            && self
                .replacements
                .iter()
                .zip(&other.replacements)
                .all(|pair| match pair {
                    (Replacement::Tokens(a), Replacement::Tokens(b)) => values_eq(a, b),
                    (Replacement::Parameter(i), Replacement::Parameter(j)) => i == j,
                    _ => false,
                })
    }
}

fn values_eq(a: &[Token], b: &[Token]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.value() == b.value())
}

impl Macro {
    /// Create a new macro.
    pub fn new(
        prefix: Vec<Token>,
        parameters: Vec<Parameter>,
        replacements: Vec<Replacement>,
        kind: ExpansionKind,
    ) -> Macro {
        Macro {
            prefix,
            parameters,
            replacements,
            kind,
        }
    }

    pub fn prefix(&self) -> &[Token] {
        &self.prefix
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    pub fn kind(&self) -> ExpansionKind {
        self.kind
    }

    /// Expands the macro.
    ///
    /// The arguments are read from the unexpanded input and the expansion is pushed to the
    /// front of the input, where it will be scanned again.
    pub fn call<S: EngineState>(
        &self,
        token: Token,
        input: &mut engine::ExpansionInput<S>,
    ) -> txl::Result<()> {
        match_prefix(token, &self.prefix, input.unexpanded())?;
        let mut argument_indices: Vec<(usize, usize)> = Vec::with_capacity(self.parameters.len());
        let mut argument_tokens = input.checkout_token_buffer();
        for (i, parameter) in self.parameters.iter().enumerate() {
            let start = argument_tokens.len();
            let trim_outer_braces =
                parameter.parse_argument(token, i + 1, input, &mut argument_tokens)?;
            let end = argument_tokens.len();
            argument_indices.push(match trim_outer_braces {
                true => (start + 1, end - 1),
                false => (start, end),
            });
        }
        let arguments: Vec<&[Token]> = argument_indices
            .iter()
            .map(|(i, j)| &argument_tokens[*i..*j])
            .collect();

        let result = input.expansions_mut();
        let start = result.len();
        perform_replacement(&self.replacements, &arguments, result);
        {
            let shared: &engine::ExpansionInput<S> = input;
            S::post_macro_expansion_hook(
                token,
                shared,
                self,
                &arguments,
                &shared.expansions()[start..],
            );
        }
        drop(arguments);
        input.return_token_buffer(argument_tokens);
        Ok(())
    }

    /// Returns a human readable description of the macro.
    pub fn doc(&self, interner: &token::CsNameInterner) -> String {
        let mut d = String::new();
        d.push_str(match self.kind {
            ExpansionKind::OnUse => "User defined macro\n\n",
            ExpansionKind::OnDefine => "User defined macro (expanded when defined)\n\n",
        });
        d.push_str(&format![
            "{}\n{}",
            "Parameters definition".italic(),
            pretty_print_prefix_and_parameters(&self.prefix, &self.parameters, interner),
        ]);
        d.push_str(&format![
            "\n\n{} `{}`\n",
            "Replacement definition:".italic(),
            pretty_print_replacement_text(&self.replacements, interner),
        ]);
        d
    }
}

fn perform_replacement(
    replacements: &[Replacement],
    arguments: &[&[Token]],
    result: &mut Vec<Token>,
) {
    let mut output_size = 0;
    for replacement in replacements.iter() {
        output_size += match replacement {
            Replacement::Tokens(tokens) => tokens.len(),
            Replacement::Parameter(i) => arguments.get(*i).map(|a| a.len()).unwrap_or(0),
        };
    }
    result.reserve(output_size);
    // The expansions stack is reversed: the next token to be read is the last element.
    for replacement in replacements.iter().rev() {
        match replacement {
            Replacement::Tokens(tokens) => {
                result.extend(tokens.iter().rev().copied());
            }
            Replacement::Parameter(i) => {
                if let Some(argument) = arguments.get(*i) {
                    result.extend(argument.iter().rev().copied());
                }
            }
        }
    }
}

fn match_prefix<S: EngineState>(
    token: Token,
    prefix: &[Token],
    stream: &mut engine::UnexpandedStream<S>,
) -> txl::Result<()> {
    for prefix_token in prefix {
        let stream_token = stream.next_or_else(|| {
            error::EndOfInputError::new("matching the prefix of a user defined macro")
                .with_kind(error::Kind::ParameterMatch)
        })?;
        if stream_token.value() != prefix_token.value() {
            let name = token.text(stream.engine().cs_name_interner());
            let expected = token::write_tokens(prefix, stream.engine().cs_name_interner());
            return Err(stream.error(ParameterMatchError {
                token: stream_token,
                title: format!("use of {name} doesn't match its definition"),
                notes: vec![format!(
                    "the definition of {name} requires it to be followed by `{expected}`"
                )],
            }));
        }
    }
    Ok(())
}

impl Parameter {
    // Reads the argument for this parameter into the result and returns
    // true if the argument is surrounded by braces that need to be removed.
    fn parse_argument<S: EngineState>(
        &self,
        macro_token: Token,
        param_num: usize,
        input: &mut engine::ExpansionInput<S>,
        result: &mut Vec<Token>,
    ) -> txl::Result<bool> {
        match self {
            Parameter::Undelimited => {
                parse_undelimited_argument(macro_token, param_num, input.unexpanded(), result)
            }
            Parameter::Delimited(matcher) => {
                parse_delimited_argument(macro_token, param_num, matcher, input.unexpanded(), result)
            }
            Parameter::Optional(default) => {
                parse_optional_argument(macro_token, param_num, default, input.unexpanded(), result)?;
                Ok(false)
            }
        }
    }
}

fn parse_undelimited_argument<S: EngineState>(
    macro_token: Token,
    param_num: usize,
    stream: &mut engine::UnexpandedStream<S>,
    result: &mut Vec<Token>,
) -> txl::Result<bool> {
    parse::skip_spaces(stream)?;
    let token = stream.next_or_else(|| argument_end_of_input_error(param_num, "undelimited"))?;
    match token.value() {
        Value::BeginGroup(_) => {
            result.push(token);
            parse::finish_balanced_group(stream, result, || {
                argument_end_of_input_error(param_num, "undelimited")
            })?;
            Ok(true)
        }
        Value::EndGroup(_) => {
            let name = macro_token.text(stream.engine().cs_name_interner());
            Err(stream.error(ParameterMatchError {
                token,
                title: format!("argument {param_num} of {name} begins with an end of group"),
                notes: vec!["an undelimited argument is a single token or a braced group".into()],
            }))
        }
        _ => {
            result.push(token);
            Ok(false)
        }
    }
}

fn parse_delimited_argument<S: EngineState>(
    macro_token: Token,
    param_num: usize,
    matcher: &Matcher<Value>,
    stream: &mut engine::UnexpandedStream<S>,
    result: &mut Vec<Token>,
) -> txl::Result<bool> {
    let mut search = matcher.start();
    let mut depth = 0_usize;
    // A delimiter produced by the `#{` rule ends with a begin group token, and the
    // match completes just after that token increases the depth.
    let closing_depth = match matcher.pattern().last() {
        Some(Value::BeginGroup(_)) => 1,
        _ => 0,
    };
    let start = result.len();
    loop {
        let token = stream.next_or_else(|| argument_end_of_input_error(param_num, "delimited"))?;
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => {
                    let name = macro_token.text(stream.engine().cs_name_interner());
                    return Err(stream.error(ParameterMatchError {
                        token,
                        title: format!("argument {param_num} of {name} has an extra end of group"),
                        notes: vec![
                            "braces inside a macro argument must be balanced".into(),
                        ],
                    }));
                }
            },
            _ => {}
        }
        let matches_delimiter = search.next(&token.value());
        result.push(token);
        if depth == closing_depth && matches_delimiter {
            result.truncate(result.len() - matcher.pattern().len());
            return Ok(is_single_group(&result[start..]));
        }
    }
}

fn parse_optional_argument<S: EngineState>(
    macro_token: Token,
    param_num: usize,
    default: &[Token],
    stream: &mut engine::UnexpandedStream<S>,
    result: &mut Vec<Token>,
) -> txl::Result<()> {
    parse::skip_spaces(stream)?;
    let is_bracket = matches!(
        stream.peek()?.map(Token::value),
        Some(Value::Other('['))
    );
    if !is_bracket {
        result.extend_from_slice(default);
        return Ok(());
    }
    stream.consume()?;
    let mut depth = 0_usize;
    loop {
        let token = stream.next_or_else(|| argument_end_of_input_error(param_num, "optional"))?;
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => {
                    let name = macro_token.text(stream.engine().cs_name_interner());
                    return Err(stream.error(ParameterMatchError {
                        token,
                        title: format!(
                            "optional argument {param_num} of {name} has an extra end of group"
                        ),
                        notes: vec![
                            "braces inside an optional argument must be balanced".into(),
                            "the optional argument ends at the first `]` outside of braces".into(),
                        ],
                    }));
                }
            },
            Value::Other(']') if depth == 0 => return Ok(()),
            _ => {}
        }
        result.push(token);
    }
}

// Returns true if the list is a single balanced braced group, like `{a}` but not `{a}{b}`.
fn is_single_group(list: &[Token]) -> bool {
    if list.len() < 2 || !matches!(list[0].value(), Value::BeginGroup(_)) {
        return false;
    }
    let mut depth = 0_usize;
    for (i, token) in list.iter().enumerate() {
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == list.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn argument_end_of_input_error(param_num: usize, kind: &str) -> error::EndOfInputError {
    error::EndOfInputError::new(format!("reading an {kind} macro argument"))
        .with_kind(error::Kind::ParameterMatch)
        .with_note(format!("this is argument number {param_num} for the macro"))
}

/// Error returned when a macro invocation doesn't match the macro's parameter text.
#[derive(Debug)]
pub struct ParameterMatchError {
    token: Token,
    title: String,
    notes: Vec<String>,
}

impl error::TexError for ParameterMatchError {
    fn kind(&self) -> error::Kind {
        error::Kind::ParameterMatch
    }

    fn location(&self) -> error::Location {
        error::Location::Token(self.token)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

/// A parsed parameter text.
#[derive(Debug)]
pub struct ParameterText {
    pub prefix: Vec<Token>,
    pub parameters: Vec<Parameter>,
    /// Set when the parameter text ends with `#{`.
    ///
    /// The begin group token then delimits the last parameter and must also be
    /// appended to the replacement text.
    pub trailing_begin_group: Option<Token>,
}

/// Parses the tokens between a macro's name and the opening brace of its replacement text.
///
/// The opening brace is passed separately to support TeX's `#{` rule.
pub fn parse_parameter_text(
    tokens: &[Token],
    opening_brace: Token,
) -> Result<ParameterText, error::SimpleTokenError> {
    let mut prefix = Vec::new();
    let mut parameters = Vec::new();
    let mut delimiter: Vec<Value> = Vec::new();
    let mut trailing_begin_group = None;
    let mut iter = tokens.iter().copied().peekable();
    while let Some(token) = iter.next() {
        match token.value() {
            Value::Parameter(_) => {
                let Some(next) = iter.next() else {
                    trailing_begin_group = Some(opening_brace);
                    match parameters.is_empty() {
                        true => prefix.push(opening_brace),
                        false => delimiter.push(opening_brace.value()),
                    }
                    break;
                };
                let expected = parameters.len() + 1;
                let got = next.char().and_then(|c| c.to_digit(10));
                if got != Some(expected as u32) {
                    return Err(error::SimpleTokenError::new(
                        next,
                        format!("unexpected parameter number; expected #{expected}"),
                    )
                    .with_note(
                        "parameters must be numbered consecutively starting at 1, like #1#2#3",
                    ));
                }
                if expected > 9 {
                    return Err(error::SimpleTokenError::new(
                        next,
                        "a macro can have at most 9 parameters",
                    ));
                }
                finish_parameter(&mut parameters, &mut delimiter);
                parameters.push(Parameter::Undelimited);
            }
            Value::EndGroup(_) => {
                return Err(error::SimpleTokenError::new(
                    token,
                    "a parameter text cannot contain an end of group character",
                ));
            }
            value => match parameters.is_empty() {
                true => prefix.push(token),
                false => delimiter.push(value),
            },
        }
    }
    finish_parameter(&mut parameters, &mut delimiter);
    Ok(ParameterText {
        prefix,
        parameters,
        trailing_begin_group,
    })
}

// Attaches the pending delimiter to the last parameter.
fn finish_parameter(parameters: &mut [Parameter], delimiter: &mut Vec<Value>) {
    let delimiter = std::mem::take(delimiter);
    if let Some(last) = parameters.last_mut() {
        if let Some(matcher) = Matcher::new(delimiter) {
            *last = Parameter::Delimited(matcher);
        }
    }
}

/// Parses a replacement text for a macro with the given number of parameters.
///
/// `##` becomes a single parameter token and `#n` becomes a reference to parameter n.
pub fn parse_replacement_text(
    tokens: &[Token],
    num_parameters: usize,
) -> Result<Vec<Replacement>, error::SimpleTokenError> {
    let mut replacements = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut iter = tokens.iter().copied();
    while let Some(token) = iter.next() {
        if !matches!(token.value(), Value::Parameter(_)) {
            current.push(token);
            continue;
        }
        let Some(next) = iter.next() else {
            return Err(error::SimpleTokenError::new(
                token,
                "a replacement text cannot end with a parameter character",
            )
            .with_note("use ## to insert a literal parameter character"));
        };
        if let Value::Parameter(_) = next.value() {
            current.push(token);
            continue;
        }
        let index = match next.char().and_then(|c| c.to_digit(10)) {
            Some(n) if n >= 1 && (n as usize) <= num_parameters => n as usize - 1,
            _ => {
                let mut err = error::SimpleTokenError::new(
                    next,
                    "invalid parameter reference in replacement text",
                );
                err = match num_parameters {
                    0 => err.with_note("the macro has no parameters"),
                    n => err.with_note(format!("the macro has parameters #1 through #{n}")),
                };
                return Err(err);
            }
        };
        if !current.is_empty() {
            replacements.push(Replacement::Tokens(std::mem::take(&mut current)));
        }
        replacements.push(Replacement::Parameter(index));
    }
    if !current.is_empty() {
        replacements.push(Replacement::Tokens(current));
    }
    Ok(replacements)
}

fn colored_parameter_number(n: usize) -> String {
    let s = format!["#{n}"];
    match n {
        1 => s.bright_yellow().bold().to_string(),
        _ => s.bright_blue().bold().to_string(),
    }
}

fn pretty_print_prefix_and_parameters(
    prefix: &[Token],
    parameters: &[Parameter],
    interner: &token::CsNameInterner,
) -> String {
    let mut d = String::new();
    if prefix.is_empty() {
        d.push_str(" . No prefix\n");
    } else {
        d.push_str(&format![
            " . Prefix: `{}`\n",
            token::write_tokens(prefix, interner)
        ]);
    }
    d.push_str(&format![" . Parameters ({}):", parameters.len()]);
    for (i, parameter) in parameters.iter().enumerate() {
        let n = colored_parameter_number(i + 1);
        match parameter {
            Parameter::Undelimited => d.push_str(&format!["\n    {n}: undelimited"]),
            Parameter::Delimited(matcher) => d.push_str(&format![
                "\n    {n}: delimited by `{}`",
                write_values(matcher.pattern(), interner)
            ]),
            Parameter::Optional(default) => d.push_str(&format![
                "\n    {n}: optional with default `{}`",
                token::write_tokens(default, interner)
            ]),
        }
    }
    d
}

fn pretty_print_replacement_text(
    replacements: &[Replacement],
    interner: &token::CsNameInterner,
) -> String {
    let mut b = String::new();
    for replacement in replacements {
        match replacement {
            Replacement::Parameter(i) => b.push_str(&colored_parameter_number(*i + 1)),
            Replacement::Tokens(tokens) => b.push_str(&token::write_tokens(tokens, interner)),
        }
    }
    b
}

fn write_values(values: &[Value], interner: &token::CsNameInterner) -> String {
    let tokens: Vec<Token> = values
        .iter()
        .map(|v| Token::new(*v, token::trace::Key::dummy()))
        .collect();
    token::write_tokens(&tokens, interner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::trace::Key;

    fn letter(c: char) -> Token {
        Token::new_letter(c, Key::dummy())
    }

    fn param() -> Token {
        Token::new_parameter('#', Key::dummy())
    }

    fn digit(c: char) -> Token {
        Token::new_other(c, Key::dummy())
    }

    fn brace() -> Token {
        Token::new_begin_group('{', Key::dummy())
    }

    #[test]
    fn parameter_text_with_prefix_and_delimiters() {
        let tokens = vec![
            letter('a'),
            param(),
            digit('1'),
            letter('b'),
            param(),
            digit('2'),
        ];
        let text = parse_parameter_text(&tokens, brace()).unwrap();
        assert_eq!(text.prefix, vec![letter('a')]);
        assert_eq!(
            text.parameters,
            vec![
                Parameter::Delimited(Matcher::new(vec![Value::Letter('b')]).unwrap()),
                Parameter::Undelimited,
            ]
        );
        assert_eq!(text.trailing_begin_group, None);
    }

    #[test]
    fn parameter_text_brace_rule() {
        let tokens = vec![param(), digit('1'), param()];
        let text = parse_parameter_text(&tokens, brace()).unwrap();
        assert_eq!(
            text.parameters,
            vec![Parameter::Delimited(
                Matcher::new(vec![Value::BeginGroup('{')]).unwrap()
            )]
        );
        assert_eq!(text.trailing_begin_group, Some(brace()));
    }

    #[test]
    fn parameter_text_out_of_order() {
        let tokens = vec![param(), digit('2')];
        assert!(parse_parameter_text(&tokens, brace()).is_err());
    }

    #[test]
    fn replacement_text() {
        let tokens = vec![
            letter('a'),
            param(),
            digit('2'),
            param(),
            param(),
            param(),
            digit('1'),
        ];
        let replacements = parse_replacement_text(&tokens, 2).unwrap();
        let got: Vec<String> = replacements
            .iter()
            .map(|r| match r {
                Replacement::Tokens(t) => format!("{}", t.len()),
                Replacement::Parameter(i) => format!("#{i}"),
            })
            .collect();
        assert_eq!(got, vec!["1", "#1", "1", "#0"]);
    }

    #[test]
    fn replacement_text_bad_reference() {
        let tokens = vec![param(), digit('3')];
        assert!(parse_replacement_text(&tokens, 2).is_err());
    }

    #[test]
    fn single_group() {
        let open = brace();
        let close = Token::new_end_group('}', Key::dummy());
        assert!(is_single_group(&[open, letter('a'), close]));
        assert!(!is_single_group(&[open, letter('a'), close, open, close]));
        assert!(!is_single_group(&[letter('a')]));
    }
}
