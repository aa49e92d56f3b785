//! # The texparser standard library
//!
//! This crate contains implementations of the TeX and LaTeX primitives
//! that are needed to expand real documents:
//! macro definitions, aliasing, category codes, groups, conditionals,
//! expansion control, conversions, paragraphs, integer registers and `\the`,
//! and the LaTeX layer of command definitions, counters, environments and `\verb`.
//!
//! The easiest way to get started is [new_engine], which returns an engine with
//! every primitive in the library registered:
//!
//! ```
//! use texparser::engine::Options;
//! use texparser::prelude::*;
//!
//! let mut engine = texparser_stdlib::new_engine(Options::default());
//! engine.push_source("input.tex", r"\newcommand{\greet}[1]{Hello, #1!}\greet{World}");
//! let tokens: Vec<Token> = engine.tokens().collect::<Result<_>>().unwrap();
//! assert_eq!(
//!     texparser::token::write_tokens(&tokens, engine.cs_name_interner()),
//!     "Hello, World!"
//! );
//! ```

extern crate texparser_stdext;

use std::collections::HashMap;
use texparser::command::Tag;
use texparser::engine;
use texparser::prelude::*;
use texparser::traits::ExpandedStream;

pub mod alias;
pub mod catcode;
pub mod conditional;
pub mod conversion;
pub mod counter;
pub mod def;
pub mod environment;
pub mod expansion;
pub mod group;
pub mod latex;
pub mod par;
pub mod prefix;
pub mod registers;
pub mod the;
pub mod verb;

/// A state struct that is compatible with every primitive in the standard library.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StdLibState {
    pub counter: counter::Component,
    pub environment: environment::Component,
    pub prefix: prefix::Component,
    pub registers: registers::Component,
}

impl EngineState for StdLibState {
    #[inline]
    fn expansion_override_hook(
        token: Token,
        input: &mut ExpansionInput<Self>,
        tag: Option<Tag>,
    ) -> Result<Option<Token>> {
        expansion::noexpand_hook(token, input, tag)
    }

    #[inline]
    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        prefix::variable_assignment_scope_hook(state)
    }

    #[inline]
    fn begin_group_hook(state: &mut Self) {
        registers::begin_group_hook(state)
    }

    #[inline]
    fn end_group_hook(state: &mut Self) {
        registers::end_group_hook(state)
    }

    #[inline]
    fn internal_integer_hook(token: Token, input: &mut ExpandedStream<Self>) -> Result<Option<i32>> {
        the::internal_integer(token, input)
    }
}

texparser::implement_has_component![
    StdLibState,
    (counter::Component, counter),
    (environment::Component, environment),
    (prefix::Component, prefix),
    (registers::Component, registers),
];

impl StdLibState {
    /// Returns every primitive in the standard library, keyed by name.
    pub fn all_built_ins() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        HashMap::from([
            ("addtocounter", counter::get_addtocounter()),
            ("advance", registers::get_advance()),
            ("Alph", counter::get_upper_alph()),
            ("alph", counter::get_alph()),
            ("arabic", counter::get_arabic()),
            //
            ("begin", environment::get_begin()),
            ("begingroup", group::get_begingroup()),
            //
            ("catcode", catcode::get_catcode()),
            ("count", registers::get_count()),
            ("countdef", registers::get_countdef()),
            ("csname", expansion::get_csname()),
            //
            ("def", def::get_def()),
            ("detokenize", conversion::get_detokenize()),
            ("divide", registers::get_divide()),
            //
            ("edef", def::get_edef()),
            ("else", texparser::conditional::get_else()),
            ("end", environment::get_end()),
            ("endcsname", expansion::get_endcsname()),
            ("endgroup", group::get_endgroup()),
            ("expandafter", expansion::get_expandafter()),
            //
            ("fi", texparser::conditional::get_fi()),
            //
            ("gdef", def::get_gdef()),
            ("global", prefix::get_global()),
            //
            ("if", conditional::get_if()),
            ("ifcase", conditional::get_ifcase()),
            ("ifcat", conditional::get_ifcat()),
            ("ifcsname", conditional::get_ifcsname()),
            ("ifdefined", conditional::get_ifdefined()),
            ("iffalse", conditional::get_iffalse()),
            ("ifnum", conditional::get_ifnum()),
            ("ifodd", conditional::get_ifodd()),
            ("iftrue", conditional::get_iftrue()),
            ("ifx", conditional::get_ifx()),
            //
            ("let", alias::get_let()),
            ("long", prefix::get_long()),
            //
            ("makeatletter", catcode::get_makeatletter()),
            ("makeatother", catcode::get_makeatother()),
            ("multiply", registers::get_multiply()),
            //
            ("newcommand", latex::get_newcommand()),
            ("newcount", registers::get_newcount()),
            ("newcounter", counter::get_newcounter()),
            ("newenvironment", environment::get_newenvironment()),
            ("newif", conditional::get_newif()),
            ("noexpand", expansion::get_noexpand()),
            ("number", conversion::get_number()),
            //
            ("or", texparser::conditional::get_or()),
            ("outer", prefix::get_outer()),
            //
            ("par", par::get_par()),
            ("providecommand", latex::get_providecommand()),
            //
            ("relax", expansion::get_relax()),
            ("renewcommand", latex::get_renewcommand()),
            ("renewenvironment", environment::get_renewenvironment()),
            ("Roman", counter::get_upper_roman()),
            ("roman", counter::get_roman()),
            ("romannumeral", conversion::get_romannumeral()),
            //
            ("setcounter", counter::get_setcounter()),
            ("stepcounter", counter::get_stepcounter()),
            ("string", conversion::get_string()),
            //
            ("the", the::get_the()),
            //
            ("value", counter::get_value()),
            ("verb", verb::get_verb()),
            //
            ("xdef", def::get_xdef()),
        ])
    }
}

/// Creates a new engine that uses the standard library's state and all of its primitives.
pub fn new_engine(options: engine::Options) -> Engine<StdLibState> {
    let mut engine = Engine::new(StdLibState::default(), options);
    engine.register_primitives(StdLibState::all_built_ins());
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use texparser::error::Kind;
    use texparser_testing::*;

    fn built_in_commands() -> HashMap<&'static str, BuiltIn<StdLibState>> {
        StdLibState::all_built_ins()
    }

    #[test]
    fn every_built_in_is_documented() {
        for (name, built_in) in StdLibState::all_built_ins() {
            assert!(built_in.doc().is_some(), "\\{name} has no documentation");
        }
    }

    #[test]
    fn new_engine_registers_primitives() {
        let engine = new_engine(engine::Options::default());
        assert!(engine.doc("def").is_some());
        assert!(engine.doc("newcommand").is_some());
        assert!(engine.doc("undefined").is_none());
    }

    test_suite![
        state(StdLibState),
        options(TestOption::BuiltInCommands(built_in_commands)),
        expansion_equality_tests(
            (
                latex_style_document,
                r"\makeatletter%
                \newcommand\@greeting{Hello}%
                \newcommand{\greet}[2][World]{\@greeting, #2 and #1!}%
                \makeatother%
                \greet{Alice}|\greet[Bob]{Carol}",
                "Hello, Alice and World!|Hello, Carol and Bob!"
            ),
            (
                latex_counters_and_environments,
                r"\newcounter{section}\newcounter{subsection}[section]%
                \newenvironment{sec}[1]{\stepcounter{section}\thesection. #1:}{/}%
                \begin{sec}{A}\stepcounter{subsection}\arabic{subsection}\end{sec}%
                \begin{sec}{B}\stepcounter{subsection}\arabic{subsection}\end{sec}%
                \verb|\x|\count1=\value{section}\the\count1",
                r"1. A:1/2. B:1/\verb|\x|2"
            ),
            (
                plain_tex_registers,
                r"\newcount\n \n=3 {\advance\n by 4 \global\multiply\n 2 }\the\n",
                "{}14"
            ),
            (
                plain_tex_style_switch,
                r"\newif\ifdraft \drafttrue%
                \def\mode{\ifdraft draft\else final\fi}\mode",
                "draft"
            ),
            (
                recursive_macro_with_ifcase,
                r"\def\down#1{\ifcase#1 \or1\or2\down1\or3\down2\fi}\down3",
                "321"
            ),
            (
                csname_in_macro,
                r"\def\item#1{\expandafter\def\csname item#1\endcsname{[#1]}}\item a\item b\csname itemb\endcsname\csname itema\endcsname",
                "[b][a]"
            ),
        ),
        failure_tests(
            (unterminated_group, r"{a", Kind::UnterminatedGroup),
            (unbalanced_group, r"a}", Kind::UnbalancedGroup),
            (unterminated_conditional, r"\iftrue a", Kind::UnbalancedConditional),
            (undefined_command, r"\undefined", Kind::UndefinedControlSequence),
            (
                infinite_recursion,
                r"\def\a{\a}\a",
                Kind::ExpansionDepthExceeded
            ),
        ),
    ];
}
