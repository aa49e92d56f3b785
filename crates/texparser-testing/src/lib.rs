/*!
texparser unit testing library

This is a crate for writing unit tests for code that uses texparser.
It is used extensively in the texparser standard library,
    so the unit tests there are good examples of what this crate can do.

## Basic setup

Each unit test built with this library works with a specific state type
    provided by the unit test writer.
The state must implement the [`EngineState`](texparser::engine::EngineState) trait
    and [`Default`].
If the unit test doesn't require anything from the state,
    the [`State`] type defined in this library can simply be used.

## Test types

### Expansion equality tests

Run using [`run_expansion_equality_test`].

These tests verify that two different TeX snippets expand to the same output.
For example, an expansion equality test can verify that
```tex
\def\HelloWorld{Hola Mundo}\HelloWorld - \HelloWorld
```
and
```tex
Hola Mundo - Hola Mundo
```
produce the same output.

In this example the second input is just a constant, which is usually how these tests are used.

These tests do _not_ verify that the state of the engine is the same in both cases.
In the first snippet above the macro `\HelloWorld` is defined in the state but
    in the second snippet it isn't.

### Failure tests

Run using [`run_failure_test`].

These tests verify that a specific TeX snippet fails with a specific kind of error.

## The test suite macro

The preferred way to write a suite of unit tests is to use the [`test_suite`] macro.
This macro removes a bunch of boilerplate and makes it easy to add new test cases.
*/

use std::collections::HashMap;
use texparser::command;
use texparser::engine;
use texparser::engine::{Engine, EngineState};
use texparser::error;
use texparser::token;

/// Simple state type for simple unit tests.
#[derive(Default)]
pub struct State;

impl EngineState for State {}

/// Option passed to a test runner.
pub enum TestOption<'a, S> {
    /// The built-in commands are the result of invoking the provided static function.
    ///
    /// Overrides previous `BuiltInCommands` or `BuiltInCommandsDyn` options.
    BuiltInCommands(fn() -> HashMap<&'static str, command::BuiltIn<S>>),

    /// The built-in commands are the result of invoking the provided closure.
    ///
    /// Overrides previous `BuiltInCommands` or `BuiltInCommandsDyn` options.
    #[allow(clippy::type_complexity)]
    BuiltInCommandsDyn(Box<dyn Fn() -> HashMap<&'static str, command::BuiltIn<S>> + 'a>),

    /// The provided static function is invoked after the engine is created and before expansion starts.
    ///
    /// Overrides previous `CustomEngineInitialization` options.
    CustomEngineInitialization(fn(&mut Engine<S>)),

    /// Whether undefined commands are passed through instead of raising an error.
    ///
    /// Overrides previous `AllowUndefinedCommands` options.
    AllowUndefinedCommands(bool),

    /// The maximum number of expansions between two output tokens.
    ///
    /// Overrides previous `MaxExpansions` options.
    MaxExpansions(usize),
}

/// Run an expansion equality test.
///
/// The test passes if the two provided input strings expand to the same tokens.
pub fn run_expansion_equality_test<S>(lhs: &str, rhs: &str, options: &[TestOption<S>])
where
    S: Default + EngineState,
{
    let options = ResolvedOptions::new(options);

    let mut engine_1 = initialize_engine(&options);
    let output_1 = match expand_source_code(&mut engine_1, lhs) {
        Ok(output) => output,
        Err(err) => {
            println!("{err}");
            panic!("expansion of the left hand side failed");
        }
    };

    let mut engine_2 = initialize_engine(&options);
    let output_2 = match expand_source_code(&mut engine_2, rhs) {
        Ok(output) => output,
        Err(err) => {
            println!("{err}");
            panic!("expansion of the right hand side failed");
        }
    };
    compare_output(output_1, &engine_1, output_2, &engine_2);
}

fn compare_output<S>(
    mut output_1: Vec<token::Token>,
    engine_1: &Engine<S>,
    mut output_2: Vec<token::Token>,
    engine_2: &Engine<S>,
) {
    let trim_space = |v: &mut Vec<token::Token>| {
        let last = match v.last() {
            None => return,
            Some(last) => last,
        };
        if matches!(last.value(), token::Value::Space(_)) {
            v.pop();
        }
    };
    trim_space(&mut output_1);
    trim_space(&mut output_2);

    println!("{output_1:?}");
    println!("{output_2:?}");
    use ::texparser::token::CommandRef::ControlSequence;
    use ::texparser::token::Value::CommandRef;
    let equal = match output_1.len() == output_2.len() {
        false => {
            println!(
                "output lengths do not match: {} != {}",
                output_1.len(),
                output_2.len()
            );
            false
        }
        true => output_1
            .iter()
            .zip(output_2.iter())
            .all(|(token_1, token_2)| match (token_1.value(), token_2.value()) {
                (
                    CommandRef(ControlSequence(cs_name_1)),
                    CommandRef(ControlSequence(cs_name_2)),
                ) => {
                    let name_1 = engine_1.cs_name_interner().resolve(cs_name_1);
                    let name_2 = engine_2.cs_name_interner().resolve(cs_name_2);
                    name_1 == name_2
                }
                (value_1, value_2) => value_1 == value_2,
            }),
    };

    if !equal {
        println!("Expansion output is different:");
        println!("------[lhs]------");
        println!(
            "'{}'",
            token::write_tokens(&output_1, engine_1.cs_name_interner())
        );
        println!("------[rhs]------");
        println!(
            "'{}'",
            token::write_tokens(&output_2, engine_2.cs_name_interner())
        );
        println!("-----------------");
        panic!("Expansion test failed");
    }
}

/// Run a failure test.
///
/// The test passes if expansion of the provided input fails with an error of the given kind.
pub fn run_failure_test<S>(input: &str, kind: error::Kind, options: &[TestOption<S>])
where
    S: Default + EngineState,
{
    let options = ResolvedOptions::new(options);

    let mut engine = initialize_engine(&options);
    match expand_source_code(&mut engine, input) {
        Ok(output) => {
            println!("Expansion succeeded:");
            println!(
                "{}",
                token::write_tokens(&output, engine.cs_name_interner())
            );
            panic!("Expansion failure test did not pass: expansion successful");
        }
        Err(err) => {
            println!("{err}");
            assert_eq!(err.kind(), kind, "expansion failed with the wrong kind of error");
        }
    }
}

struct ResolvedOptions<'a, S> {
    built_in_commands: &'a dyn Fn() -> HashMap<&'static str, command::BuiltIn<S>>,
    custom_engine_initialization: &'a dyn Fn(&mut Engine<S>),
    allow_undefined_commands: bool,
    max_expansions: Option<usize>,
}

impl<'a, S> ResolvedOptions<'a, S> {
    pub fn new(options: &'a [TestOption<S>]) -> Self {
        let mut resolved = Self {
            built_in_commands: &HashMap::new,
            custom_engine_initialization: &|_| {},
            allow_undefined_commands: false,
            max_expansions: None,
        };
        for option in options {
            match option {
                TestOption::BuiltInCommands(f) => resolved.built_in_commands = f,
                TestOption::BuiltInCommandsDyn(f) => resolved.built_in_commands = f,
                TestOption::CustomEngineInitialization(f) => {
                    resolved.custom_engine_initialization = f
                }
                TestOption::AllowUndefinedCommands(b) => resolved.allow_undefined_commands = *b,
                TestOption::MaxExpansions(n) => resolved.max_expansions = Some(*n),
            }
        }
        resolved
    }
}

fn initialize_engine<S: Default>(options: &ResolvedOptions<S>) -> Box<Engine<S>> {
    let mut engine_options = engine::Options::default();
    if options.allow_undefined_commands {
        engine_options.undefined_command = engine::UndefinedCommandPolicy::PassThrough;
    }
    if let Some(max_expansions) = options.max_expansions {
        engine_options.max_expansions = max_expansions;
    }
    let mut engine = Box::new(Engine::new(S::default(), engine_options));
    engine.register_primitives((options.built_in_commands)());
    (options.custom_engine_initialization)(&mut engine);
    engine
}

/// Expands source code in an engine and returns the output tokens.
fn expand_source_code<S: EngineState>(
    engine: &mut Engine<S>,
    source: &str,
) -> Result<Vec<token::Token>, Box<error::Error>> {
    engine.push_source("testing.tex", source);
    engine.tokens().collect()
}

/// Macro to generate a suite of unit tests
///
/// The general use of this macros looks like this:
/// ```
/// # use texparser_testing::*;
/// # use std::collections::HashMap;
/// # use texparser::command;
/// # fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
/// #   HashMap::new()
/// # }
/// test_suite![
///     state(State),
///     options(TestOption::BuiltInCommands(built_in_commands)),
///     expansion_equality_tests(
///         (case_1, "a", "a"),
///         (case_2, "a b", "a b"),
///     ),
///     failure_tests(
///         (case_3, "{", texparser::error::Kind::UnterminatedGroup),
///         (case_4, "}", texparser::error::Kind::UnbalancedGroup),
///     ),
/// ];
/// ```
///
/// The arguments to the macro are:
///
/// - `state(State)`: defines which Rust type to use as the engine state in the tests.
///     This can be omitted, in which case it defaults to the type name `State` in the current scope.
///
/// - `options(option_1, option_2, ..., option_n)`: options to pass to the test runner.
///     This is a list of values of type [TestOption].
///     The options can be omitted, in which case they default to `options(TestOption::BuiltInCommands(built_in_commands))`.
///     In this case `built_in_commands` is a static function that returns a map of built-in primitives
///     to initialize the engine with.
///
/// - `expansion_equality_tests(cases...)`: a list of expansion equality test cases.
///     Each case is of the form (case name, left hand side, right hand side).
///     The data here is fed into the [run_expansion_equality_test] test runner.
///
/// - `failure_tests(cases...)`: a list of failure test cases.
///     Each case is of the form (case name, input, error kind).
///     The data here is fed into the [run_failure_test] test runner.
///
/// Only one `state()` argument may be provided, and if provided it must be in the first position.
/// Only one `options()` argument may be provided, and if provided it must be in the first position
///     or after the `state()` argument.
/// Zero or more of the other arguments may be provided, and in any order.
#[macro_export]
macro_rules! test_suite {
    ( state($state: ty), options $options: tt, expansion_equality_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let lhs = $lhs;
                let rhs = $rhs;
                let options = vec! $options;
                texparser_testing::run_expansion_equality_test::<$state>(&lhs, &rhs, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, expansion_equality_tests $test_body: tt $(,)? ) => (
        compile_error!("Invalid test cases for expansion_equality_tests: must be a list of tuples (name, lhs, rhs)");
    );
    ( state($state: ty), options $options: tt, failure_tests ( $( ($name: ident, $input: expr, $kind: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let options = vec! $options;
                texparser_testing::run_failure_test::<$state>(&input, $kind, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, failure_tests $test_body: tt $(,)? ) => (
        compile_error!("Invalid test cases for failure_tests: must be a list of tuples (name, input, kind)");
    );
    ( state($state: ty), options $options: tt, $test_kind: ident $test_cases: tt $(,)? ) => (
        compile_error!("Invalid keyword: test_suite! only accepts the following keywords: `state, `options`, `expansion_equality_tests`, `failure_tests`");
    );
    ( state($state: ty), options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        $(
            texparser_testing::test_suite![state($state), options $options, $test_kind $test_cases,];
        )+
    );
    ( options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texparser_testing::test_suite![state(State), options $options, $( $test_kind $test_cases, )+ ];
    );
    ( $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texparser_testing::test_suite![options (texparser_testing::TestOption::BuiltInCommands(built_in_commands)), $( $test_kind $test_cases, )+ ];
    );
}
