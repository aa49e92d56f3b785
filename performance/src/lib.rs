//! Helpers for the texparser benchmarks.
//!
//! The benchmarks run on randomly generated documents so that their size can be tuned
//! with environment variables.

use rand::prelude::Distribution;
use rand::Rng;
use texparser::engine;

/// Lexes the input without expanding it and returns the number of tokens.
pub fn run_lexer(input: &str) -> usize {
    let mut engine = texparser_stdlib::new_engine(engine::Options::default());
    let mut n = 0;
    for token in engine.tokenize("input.tex", input) {
        if let Err(err) = token {
            panic!["Failed to lex the benchmark input: {err}"];
        }
        n += 1;
    }
    n
}

/// Expands the input with every standard library primitive and returns the number of
/// output tokens.
pub fn run_expansion(input: &str) -> usize {
    let mut engine = texparser_stdlib::new_engine(engine::Options::default());
    engine.push_source("input.tex", input);
    let mut n = 0;
    for token in engine.tokens() {
        if let Err(err) = token {
            panic!["Failed to expand the benchmark input: {err}"];
        }
        n += 1;
    }
    n
}

static RANDOM_CS_NAMES: [&str; 19] = [
    "def", "gdef", "edef", "xdef", "let", "ifcase", "ifnum", "iftrue", "iffalse", "else", "fi",
    "csname", "endcsname", "expandafter", "noexpand", "newcommand", "string", "number", "relax",
];

/// Relative frequencies of the kinds of tokens in a generated macro body.
pub struct Weights {
    pub begin_group: u32,
    pub end_group: u32,
    pub parameter: u32,
    pub space: u32,
    pub comment: u32,
    pub letter: u32,
    pub other: u32,
    pub control_sequence: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            begin_group: 10,
            end_group: 10,
            parameter: 20,
            space: 20,
            comment: 5,
            letter: 200,
            other: 100,
            control_sequence: 100,
        }
    }
}

/// Generates a document made of many definitions of `\macro` with random bodies.
///
/// Expanding the document only defines the macro, so it mostly exercises the lexer and
/// the parsing of macro definitions.
pub fn generate_random_tex_document(
    rng: &mut rand::prelude::StdRng,
    num_lines: usize,
    macro_length_bounds: (usize, usize),
    line_length_bounds: (usize, usize),
    weights: &Weights,
) -> String {
    let mut result = String::new();
    result.push_str("% This TeX document was randomly generated for benchmarking texparser.\n");
    let mut num_lines_generated: usize = 1;
    while num_lines_generated + macro_length_bounds.0 + 2 <= num_lines {
        let max_length = macro_length_bounds
            .1
            .min(num_lines - num_lines_generated - 2)
            .max(macro_length_bounds.0);
        let macro_length = rng.gen_range(macro_length_bounds.0..=max_length);
        result.push_str(&generate_random_tex_macro(
            rng,
            line_length_bounds,
            macro_length,
            weights,
        ));
        num_lines_generated += macro_length + 2;
    }
    result
}

/// Generates one definition `\def\macro#1#2#3{...}` whose body has the given number of lines.
pub fn generate_random_tex_macro(
    rng: &mut rand::prelude::StdRng,
    line_length_bounds: (usize, usize),
    num_lines: usize,
    weights: &Weights,
) -> String {
    let dist = match rand::distributions::WeightedIndex::new([
        weights.begin_group,
        weights.end_group,
        weights.parameter,
        weights.space,
        weights.comment,
        weights.letter,
        weights.other,
        weights.control_sequence,
    ]) {
        Ok(dist) => dist,
        Err(err) => panic!["Invalid weights: {err}"],
    };

    let mut result = String::with_capacity(num_lines * line_length_bounds.1 + 100);
    result.push_str("\\def\\macro#1#2#3{\n");
    for _ in 0..num_lines {
        result.push_str("  ");
        let mut commenting = false;
        let mut group_depth: u32 = 0;
        let line_length = if line_length_bounds.1 <= line_length_bounds.0 {
            line_length_bounds.1
        } else {
            rng.gen_range(line_length_bounds.0..=line_length_bounds.1)
        };
        let mut i = 0;
        while i < line_length {
            let temp;
            let s = match dist.sample(rng) {
                0 => {
                    if !commenting {
                        group_depth += 1;
                    }
                    "{"
                }
                1 => {
                    if commenting {
                        "}"
                    } else if group_depth == 0 {
                        continue;
                    } else {
                        group_depth -= 1;
                        "}"
                    }
                }
                2 => match rng.gen_range(0..4) {
                    0 => "#1",
                    1 => "#2",
                    2 => "#3",
                    _ => "##",
                },
                3 => " ",
                4 => {
                    // Braces after the comment character don't count, so close the open ones.
                    for _ in 0..group_depth {
                        result.push('}');
                    }
                    group_depth = 0;
                    commenting = true;
                    "%"
                }
                5 => {
                    let base = if rng.gen_range(0..4) == 0 { b'A' } else { b'a' };
                    temp = char::from(base + rng.gen_range(0..26_u8)).to_string();
                    &temp
                }
                6 => {
                    const OTHERS: &[u8] = b"0123456789.,;:";
                    temp = char::from(OTHERS[rng.gen_range(0..OTHERS.len())]).to_string();
                    &temp
                }
                _ => {
                    temp = format![
                        "\\{} ",
                        RANDOM_CS_NAMES[rng.gen_range(0..RANDOM_CS_NAMES.len())]
                    ];
                    &temp
                }
            };
            i += s.len();
            result.push_str(s);
        }
        for _ in 0..group_depth {
            result.push('}');
        }
        result.push('\n');
    }
    result.push_str("}\n");
    result
}

/// Generates a document in which every call goes through a chain of nested macros.
///
/// The chain has the given depth.
/// Each macro in the chain takes two arguments, writes some random letters,
/// evaluates a conditional and then calls the next macro in the chain.
/// The document ends with the given number of calls to the first macro.
pub fn generate_macro_chain_document(
    rng: &mut rand::prelude::StdRng,
    depth: usize,
    num_calls: usize,
) -> String {
    let mut result = String::new();
    result.push_str(&format!["\\def\\{}#1#2{{#1#2}}%\n", chain_macro_name(0)]);
    for i in 1..depth.max(1) {
        let letters = random_letters(rng, 5);
        let n: u32 = rng.gen_range(0..100);
        result.push_str(&format![
            "\\def\\{}#1#2{{{letters}\\ifodd {n} #1\\else #2\\fi\\{}{{#2}}{{#1}}}}%\n",
            chain_macro_name(i),
            chain_macro_name(i - 1),
        ]);
    }
    let first = chain_macro_name(depth.max(1) - 1);
    for _ in 0..num_calls {
        let a = random_letters(rng, 3);
        let b = random_letters(rng, 3);
        result.push_str(&format!["\\{first}{{{a}}}{{{b}}}\n"]);
    }
    result
}

// Control sequence names can't contain digits, so the index is written in letters.
fn chain_macro_name(mut i: usize) -> String {
    let mut name = String::from("chain");
    loop {
        name.push(char::from(b'a' + (i % 26) as u8));
        i /= 26;
        if i == 0 {
            return name;
        }
    }
}

fn random_letters(rng: &mut rand::prelude::StdRng, n: usize) -> String {
    (0..n)
        .map(|_| char::from(b'a' + rng.gen_range(0..26_u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn random_document_expands() {
        let mut rng = rand::prelude::StdRng::seed_from_u64(43);
        let input = generate_random_tex_document(&mut rng, 200, (5, 20), (40, 60), &Default::default());
        assert!(input.lines().count() <= 200);
        assert!(run_lexer(&input) > 0);
        run_expansion(&input);
    }

    #[test]
    fn macro_chain_document_expands() {
        let mut rng = rand::prelude::StdRng::seed_from_u64(43);
        let input = generate_macro_chain_document(&mut rng, 30, 10);
        // Each call outputs 5 letters per level plus one of the arguments per level
        // and both arguments at the bottom.
        assert_eq!(run_expansion(&input), 10 * (29 * 8 + 6 + 1));
    }

    #[test]
    fn chain_macro_names_are_distinct() {
        assert_eq!(chain_macro_name(0), "chaina");
        assert_eq!(chain_macro_name(25), "chainz");
        assert_eq!(chain_macro_name(26), "chainab");
    }
}
