use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use texparser::engine;
use texparser::prelude as txl;
use texparser::prelude::{Engine, Token};
use texparser::token;
use texparser::token::trace::Position;
use texparser_stdlib::StdLibState;

/// Tokenize and expand TeX and LaTeX documents.
///
/// Set the RUST_LOG environment variable to see what the engine is doing,
///   for example RUST_LOG=debug.
#[derive(Parser)]
#[clap(version)]
struct Cli {
    #[clap(subcommand)]
    sub_command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    Doc(Doc),
    Expand(Expand),
    Tokenize(Tokenize),
}

/// Print documentation for a primitive
///
/// If no name is given, every primitive is listed.
#[derive(Parser)]
struct Doc {
    /// Name of the control sequence, without the backslash
    name: Option<String>,
}

/// Expand all macros in a file and print the result
#[derive(Parser)]
struct Expand {
    #[command(flatten)]
    input: InputArgs,
}

/// Print the raw tokens of a file, one per line
#[derive(Parser)]
struct Tokenize {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Path to the TeX file
    file_path: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Pass undefined control sequences through instead of failing
    #[arg(long)]
    lenient: bool,

    /// Maximum number of expansions between two output tokens
    #[arg(long)]
    max_expansions: Option<usize>,

    /// Read the file as Latin-1 instead of UTF-8
    #[arg(long)]
    latin1: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum Format {
    Text,
    Json,
}

impl InputArgs {
    fn options(&self) -> engine::Options {
        let mut options = engine::Options::default();
        if let Some(max_expansions) = self.max_expansions {
            options.max_expansions = max_expansions;
        }
        if self.lenient {
            options.undefined_command = engine::UndefinedCommandPolicy::PassThrough;
        }
        options
    }

    fn encoding(&self) -> engine::Encoding {
        if self.latin1 {
            engine::Encoding::Latin1
        } else {
            engine::Encoding::Utf8
        }
    }
}

fn main() {
    env_logger::init();
    let args: Cli = Cli::parse();
    let result = match args.sub_command {
        SubCommand::Doc(d) => doc(d.name),
        SubCommand::Expand(e) => read_file(&e.input).and_then(|source| {
            let name = e.input.file_path.to_string_lossy();
            expand(&name, &source, &e.input).map_err(|err| format!("{err}"))
        }),
        SubCommand::Tokenize(t) => read_file(&t.input).and_then(|source| {
            let name = t.input.file_path.to_string_lossy();
            tokenize(&name, &source, &t.input).map_err(|err| format!("{err}"))
        }),
    };
    match result {
        Ok(output) => println!["{output}"],
        Err(err) => {
            eprintln!["{err}"];
            std::process::exit(1);
        }
    }
}

fn read_file(args: &InputArgs) -> Result<Vec<u8>, String> {
    log::info!("reading {}", args.file_path.display());
    std::fs::read(&args.file_path)
        .map_err(|err| format!("Failed to open file {:?}: {err}", &args.file_path))
}

fn expand(name: &str, source: &[u8], args: &InputArgs) -> txl::Result<String> {
    let mut engine = texparser_stdlib::new_engine(args.options());
    engine.push_source_bytes(name, source, args.encoding())?;
    let tokens: Vec<Token> = engine.tokens().collect::<txl::Result<_>>()?;
    log::info!(
        "expanded {name} into {} tokens using {} expansions",
        tokens.len(),
        engine.num_expansions()
    );
    Ok(match args.format {
        Format::Text => token::write_tokens(&tokens, engine.cs_name_interner()),
        Format::Json => to_json(&engine, &tokens),
    })
}

fn tokenize(name: &str, source: &[u8], args: &InputArgs) -> txl::Result<String> {
    // Decoding through an engine gives the same positioned errors as expanding.
    texparser_stdlib::new_engine(args.options()).push_source_bytes(name, source, args.encoding())?;
    let source_code: String = match args.encoding() {
        engine::Encoding::Latin1 => source.iter().map(|b| *b as char).collect(),
        engine::Encoding::Utf8 => String::from_utf8_lossy(source).into_owned(),
    };
    let mut engine = texparser_stdlib::new_engine(args.options());
    let tokens: Vec<Token> = engine
        .tokenize(name, &source_code)
        .collect::<txl::Result<_>>()?;
    Ok(match args.format {
        Format::Text => tokens
            .iter()
            .map(|token| {
                let entry = TokenEntry::new(&engine, *token);
                format!(
                    "{}:{}\t{}\t{}",
                    entry.position.line, entry.position.column, entry.kind, entry.text
                )
            })
            .collect::<Vec<String>>()
            .join("\n"),
        Format::Json => to_json(&engine, &tokens),
    })
}

#[derive(Debug, serde::Serialize)]
struct TokenEntry {
    kind: String,
    text: String,
    position: Position,
}

impl TokenEntry {
    fn new(engine: &Engine<StdLibState>, token: Token) -> TokenEntry {
        let kind = match token.value() {
            token::Value::CommandRef(token::CommandRef::ControlSequence(_)) => {
                "control sequence".to_string()
            }
            token::Value::CommandRef(token::CommandRef::ActiveCharacter(_)) => {
                "active character".to_string()
            }
            value => match value.cat_code() {
                Some(cat_code) => cat_code.name().to_string(),
                None => "unknown".to_string(),
            },
        };
        TokenEntry {
            kind,
            text: token.text(engine.cs_name_interner()),
            position: engine.trace(token).position,
        }
    }
}

fn to_json(engine: &Engine<StdLibState>, tokens: &[Token]) -> String {
    let entries: Vec<TokenEntry> = tokens
        .iter()
        .map(|token| TokenEntry::new(engine, *token))
        .collect();
    // Serializing plain strings and integers can't fail.
    serde_json::to_string_pretty(&entries).unwrap_or_default()
}

fn doc(name: Option<String>) -> Result<String, String> {
    let engine = texparser_stdlib::new_engine(engine::Options::default());
    match name {
        None => {
            let mut names: Vec<&str> = engine
                .commands_map()
                .cs_names()
                .filter_map(|cs_name| engine.cs_name_interner().resolve(cs_name))
                .collect();
            names.sort();
            let mut lines = Vec::with_capacity(names.len());
            for name in names {
                let doc = engine.doc(name).unwrap_or_default();
                let first_line = doc.split('\n').next().unwrap_or("").to_string();
                lines.push(format!["\\{}  {}", name.bold(), first_line]);
            }
            Ok(lines.join("\n"))
        }
        Some(name) => {
            let name = name.trim_start_matches('\\');
            match engine.doc(name) {
                None => Err(format!("Unknown command \\{name}")),
                Some(doc) => Ok(format!["\\{}  {}", name.bold(), doc]),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(format: Format) -> InputArgs {
        InputArgs {
            file_path: PathBuf::from("input.tex"),
            format,
            lenient: false,
            max_expansions: None,
            latin1: false,
        }
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn expand_text() {
        let got = expand(
            "input.tex",
            br"\def\a#1{(#1)}\a x\a{yz}",
            &args(Format::Text),
        )
        .unwrap();
        assert_eq!(got, "(x)(yz)");
    }

    #[test]
    fn expand_undefined_command_fails() {
        let err = expand("input.tex", br"a\undefined b", &args(Format::Text)).unwrap_err();
        assert_eq!(err.kind(), texparser::error::Kind::UndefinedControlSequence);
    }

    #[test]
    fn expand_lenient() {
        let mut args = args(Format::Text);
        args.lenient = true;
        let got = expand("input.tex", br"a\undefined b", &args).unwrap();
        assert_eq!(got, r"a\undefined b");
    }

    #[test]
    fn expand_max_expansions() {
        let mut args = args(Format::Text);
        args.max_expansions = Some(10);
        let err = expand("input.tex", br"\def\a{\a}\a", &args).unwrap_err();
        assert_eq!(err.kind(), texparser::error::Kind::ExpansionDepthExceeded);
    }

    #[test]
    fn expand_latin1() {
        let mut args = args(Format::Text);
        args.latin1 = true;
        let got = expand("input.tex", b"caf\xe9", &args).unwrap();
        assert_eq!(got, "café");
    }

    #[test]
    fn expand_invalid_utf8() {
        let err = expand("input.tex", b"caf\xe9", &args(Format::Text)).unwrap_err();
        assert_eq!(err.kind(), texparser::error::Kind::Lex);
    }

    #[test]
    fn expand_json() {
        let got = expand("input.tex", br"\def\a{b}a\a", &args(Format::Json)).unwrap();
        let got: serde_json::Value = serde_json::from_str(&got).unwrap();
        let want = serde_json::json!([
            {
                "kind": "letter",
                "text": "a",
                "position": {"line": 1, "column": 10, "byte_offset": 9},
            },
        ]);
        assert_eq!(got[0], want[0]);
        assert_eq!(got[1]["kind"], "letter");
        assert_eq!(got[1]["text"], "b");
        assert_eq!(got.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn tokenize_text() {
        let got = tokenize("input.tex", b"a\\b\n{c}", &args(Format::Text)).unwrap();
        let lines: Vec<&str> = got.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("1:1\t"));
        assert!(lines[0].ends_with("\ta"));
        assert_eq!(lines[1], "1:2\tcontrol sequence\t\\b");
        assert!(lines[2].ends_with("\t{"));
        assert!(lines[3].starts_with("2:2\t"));
    }

    #[test]
    fn tokenize_does_not_expand() {
        let got = tokenize("input.tex", br"\def\a{b}\a", &args(Format::Json)).unwrap();
        let got: serde_json::Value = serde_json::from_str(&got).unwrap();
        let texts: Vec<&str> = got
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec![r"\def", r"\a", "{", "b", "}", r"\a"]);
    }

    #[test]
    fn tokenize_invalid_utf8() {
        let err = tokenize("input.tex", b"ab\xff", &args(Format::Text)).unwrap_err();
        assert_eq!(err.kind(), texparser::error::Kind::Lex);
    }

    #[test]
    fn doc_known_command() {
        let got = doc(Some("def".to_string())).unwrap();
        assert!(got.contains("def"));
        let got_with_backslash = doc(Some(r"\def".to_string())).unwrap();
        assert_eq!(got, got_with_backslash);
    }

    #[test]
    fn doc_unknown_command() {
        assert!(doc(Some("undefined".to_string())).is_err());
    }

    #[test]
    fn doc_lists_all_commands() {
        let got = doc(None).unwrap();
        assert_eq!(got.lines().count(), StdLibState::all_built_ins().len());
    }
}
