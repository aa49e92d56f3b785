use crate::error;
use crate::token::trace::SourceCodeTrace;
use colored::*;

pub fn format_error(f: &mut std::fmt::Formatter<'_>, err: &error::Error) -> std::fmt::Result {
    let margin = err.trace().position.line.to_string().len() + 1;
    writeln!(
        f,
        "{}: {} {}",
        "Error".bright_red().bold(),
        err.title().bold(),
        format!("[{}]", err.kind()).dimmed()
    )?;
    fmt_source_code_trace(
        f,
        margin,
        err.trace(),
        &err.source_annotation,
        Color::BrightRed,
    )?;
    for note in err.notes() {
        writeln!(f, "{} {} {}", " ".repeat(margin - 1), "=".blue().bold(), note)?;
    }
    for element in err.stack_trace() {
        writeln!(
            f,
            "{}: this error occurred while {}",
            "Context".yellow().bold(),
            element.context.action()
        )?;
        let margin = element.trace.position.line.to_string().len() + 1;
        fmt_source_code_trace(f, margin, &element.trace, "", Color::Yellow)?;
    }
    Ok(())
}

fn fmt_source_code_trace(
    f: &mut std::fmt::Formatter<'_>,
    margin: usize,
    trace: &SourceCodeTrace,
    annotation: &str,
    color: Color,
) -> std::fmt::Result {
    let bar = "|".blue().bold();
    writeln!(
        f,
        "{}{} {}:{}:{}",
        " ".repeat(margin - 1),
        "-->".blue().bold(),
        trace.origin,
        trace.position.line,
        trace.position.column
    )?;
    writeln!(f, "{} {}", " ".repeat(margin - 1), bar)?;
    writeln!(
        f,
        "{} {} {}",
        format!("{:>width$}", trace.position.line, width = margin - 1)
            .blue()
            .bold(),
        bar,
        trace.line_content
    )?;
    let underline = "^".repeat(trace.value.chars().count().max(1));
    writeln!(
        f,
        "{} {} {}{} {}",
        " ".repeat(margin - 1),
        bar,
        " ".repeat(trace.position.column.saturating_sub(1)),
        underline.color(color).bold(),
        annotation.color(color).bold()
    )
}

#[cfg(test)]
mod tests {
    use crate::engine::{Engine, Options};
    use crate::error::Kind;

    #[test]
    fn display_points_at_token() {
        colored::control::set_override(false);
        let mut engine = Engine::<()>::new(Default::default(), Options::default());
        engine.push_source("input.tex", "ab\ncd}");
        let err = engine.tokens().find_map(Result::err).unwrap();
        assert_eq!(err.kind(), Kind::UnbalancedGroup);
        let s = err.to_string();
        assert!(s.contains("there is no group to end"), "{s}");
        assert!(s.contains("--> input.tex:2:3"), "{s}");
        assert!(s.contains("2 | cd}"), "{s}");
        assert!(s.contains("  ^ unbalanced group"), "{s}");
    }
}
