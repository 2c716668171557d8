use std::collections::HashMap;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;
use strum::IntoEnumIterator as _;

use crate::testing::{BatchSummary, ExecutionResult, Verdict};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {{
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }};
}

#[macro_export]
macro_rules! print_warning {
    ($fmt:literal, $($e:tt)*) => {{
        use ::colored::Colorize as _;
        eprintln!("{} {}", "Warning:".bright_yellow().bold(), format!($fmt, $($e)*))
    }};
}

pub fn is_truecolor_supported() -> bool {
    std::env::var("COLORTERM").map_or(false, |v| matches!(v.as_str(), "truecolor" | "24bit"))
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                Passed => Color::Green,
                Failed => Color::Yellow,
                TimedOut => Color::Red,
                ExecutionError => Color::Magenta,
            };
        }

        match self {
            Passed => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            Failed => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            TimedOut => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            ExecutionError => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
        }
    }
}

pub fn verdict_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

/// One line per sample for progress output, e.g. `" AC  sample 1 [12ms]"`.
pub fn result_line(res: &ExecutionResult) -> String {
    format!(
        "{} {} {}",
        self::verdict_icon(res.verdict),
        res.name.bold(),
        format!("[{}ms]", res.execution_time.as_millis()).dimmed(),
    )
}

pub fn print_batch_summary(summary: &BatchSummary) {
    let bar = "-".repeat(5);
    let total = summary.results.len();

    let mut counts: HashMap<Verdict, usize> = HashMap::new();
    for r in &summary.results {
        *counts.entry(r.verdict).or_default() += 1;
    }
    let passed = counts.get(&Verdict::Passed).copied().unwrap_or(0);

    if summary.all_passed {
        println!("{} {} {}", bar, format!("All {} tests passed ✨", total).green(), bar);
        return;
    }

    let headline = if passed == 0 {
        format!("All {} tests failed 💀", total)
    } else {
        format!("{}/{} tests failed 💣", total - passed, total)
    };
    let breakdown = Verdict::iter()
        .filter(|v| *v != Verdict::Passed)
        .filter_map(|v| counts.get(&v).map(|&n| (v, n)))
        .map(|(v, n)| {
            format!(
                "{}{}{}",
                self::verdict_icon(v),
                "x".dimmed(),
                n.to_string().bold().bright_white()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    println!("{} {} ({}) {}", bar, headline.bright_red(), breakdown, bar);
}

/// Expected output, stdout and stderr of a single result, with whitespace problems highlighted.
pub fn print_result_detail(res: &ExecutionResult) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = cols as usize;
    let heavy_rule = "━".repeat(cols).blue().bold();

    println!(
        "\n{}: {} [{}ms]\n{}",
        res.name.bright_yellow().bold(),
        self::verdict_icon(res.verdict),
        res.execution_time.as_millis(),
        heavy_rule,
    );

    print_section_title("[expected]", cols);
    print_text(&res.expected_output);

    print_section_title("[stdout]", cols);
    print_text(&res.actual_output);

    if !res.error_output.is_empty() {
        print_section_title("[stderr]", cols);
        println!("{}", res.error_output.trim_end());
    }

    println!("{}", heavy_rule);
}

fn print_section_title(title: &str, cols: usize) {
    let rest = cols.saturating_sub(title.chars().count() + 1);
    println!("{}{}", title.cyan().bold(), "─".repeat(rest).bright_black());
}

fn print_text(text: &str) {
    if text.is_empty() {
        println!("{}", "<EMPTY>".magenta().dimmed());
        return;
    }
    for line in text.lines() {
        let trimmed = line.trim_end();
        let trailing = line.len() - trimmed.len();
        if trailing == 0 {
            println!("{}", line);
        } else {
            println!(
                "{}{}{}",
                trimmed,
                " ".repeat(trailing).on_red(),
                "(Trailing whitespace)".bright_red().bold()
            );
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[test]
    fn every_verdict_has_distinct_color() {
        let colors: Vec<_> = Verdict::iter().map(|v| v.color()).collect();
        for (i, a) in colors.iter().enumerate() {
            assert!(colors[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn result_line_mentions_name_and_verdict() {
        colored::control::set_override(false);
        let mut res = ExecutionResult::execution_error(0, "sample 1", "boom");
        res.execution_time = Duration::from_millis(12);
        assert_eq!(result_line(&res), " ERR  sample 1 [12ms]");
    }
}
