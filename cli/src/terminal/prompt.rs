//! Line-based operator prompts. Invalid input never leaves a prompt: the
//! error is shown and the question is asked again. End of input (or `q`)
//! backs out with `None`.

use std::io::{self, BufRead, IsTerminal};

use colored::*;
use console::Term;
use tracing::error;

use crate::terminal::colors;

/// Whether stdin is an interactive terminal.
pub fn interactive() -> bool {
    io::stdin().is_terminal() && console::user_attended_stderr()
}

/// Reads one trimmed line, `None` at end of input.
pub fn read_line(question: &str) -> anyhow::Result<Option<String>> {
    let term = Term::stderr();
    term.write_str(&format!("{} {} ", "?".color(colors::ACCENT).bold(), question.color(colors::TEXT_DEFAULT)))?;
    term.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        term.write_line("")?;
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Asks until `parse` accepts the answer. `q` and end of input return `None`.
pub fn ask<T, E, F>(question: &str, parse: F) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Result<T, E>,
    E: std::fmt::Display,
{
    loop {
        let Some(answer) = read_line(question)? else {
            return Ok(None);
        };
        if answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match parse(&answer) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => error!("{e}"),
        }
    }
}

/// Like [`ask`], but an empty answer picks `default`.
pub fn ask_or<T, E, F>(question: &str, default: &str, parse: F) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Result<T, E>,
    E: std::fmt::Display,
{
    let question = format!("{question} [{default}]");
    ask(&question, |answer| parse(if answer.is_empty() { default } else { answer }))
}

/// Picks an entry by its 1-indexed position.
pub fn choose_index(question: &str, len: usize) -> anyhow::Result<Option<usize>> {
    ask(question, |answer| parse_index(answer, len))
}

pub fn parse_index(answer: &str, len: usize) -> Result<usize, String> {
    match answer.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Ok(n),
        _ => Err(format!("enter a number between 1 and {len}")),
    }
}

/// Yes/no question. Outside a terminal the default is taken without asking.
pub fn confirm(question: &str, default: bool) -> anyhow::Result<bool> {
    if !interactive() {
        return Ok(default);
    }
    let hint = if default { "Y/n" } else { "y/N" };
    let answer = ask(&format!("{question} [{hint}]"), |answer| parse_yes_no(answer, default))?;
    Ok(answer.unwrap_or(default))
}

fn parse_yes_no(answer: &str, default: bool) -> Result<bool, String> {
    match answer.to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        _ => Err(String::from("answer y or n")),
    }
}
