//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection, user prompting and the interactive file picker.

use std::io::{self, BufRead, IsTerminal, Write};

use carryover::selection::{ConfirmRequest, Confirmer, Selection};

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn is_stderr_tty() -> bool {
    io::stderr().is_terminal()
}

/// Prompts are written to stderr, so both ends must be a terminal.
pub fn can_prompt() -> bool {
    is_stdin_tty() && is_stderr_tty()
}

pub fn prompt(message: &str) -> carryover::Result<String> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line).map_err(|e| {
        carryover::Error::new(
            carryover::ErrorCode::InternalIoError,
            format!("Failed to read input: {}", e),
            serde_json::Value::Null,
        )
    })?;

    Ok(line.trim().to_string())
}

/// Prompt showing a default that an empty answer accepts.
pub fn prompt_with_default(message: &str, default: &str) -> carryover::Result<String> {
    let answer = prompt(&format!("{} [{}]: ", message, default))?;
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if is_stderr_tty() {
        eprintln!("{}", message);
    }
}

/// Numbered checklist on stderr; the first `cap` entries are pre-selected.
pub struct TtyConfirmer;

impl Confirmer for TtyConfirmer {
    fn confirm(&self, request: &ConfirmRequest) -> carryover::Result<Selection> {
        eprintln!("Verify files:");
        for (i, file) in request.candidates.iter().enumerate() {
            let mark = if i < request.cap { 'x' } else { ' ' };
            eprintln!("  [{}] {:>3}  {}", mark, i + 1, file);
        }
        if let Some(warning) = &request.warning {
            eprintln!("{}", warning);
        }

        let answer = prompt("Enter = marked files, 'all', numbers (1,3-5), or 'q' to cancel: ")?;
        let picked = match parse_selection(&answer, request.candidates.len(), request.cap)? {
            Some(indices) => indices,
            None => return Ok(Selection::Cancelled),
        };
        Ok(Selection::from_files(
            picked
                .into_iter()
                .map(|i| request.candidates[i].clone())
                .collect(),
        ))
    }
}

/// Parse a picker answer into zero-based indices. `None` means cancel.
fn parse_selection(
    answer: &str,
    count: usize,
    cap: usize,
) -> carryover::Result<Option<Vec<usize>>> {
    let answer = answer.trim();
    match answer {
        "" => return Ok(Some((0..count.min(cap)).collect())),
        "all" | "a" => return Ok(Some((0..count).collect())),
        "q" | "quit" | "n" | "no" => return Ok(None),
        _ => {}
    }

    let invalid = |part: &str| {
        carryover::Error::validation_invalid_argument(
            "selection",
            format!("'{}' is not a file number between 1 and {}", part, count),
            Some(answer.to_string()),
            None,
        )
    };
    let number = |raw: &str| -> carryover::Result<usize> {
        match raw.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= count => Ok(n - 1),
            _ => Err(invalid(raw)),
        }
    };

    let mut picked = Vec::new();
    for part in answer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (number(a)?, number(b)?),
            None => {
                let n = number(part)?;
                (n, n)
            }
        };
        if start > end {
            return Err(invalid(part));
        }
        for i in start..=end {
            if !picked.contains(&i) {
                picked.push(i);
            }
        }
    }
    Ok(Some(picked))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answer_takes_marked_files() {
        assert_eq!(parse_selection("", 20, 15).unwrap(), Some((0..15).collect()));
        assert_eq!(parse_selection("", 3, 15).unwrap(), Some(vec![0, 1, 2]));
    }

    #[test]
    fn numbers_and_ranges_are_one_based() {
        assert_eq!(
            parse_selection("1, 3-4, 3", 5, 15).unwrap(),
            Some(vec![0, 2, 3])
        );
    }

    #[test]
    fn quit_cancels() {
        assert_eq!(parse_selection("q", 5, 15).unwrap(), None);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let err = parse_selection("6", 5, 15).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert!(parse_selection("4-2", 5, 15).is_err());
    }
}
