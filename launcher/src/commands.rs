//! Line commands read from stdin

use anyhow::{Context, Result, bail};
use ezlaunch_core::ButtonId;

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Button pressed
    Down(ButtonId),
    /// Button released
    Up(ButtonId),
    Next,
    Prev,
    /// Focus the title at this index
    Focus(usize),
    /// Launch the focused title
    Confirm,
    /// Delete the focused title's save data
    Reset,
    List,
    Rescan,
    Quit,
}

/// Parses one line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        bail!("unexpected argument '{}'", extra);
    }

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("down", Some(button)) => Command::Down(button.parse()?),
        ("up", Some(button)) => Command::Up(button.parse()?),
        ("down" | "up", None) => bail!("'{}' needs a button name", verb),
        ("focus", Some(index)) => Command::Focus(
            index
                .parse()
                .with_context(|| format!("invalid index '{}'", index))?,
        ),
        ("focus", None) => bail!("'focus' needs an index"),
        ("next", None) => Command::Next,
        ("prev", None) => Command::Prev,
        ("confirm", None) => Command::Confirm,
        ("reset", None) => Command::Reset,
        ("list", None) => Command::List,
        ("rescan", None) => Command::Rescan,
        ("quit" | "exit", None) => Command::Quit,
        (_, Some(arg)) if is_known(verb) => bail!("'{}' takes no argument (got '{}')", verb, arg),
        _ => bail!("unknown command '{}'", verb),
    };
    Ok(Some(command))
}

fn is_known(verb: &str) -> bool {
    matches!(
        verb.to_ascii_lowercase().as_str(),
        "next" | "prev" | "confirm" | "reset" | "list" | "rescan" | "quit" | "exit"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_button_events() {
        assert_eq!(parse("down Start").unwrap(), Some(Command::Down(ButtonId::Start)));
        assert_eq!(parse("UP select").unwrap(), Some(Command::Up(ButtonId::Select)));
        assert_eq!(parse("down code:96").unwrap(), Some(Command::Down(ButtonId::Code(96))));
    }

    #[test]
    fn test_parse_navigation() {
        assert_eq!(parse("next").unwrap(), Some(Command::Next));
        assert_eq!(parse("  prev  ").unwrap(), Some(Command::Prev));
        assert_eq!(parse("focus 3").unwrap(), Some(Command::Focus(3)));
        assert_eq!(parse("confirm").unwrap(), Some(Command::Confirm));
        assert_eq!(parse("exit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(parse("# hold the menu combo").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("down").is_err());
        assert!(parse("down Turbo").is_err());
        assert!(parse("focus").is_err());
        assert!(parse("focus -1").is_err());
        assert!(parse("next 2").is_err());
        assert!(parse("down A B").is_err());
        assert!(parse("launch").is_err());
    }
}
