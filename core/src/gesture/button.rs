//! Button identifiers and their string form
//!
//! Buttons are written in config files by name (`"Start"`, `"Select"`, ...).
//! Platform key codes that have no name are written as `"code:<n>"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A physical input the launcher listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    A,
    B,
    X,
    Y,
    L,
    R,
    Start,
    Select,
    Up,
    Down,
    Left,
    Right,
    /// Raw platform key code with no gamepad name
    Code(u16),
}

/// Error returned when a button name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown button name: '{0}'")]
pub struct UnknownButton(pub String);

impl ButtonId {
    /// Human-readable name, or `None` for raw key codes.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self {
            ButtonId::A => "A",
            ButtonId::B => "B",
            ButtonId::X => "X",
            ButtonId::Y => "Y",
            ButtonId::L => "L",
            ButtonId::R => "R",
            ButtonId::Start => "Start",
            ButtonId::Select => "Select",
            ButtonId::Up => "Up",
            ButtonId::Down => "Down",
            ButtonId::Left => "Left",
            ButtonId::Right => "Right",
            ButtonId::Code(_) => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonId::Code(code) => write!(f, "code:{}", code),
            other => f.write_str(other.name().unwrap_or("?")),
        }
    }
}

impl FromStr for ButtonId {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        if let Some(code) = lower.strip_prefix("code:") {
            return code
                .parse::<u16>()
                .map(ButtonId::Code)
                .map_err(|_| UnknownButton(trimmed.to_string()));
        }

        match lower.as_str() {
            "a" => Ok(ButtonId::A),
            "b" => Ok(ButtonId::B),
            "x" => Ok(ButtonId::X),
            "y" => Ok(ButtonId::Y),
            "l" => Ok(ButtonId::L),
            "r" => Ok(ButtonId::R),
            "start" => Ok(ButtonId::Start),
            "select" => Ok(ButtonId::Select),
            "up" => Ok(ButtonId::Up),
            "down" => Ok(ButtonId::Down),
            "left" => Ok(ButtonId::Left),
            "right" => Ok(ButtonId::Right),
            _ => Err(UnknownButton(trimmed.to_string())),
        }
    }
}

impl Serialize for ButtonId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ButtonId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("start".parse::<ButtonId>(), Ok(ButtonId::Start));
        assert_eq!("SELECT".parse::<ButtonId>(), Ok(ButtonId::Select));
        assert_eq!(" x ".parse::<ButtonId>(), Ok(ButtonId::X));
    }

    #[test]
    fn parse_raw_codes() {
        assert_eq!("code:96".parse::<ButtonId>(), Ok(ButtonId::Code(96)));
        assert_eq!("Code:7".parse::<ButtonId>(), Ok(ButtonId::Code(7)));
        assert!("code:".parse::<ButtonId>().is_err());
        assert!("code:99999".parse::<ButtonId>().is_err());
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(
            "Turbo".parse::<ButtonId>(),
            Err(UnknownButton("Turbo".to_string()))
        );
        assert!("".parse::<ButtonId>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        for button in [
            ButtonId::A,
            ButtonId::Start,
            ButtonId::Select,
            ButtonId::Right,
            ButtonId::Code(108),
        ] {
            assert_eq!(button.to_string().parse::<ButtonId>(), Ok(button));
        }
    }

    #[test]
    fn buttons_in_toml() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Holder {
            buttons: Vec<ButtonId>,
        }

        let holder: Holder = toml::from_str(r#"buttons = ["select", "Start", "code:4"]"#).unwrap();
        assert_eq!(
            holder.buttons,
            vec![ButtonId::Select, ButtonId::Start, ButtonId::Code(4)]
        );

        let bad: Result<Holder, _> = toml::from_str(r#"buttons = ["Turbo"]"#);
        assert!(bad.is_err());
    }
}
