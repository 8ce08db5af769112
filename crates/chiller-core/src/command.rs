//! Commands a control machine may issue to the daemon.

use std::fmt;
use std::str::FromStr;

use crate::status::Mode;

/// A request to change chiller or daemon state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChillerCommand {
    /// Switch the chiller on.
    Enable,
    /// Switch the chiller off.
    Disable,
    /// Change the control mode. Handled by the daemon, never by the driver.
    SetMode(Mode),
}

impl ChillerCommand {
    pub const ALL: [Self; 4] = [
        Self::Enable,
        Self::Disable,
        Self::SetMode(Mode::Automatic),
        Self::SetMode(Mode::Manual),
    ];

    /// Whether the command is refused while the chiller is in automatic mode.
    pub const fn requires_manual(self) -> bool {
        match self {
            Self::Enable | Self::Disable => true,
            Self::SetMode(_) => false,
        }
    }

    /// Wire name of the command.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::SetMode(Mode::Automatic) => "automatic",
            Self::SetMode(Mode::Manual) => "manual",
        }
    }
}

impl fmt::Display for ChillerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A command name not in [`ChillerCommand::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command \"{0}\"")]
pub struct UnknownCommand(pub String);

impl FromStr for ChillerCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        for command in ChillerCommand::ALL {
            assert_eq!(command.name().parse::<ChillerCommand>(), Ok(command));
        }
        assert_eq!(
            "reboot".parse::<ChillerCommand>(),
            Err(UnknownCommand("reboot".to_string()))
        );
    }

    #[test]
    fn test_only_hardware_commands_require_manual() {
        assert!(ChillerCommand::Enable.requires_manual());
        assert!(ChillerCommand::Disable.requires_manual());
        assert!(!ChillerCommand::SetMode(Mode::Automatic).requires_manual());
        assert!(!ChillerCommand::SetMode(Mode::Manual).requires_manual());
    }
}
