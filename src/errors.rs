use thiserror::Error;

/// Remote command that failed, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ListChannels,
    SetChannelOrder,
    ToggleChannelEnabled,
    SetPrimaryMatch,
    AddManualMatch,
    RemoveMatch,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl Command {
    /// Name used on the command transport
    pub fn wire_name(&self) -> &'static str {
        match self {
            Command::ListChannels => "list_channels_with_mappings",
            Command::SetChannelOrder => "set_channel_order",
            Command::ToggleChannelEnabled => "toggle_channel_enabled",
            Command::SetPrimaryMatch => "set_primary_match",
            Command::AddManualMatch => "add_manual_match",
            Command::RemoveMatch => "remove_match",
        }
    }

    /// Get a user-friendly description of what was being attempted
    pub fn display_name(&self) -> &'static str {
        match self {
            Command::ListChannels => "Loading lineup",
            Command::SetChannelOrder => "Saving channel order",
            Command::ToggleChannelEnabled => "Updating channel",
            Command::SetPrimaryMatch => "Setting primary stream",
            Command::AddManualMatch => "Adding stream",
            Command::RemoveMatch => "Removing stream",
        }
    }
}

/// Failure of a call to the channel-management backend
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LineupError {
    /// The call did not complete within the configured timeout
    #[error("{0} timed out after {1}s")]
    Timeout(Command, u64),

    /// Could not reach the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend returned a non-success status
    #[error("Backend returned {0}: {1}")]
    Server(u16, String),

    /// Response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Backend understood the request and refused it
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Error: {0}")]
    Generic(String),
}

impl LineupError {
    /// One-line text suitable for a transient notice
    pub fn summary(&self) -> String {
        match self {
            LineupError::Timeout(cmd, _) => format!("{} timed out", cmd.display_name()),
            LineupError::Transport(_) => "Backend unreachable".to_string(),
            LineupError::Server(status, _) => format!("Backend error ({})", status),
            LineupError::Parse(_) => "Unexpected backend response".to_string(),
            LineupError::Rejected(reason) => format!("Rejected: {}", reason),
            LineupError::Generic(message) => message.clone(),
        }
    }

    /// Detailed diagnostic information about the error
    pub fn diagnostics(&self) -> String {
        match self {
            LineupError::Timeout(cmd, secs) => {
                format!("Timeout\nCommand: {}\nAfter: {} seconds\nSuggestion: Backend is slow or offline", cmd, secs)
            }
            LineupError::Transport(source) => {
                format!("Transport Error\nError: {}\nSuggestion: Check the backend URL in settings", source)
            }
            LineupError::Server(status, message) => {
                format!("Server Error\nStatus: {}\nMessage: {}\nSuggestion: Try again later", status, message)
            }
            LineupError::Parse(source) => {
                format!("Parse Error\nError: {}\nSuggestion: Backend and client versions may differ", source)
            }
            LineupError::Rejected(reason) => {
                format!("Rejected\nReason: {}\nSuggestion: Refresh the lineup and retry", reason)
            }
            LineupError::Generic(message) => {
                format!("Error\nMessage: {}\nSuggestion: Try again", message)
            }
        }
    }

    /// Map a reqwest failure for `command` into a lineup error
    pub fn from_reqwest(command: Command, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LineupError::Timeout(command, timeout_secs)
        } else if err.is_decode() {
            LineupError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            LineupError::Server(status.as_u16(), err.to_string())
        } else {
            LineupError::Transport(err.to_string())
        }
    }
}

/// Why a gesture was discarded. Never shown as an error; the list simply
/// stays in (or returns to) its prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureRejection {
    /// Released with nothing under the pointer
    NoTarget,
    /// Dropped onto the dragged row itself
    SelfDrop,
    /// Typed position not a number in `[1, count]`
    OutOfRange,
    /// Index or id no longer refers to a live row
    StaleIndex,
    /// Event came from a modality that does not own the session
    ForeignModality,
    /// Pick-up while another session is active
    SessionActive,
    /// Hover, release or step with no session
    NoSession,
}

impl GestureRejection {
    pub fn display_name(&self) -> &'static str {
        match self {
            GestureRejection::NoTarget => "no drop target",
            GestureRejection::SelfDrop => "dropped onto itself",
            GestureRejection::OutOfRange => "position out of range",
            GestureRejection::StaleIndex => "row no longer exists",
            GestureRejection::ForeignModality => "input from another device",
            GestureRejection::SessionActive => "a drag is already in progress",
            GestureRejection::NoSession => "nothing is being dragged",
        }
    }
}
