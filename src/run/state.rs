use crate::error::BotError;

/// Phase of a single posting run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Start,
    /// Dataset and checkpoint are in memory
    Loaded,
    /// The verse to post has been chosen
    Selected,
    /// Send attempts in progress
    Delivering,
    /// Delivery confirmed and checkpoint persisted
    Committed,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Start => "start",
            RunState::Loaded => "loaded",
            RunState::Selected => "selected",
            RunState::Delivering => "delivering",
            RunState::Committed => "committed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl RunState {
    /// Check if moving from the current state to `next` is allowed.
    ///
    /// Valid transitions:
    /// - `Start` -> `Loaded` | `Failed`
    /// - `Loaded` -> `Selected` | `Failed`
    /// - `Selected` -> `Delivering` | `Failed`
    /// - `Delivering` -> `Committed` | `Failed`
    /// - `Committed` and `Failed` are terminal
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        match self {
            RunState::Start => matches!(next, RunState::Loaded | RunState::Failed),
            RunState::Loaded => matches!(next, RunState::Selected | RunState::Failed),
            RunState::Selected => matches!(next, RunState::Delivering | RunState::Failed),
            RunState::Delivering => matches!(next, RunState::Committed | RunState::Failed),
            RunState::Committed | RunState::Failed => false,
        }
    }

    /// Attempt to move to `next`, returning an error if the transition is invalid.
    pub fn try_transition(&self, next: RunState) -> Result<RunState, BotError> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(BotError::InvalidState(format!(
                "invalid run transition: {self} -> {next}"
            )))
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Committed | RunState::Failed)
    }
}
