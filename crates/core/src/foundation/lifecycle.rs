use std::fmt;

/// Bootstrap lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    LoadingConfig,
    LoadingProviders,
    Ready,
    Failed,
}

impl LifecycleState {
    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Ready | LifecycleState::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            LifecycleState::Created => "created",
            LifecycleState::LoadingConfig => "loading-config",
            LifecycleState::LoadingProviders => "loading-providers",
            LifecycleState::Ready => "ready",
            LifecycleState::Failed => "failed",
        };
        write!(f, "{}", state)
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Created
    }
}
