use actor_runtime::Command;

/// Events the hub publishes to the outer layer through its
/// [`EventBridge`](actor_runtime::EventBridge).
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    CountChanged { counter: String, value: u64 },
    PreferencesChanged { user: String },
    ChildRestarted { role: &'static str, generation: u64 },
}

/// Commands the outer layer sends into the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum HubCommand {
    /// Bump the counter the router was wired to.
    Increment,
    /// Make the pipeline sink pull one reading.
    Pull,
}

impl Command for HubCommand {
    fn kind(&self) -> &'static str {
        match self {
            HubCommand::Increment => "increment",
            HubCommand::Pull => "pull",
        }
    }
}
