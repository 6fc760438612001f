/// The current state of a logical fetch.
///
/// `Idle → InFlight → {Redirecting → InFlight | Emitting → Closed | Failed}`,
/// with `Aborted` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// Configured but not started.
    #[default]
    Idle,

    /// A physical request is waiting for its response head.
    InFlight,

    /// A 3xx arrived and the next hop is being prepared.
    Redirecting,

    /// The final response body is being relayed to the output stream.
    Emitting,

    /// The output stream ended after the last byte.
    Closed,

    /// A terminal error was emitted.
    Failed,

    /// The caller aborted the fetch.
    Aborted,
}

impl FetchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FetchState::Closed | FetchState::Failed | FetchState::Aborted
        )
    }
}
