use std::fmt;

/// Lifecycle of one logical feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Inputs that drive the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// `connect` was requested.
    Open,
    /// Socket open and subscription active.
    Established,
    /// The socket closed or the connect attempt failed.
    TransportClosed,
    /// The health probe reported the backend as up again.
    BackendHealthy,
    /// `disconnect` was requested.
    Shutdown,
}

/// Result of feeding an event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enter(ConnectionState),
    /// Event absorbed without a state change.
    Stay,
    Illegal,
}

impl ConnectionState {
    pub fn on(self, event: ConnectionEvent) -> Transition {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self, event) {
            (S::Disconnected, E::Shutdown) => Transition::Stay,
            (_, E::Shutdown) => Transition::Enter(S::Disconnected),
            (S::Disconnected, E::Open) => Transition::Enter(S::Connecting),
            (S::Connecting, E::Established) => Transition::Enter(S::Connected),
            (S::Connecting | S::Connected, E::TransportClosed) => {
                Transition::Enter(S::Reconnecting)
            }
            // Only one reconnect loop per handle.
            (S::Reconnecting, E::TransportClosed) => Transition::Stay,
            (S::Reconnecting, E::BackendHealthy) => Transition::Enter(S::Connecting),
            _ => Transition::Illegal,
        }
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionEvent as E;
    use ConnectionState as S;

    #[test]
    fn happy_path_reaches_connected() {
        assert_eq!(S::Disconnected.on(E::Open), Transition::Enter(S::Connecting));
        assert_eq!(S::Connecting.on(E::Established), Transition::Enter(S::Connected));
    }

    #[test]
    fn close_while_reconnecting_is_absorbed() {
        assert_eq!(
            S::Connected.on(E::TransportClosed),
            Transition::Enter(S::Reconnecting)
        );
        assert_eq!(S::Reconnecting.on(E::TransportClosed), Transition::Stay);
        assert_eq!(
            S::Reconnecting.on(E::BackendHealthy),
            Transition::Enter(S::Connecting)
        );
    }

    #[test]
    fn failed_connect_goes_to_reconnecting() {
        assert_eq!(
            S::Connecting.on(E::TransportClosed),
            Transition::Enter(S::Reconnecting)
        );
    }

    #[test]
    fn shutdown_is_accepted_everywhere_and_idempotent() {
        for state in [S::Connecting, S::Connected, S::Reconnecting] {
            assert_eq!(state.on(E::Shutdown), Transition::Enter(S::Disconnected));
        }
        assert_eq!(S::Disconnected.on(E::Shutdown), Transition::Stay);
    }

    #[test]
    fn out_of_order_events_are_illegal() {
        assert_eq!(S::Disconnected.on(E::Established), Transition::Illegal);
        assert_eq!(S::Connected.on(E::Open), Transition::Illegal);
        assert_eq!(S::Connected.on(E::BackendHealthy), Transition::Illegal);
        assert_eq!(S::Disconnected.on(E::TransportClosed), Transition::Illegal);
    }
}
