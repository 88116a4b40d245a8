//! Login session state.
//!
//! The client sends `PLAYER_NAME` right after connecting. When the server
//! answers with `PLAYER_NAME_SUCCESS` the session enters the match and
//! announces the player with `PLAYER_JOINED`.

use netcore_shared::{
    encoder::Outbox,
    message::{Message, MessageKind, PlayerJoined, PlayerName, PlayerNameSuccess},
    wire::{FrameHeader, Protocol},
};
use tracing::info;

use crate::registry::FrameReceiver;

/// Where the client is in its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Name sent, waiting for the server to accept it.
    LoggingIn,
    /// Accepted; the server assigned `player_id`.
    InMatch { player_id: i64 },
    /// The reliable connection is gone.
    Disconnected,
}

#[derive(Debug)]
pub struct Session {
    name: String,
    state: SessionState,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SessionState::LoggingIn,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn player_id(&self) -> Option<i64> {
        match self.state {
            SessionState::InMatch { player_id } => Some(player_id),
            _ => None,
        }
    }

    /// The message that starts the login.
    pub fn login_request(&self) -> PlayerName {
        PlayerName {
            name: self.name.clone(),
        }
    }
}

impl FrameReceiver for Session {
    fn on_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        outbox: &mut Outbox,
    ) -> anyhow::Result<()> {
        if MessageKind::from_id(header.kind) != Some(MessageKind::PlayerNameSuccess) {
            return Ok(());
        }
        let msg = PlayerNameSuccess::decode(payload)?;
        if self.state != SessionState::LoggingIn {
            info!(player_id = msg.assigned_id, "Ignoring repeated login confirmation");
            return Ok(());
        }

        info!(player_id = msg.assigned_id, name = %self.name, "Logged in");
        self.state = SessionState::InMatch {
            player_id: msg.assigned_id,
        };
        outbox.push(&PlayerJoined {
            id: msg.assigned_id,
            name: self.name.clone(),
        })?;
        Ok(())
    }

    fn on_disconnect(&mut self, protocol: Protocol) {
        if protocol == Protocol::Reliable {
            self.state = SessionState::Disconnected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::deliver;
    use netcore_shared::wire::decode_frame;

    #[test]
    fn name_success_enters_match_and_announces_player() {
        let mut session = Session::new("kim");
        assert_eq!(session.login_request().name, "kim");

        let mut outbox = Outbox::new();
        deliver(
            &mut session,
            &PlayerNameSuccess {
                assigned_id: 77,
                name: "kim".into(),
            },
            &mut outbox,
        )
        .unwrap();

        assert_eq!(session.player_id(), Some(77));
        let sent = outbox.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].protocol, Protocol::Reliable);
        let frame = decode_frame(&sent[0].bytes).unwrap();
        let joined = PlayerJoined::decode(&frame.payload).unwrap();
        assert_eq!((joined.id, joined.name.as_str()), (77, "kim"));
    }

    #[test]
    fn reliable_disconnect_ends_session() {
        let mut session = Session::new("kim");
        session.on_disconnect(Protocol::Unreliable);
        assert_eq!(session.state(), &SessionState::LoggingIn);
        session.on_disconnect(Protocol::Reliable);
        assert_eq!(session.state(), &SessionState::Disconnected);
    }
}
