//! Players in the current match.
//!
//! Subscribed on both connections: joins and leaves arrive reliably, movement
//! updates may come over either path. Updates for the local player are
//! ignored since local movement is already applied client-side.

use std::collections::HashMap;

use netcore_shared::{
    encoder::Outbox,
    math::{Quat, Vec3},
    message::{
        CreateMatchPlayer, Message, MessageKind, PlayerJoined, PlayerLeft, PlayerNameSuccess,
        UpdatePlayerMovement,
    },
    wire::FrameHeader,
};
use tracing::{debug, info};

use crate::registry::FrameReceiver;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchPlayer {
    pub id: i64,
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Default)]
pub struct MatchRoster {
    players: HashMap<i64, MatchPlayer>,
    local_id: Option<i64>,
}

impl MatchRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<&MatchPlayer> {
        self.players.get(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn local_id(&self) -> Option<i64> {
        self.local_id
    }

    /// Players sorted by id.
    pub fn players(&self) -> Vec<&MatchPlayer> {
        let mut players: Vec<_> = self.players.values().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    /// Adds a player unless the id is already present.
    fn add(&mut self, id: i64, name: String, position: Vec3, rotation: Quat) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        info!(player_id = id, name = %name, "Player added to match");
        self.players.insert(
            id,
            MatchPlayer {
                id,
                name,
                position,
                rotation,
            },
        );
        true
    }
}

impl FrameReceiver for MatchRoster {
    fn on_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        _outbox: &mut Outbox,
    ) -> anyhow::Result<()> {
        let Some(kind) = MessageKind::from_id(header.kind) else {
            return Ok(());
        };
        match kind {
            MessageKind::PlayerNameSuccess => {
                let msg = PlayerNameSuccess::decode(payload)?;
                self.local_id = Some(msg.assigned_id);
                self.add(msg.assigned_id, msg.name, Vec3::ZERO, Quat::IDENTITY);
            }
            MessageKind::PlayerJoined => {
                let msg = PlayerJoined::decode(payload)?;
                self.add(msg.id, msg.name, Vec3::ZERO, Quat::IDENTITY);
            }
            MessageKind::CreateMatchPlayer => {
                let msg = CreateMatchPlayer::decode(payload)?;
                self.add(msg.id, msg.name, msg.position, msg.rotation);
            }
            MessageKind::PlayerLeft => {
                let msg = PlayerLeft::decode(payload)?;
                if self.players.remove(&msg.id).is_some() {
                    info!(player_id = msg.id, name = %msg.name, "Player left match");
                }
            }
            MessageKind::UpdatePlayerMovement => {
                let msg = UpdatePlayerMovement::decode(payload)?;
                if Some(msg.player_id) == self.local_id {
                    return Ok(());
                }
                match self.players.get_mut(&msg.player_id) {
                    Some(player) => {
                        player.position = player.position + msg.motion;
                        player.rotation = msg.rotation;
                    }
                    None => debug!(player_id = msg.player_id, "Movement for unknown player"),
                }
            }
            _ => {}
        }
        Ok(())
    }
}
