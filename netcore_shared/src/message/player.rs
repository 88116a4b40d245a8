//! Session, match, movement and chat messages.

use super::{Message, MessageKind, CHAT_LEN, NAME_LEN};
use crate::error::WireError;
use crate::math::{Quat, Vec3};
use crate::wire::{PayloadReader, PayloadWriter};

/// Client → server: requested display name.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerName {
    pub name: String,
}

impl Message for PlayerName {
    const KIND: MessageKind = MessageKind::PlayerName;

    fn encoded_len(&self) -> usize {
        NAME_LEN
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_fixed_str(&self.name, NAME_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            name: r.get_fixed_str(NAME_LEN)?,
        })
    }
}

/// Server → client: login accepted, with the id assigned to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerNameSuccess {
    pub assigned_id: i64,
    pub name: String,
}

impl Message for PlayerNameSuccess {
    const KIND: MessageKind = MessageKind::PlayerNameSuccess;

    fn encoded_len(&self) -> usize {
        8 + NAME_LEN
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.assigned_id);
        w.put_fixed_str(&self.name, NAME_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            assigned_id: r.get_i64()?,
            name: r.get_fixed_str(NAME_LEN)?,
        })
    }
}

/// Player id + name pair shared by join and leave notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerJoined {
    pub id: i64,
    pub name: String,
}

impl Message for PlayerJoined {
    const KIND: MessageKind = MessageKind::PlayerJoined;

    fn encoded_len(&self) -> usize {
        8 + NAME_LEN
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.id);
        w.put_fixed_str(&self.name, NAME_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            id: r.get_i64()?,
            name: r.get_fixed_str(NAME_LEN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerLeft {
    pub id: i64,
    pub name: String,
}

impl Message for PlayerLeft {
    const KIND: MessageKind = MessageKind::PlayerLeft;

    fn encoded_len(&self) -> usize {
        8 + NAME_LEN
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.id);
        w.put_fixed_str(&self.name, NAME_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            id: r.get_i64()?,
            name: r.get_fixed_str(NAME_LEN)?,
        })
    }
}

/// Server → client: spawn an already-present player into the match.
///
/// 52 bytes of fields padded to 56.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMatchPlayer {
    pub id: i64,
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
}

impl Message for CreateMatchPlayer {
    const KIND: MessageKind = MessageKind::CreateMatchPlayer;

    fn encoded_len(&self) -> usize {
        56
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.id);
        w.put_fixed_str(&self.name, NAME_LEN);
        w.put_vec3(self.position);
        w.put_quat(self.rotation);
        w.put_zeros(4);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        let msg = Self {
            id: r.get_i64()?,
            name: r.get_fixed_str(NAME_LEN)?,
            position: r.get_vec3()?,
            rotation: r.get_quat()?,
        };
        r.skip(4)?;
        Ok(msg)
    }
}

/// Client → server: local movement input for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMovement {
    pub player_id: i64,
    pub dx: f32,
    pub dy: f32,
    pub rotation: Quat,
}

impl Message for PlayerMovement {
    const KIND: MessageKind = MessageKind::PlayerMovement;

    fn encoded_len(&self) -> usize {
        32
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.player_id);
        w.put_f32(self.dx);
        w.put_f32(self.dy);
        w.put_quat(self.rotation);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            player_id: r.get_i64()?,
            dx: r.get_f32()?,
            dy: r.get_f32()?,
            rotation: r.get_quat()?,
        })
    }
}

/// Server → client: authoritative movement of a player. 36 bytes padded to 40.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlayerMovement {
    pub player_id: i64,
    pub rotation: Quat,
    pub motion: Vec3,
}

impl Message for UpdatePlayerMovement {
    const KIND: MessageKind = MessageKind::UpdatePlayerMovement;

    fn encoded_len(&self) -> usize {
        40
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.player_id);
        w.put_quat(self.rotation);
        w.put_vec3(self.motion);
        w.put_zeros(4);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        let msg = Self {
            player_id: r.get_i64()?,
            rotation: r.get_quat()?,
            motion: r.get_vec3()?,
        };
        r.skip(4)?;
        Ok(msg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendChatMessage {
    pub message: String,
}

impl Message for SendChatMessage {
    const KIND: MessageKind = MessageKind::SendChatMessage;

    fn encoded_len(&self) -> usize {
        CHAT_LEN
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_fixed_str(&self.message, CHAT_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            message: r.get_fixed_str(CHAT_LEN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveChatMessage {
    pub sender: String,
    pub message: String,
}

impl Message for ReceiveChatMessage {
    const KIND: MessageKind = MessageKind::ReceiveChatMessage;

    fn encoded_len(&self) -> usize {
        NAME_LEN + CHAT_LEN
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_fixed_str(&self.sender, NAME_LEN);
        w.put_fixed_str(&self.message, CHAT_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            sender: r.get_fixed_str(NAME_LEN)?,
            message: r.get_fixed_str(CHAT_LEN)?,
        })
    }
}
