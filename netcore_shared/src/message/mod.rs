//! Message catalogue.
//!
//! Every message kind has an explicit payload layout written and read through
//! [`PayloadWriter`]/[`PayloadReader`]. Layouts are packed; where the server
//! declares a larger struct size the trailing bytes are sent as zero padding
//! and skipped on read.
//!
//! Kinds are grouped by feature:
//! - `0..=8`: session, match, movement, chat
//! - `301..`: combat and enemies
//! - `401..`: inventory
//! - `501..`: quests

use crate::error::WireError;
use crate::wire::{PayloadReader, PayloadWriter, Protocol};

pub mod combat;
pub mod inventory;
pub mod player;
pub mod quest;

pub use combat::*;
pub use inventory::*;
pub use player::*;
pub use quest::*;

/// Byte budget of player names.
pub const NAME_LEN: usize = 16;
/// Byte budget of chat text.
pub const CHAT_LEN: usize = 64;

/// Known message kinds. Frames with other kinds are still delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageKind {
    PlayerName = 0,
    PlayerNameSuccess = 1,
    PlayerJoined = 2,
    CreateMatchPlayer = 3,
    PlayerMovement = 4,
    UpdatePlayerMovement = 5,
    SendChatMessage = 6,
    ReceiveChatMessage = 7,
    PlayerLeft = 8,

    // Nothing upstream declares the combat ids; they follow the per-feature
    // hundreds and may need to move if the server assigns others.
    HitReport = 301,
    EnemySpawnNotify = 302,
    EnemyDespawnNotify = 303,
    EnemyPatrolUpdate = 304,
    EnemyDamageNotify = 305,
    EnemyDeathNotify = 306,

    InventoryInfoRequest = 401,
    InventoryInfoResponse = 402,
    ItemAddRequest = 403,
    ItemAddResponse = 404,
    ItemUseRequest = 406,
    ItemUseResponse = 407,

    QuestTalkRequest = 501,
    QuestTalkResponse = 502,
    QuestAcceptRequest = 503,
    QuestAcceptResponse = 504,
    QuestProgressNotify = 505,
}

impl MessageKind {
    const ALL: [MessageKind; 26] = [
        MessageKind::PlayerName,
        MessageKind::PlayerNameSuccess,
        MessageKind::PlayerJoined,
        MessageKind::CreateMatchPlayer,
        MessageKind::PlayerMovement,
        MessageKind::UpdatePlayerMovement,
        MessageKind::SendChatMessage,
        MessageKind::ReceiveChatMessage,
        MessageKind::PlayerLeft,
        MessageKind::HitReport,
        MessageKind::EnemySpawnNotify,
        MessageKind::EnemyDespawnNotify,
        MessageKind::EnemyPatrolUpdate,
        MessageKind::EnemyDamageNotify,
        MessageKind::EnemyDeathNotify,
        MessageKind::InventoryInfoRequest,
        MessageKind::InventoryInfoResponse,
        MessageKind::ItemAddRequest,
        MessageKind::ItemAddResponse,
        MessageKind::ItemUseRequest,
        MessageKind::ItemUseResponse,
        MessageKind::QuestTalkRequest,
        MessageKind::QuestTalkResponse,
        MessageKind::QuestAcceptRequest,
        MessageKind::QuestAcceptResponse,
        MessageKind::QuestProgressNotify,
    ];

    /// Wire discriminant.
    #[inline]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Looks up a wire discriminant; `None` for kinds this build doesn't know.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.id() == id)
    }

    /// Transport a message of this kind normally travels on.
    ///
    /// High-frequency movement favours the unreliable path; everything that
    /// changes state goes over the reliable one.
    pub fn channel(self) -> Protocol {
        match self {
            MessageKind::PlayerMovement
            | MessageKind::UpdatePlayerMovement
            | MessageKind::EnemyPatrolUpdate => Protocol::Unreliable,
            _ => Protocol::Reliable,
        }
    }
}

impl From<MessageKind> for u16 {
    fn from(kind: MessageKind) -> u16 {
        kind.id()
    }
}

impl TryFrom<u16> for MessageKind {
    type Error = u16;

    fn try_from(id: u16) -> Result<Self, u16> {
        Self::from_id(id).ok_or(id)
    }
}

/// A typed payload with an explicit byte layout.
pub trait Message: Sized {
    const KIND: MessageKind;

    /// Number of payload bytes [`Message::write`] must produce.
    fn encoded_len(&self) -> usize;

    fn write(&self, w: &mut PayloadWriter);

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError>;

    /// Decodes a frame payload.
    fn decode(payload: &[u8]) -> Result<Self, WireError> {
        Self::read(&mut PayloadReader::new(payload))
    }
}

#[cfg(test)]
pub(crate) fn roundtrip<M: Message + std::fmt::Debug + PartialEq>(msg: &M) -> M {
    let mut w = PayloadWriter::default();
    msg.write(&mut w);
    assert_eq!(w.len(), msg.encoded_len(), "{:?} layout size", M::KIND);
    M::decode(&w.into_bytes()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ids_roundtrip() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(MessageKind::ItemUseRequest.id(), 406);
        assert_eq!(MessageKind::from_id(405), None);
        assert_eq!(MessageKind::try_from(9), Err(9));
    }

    #[test]
    fn movement_prefers_unreliable() {
        assert_eq!(MessageKind::PlayerMovement.channel(), Protocol::Unreliable);
        assert_eq!(MessageKind::SendChatMessage.channel(), Protocol::Reliable);
        assert_eq!(MessageKind::EnemyDamageNotify.channel(), Protocol::Reliable);
    }
}
