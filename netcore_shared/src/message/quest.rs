//! Quest messages.

use super::{Message, MessageKind};
use crate::error::WireError;
use crate::wire::{PayloadReader, PayloadWriter};

pub const QUEST_TITLE_LEN: usize = 32;
pub const QUEST_DESC_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestState {
    #[default]
    None,
    InProgress,
    Completed,
    Other(u8),
}

impl From<u8> for QuestState {
    fn from(v: u8) -> Self {
        match v {
            0 => QuestState::None,
            1 => QuestState::InProgress,
            2 => QuestState::Completed,
            other => QuestState::Other(other),
        }
    }
}

impl From<QuestState> for u8 {
    fn from(s: QuestState) -> u8 {
        match s {
            QuestState::None => 0,
            QuestState::InProgress => 1,
            QuestState::Completed => 2,
            QuestState::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestTalkRequest {
    pub npc_id: i32,
}

impl Message for QuestTalkRequest {
    const KIND: MessageKind = MessageKind::QuestTalkRequest;

    fn encoded_len(&self) -> usize {
        4
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i32(self.npc_id);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            npc_id: r.get_i32()?,
        })
    }
}

/// Server → client: the quest an NPC offers. 115 bytes padded to 128.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestTalkResponse {
    pub npc_id: i32,
    pub quest_id: i32,
    pub state: QuestState,
    pub current: u16,
    pub required: u16,
    pub title: String,
    pub description: String,
    pub reward_item_id: u32,
    pub reward_quantity: u16,
}

impl QuestTalkResponse {
    const FIELDS_LEN: usize = 4 + 4 + 1 + 2 + 2 + QUEST_TITLE_LEN + QUEST_DESC_LEN + 4 + 2;
    const SIZE: usize = 128;
}

impl Message for QuestTalkResponse {
    const KIND: MessageKind = MessageKind::QuestTalkResponse;

    fn encoded_len(&self) -> usize {
        Self::SIZE
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i32(self.npc_id);
        w.put_i32(self.quest_id);
        w.put_u8(self.state.into());
        w.put_u16(self.current);
        w.put_u16(self.required);
        w.put_fixed_str(&self.title, QUEST_TITLE_LEN);
        w.put_fixed_str(&self.description, QUEST_DESC_LEN);
        w.put_u32(self.reward_item_id);
        w.put_u16(self.reward_quantity);
        w.put_zeros(Self::SIZE - Self::FIELDS_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        let msg = Self {
            npc_id: r.get_i32()?,
            quest_id: r.get_i32()?,
            state: r.get_u8()?.into(),
            current: r.get_u16()?,
            required: r.get_u16()?,
            title: r.get_fixed_str(QUEST_TITLE_LEN)?,
            description: r.get_fixed_str(QUEST_DESC_LEN)?,
            reward_item_id: r.get_u32()?,
            reward_quantity: r.get_u16()?,
        };
        r.skip(Self::SIZE - Self::FIELDS_LEN)?;
        Ok(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestAcceptRequest {
    pub npc_id: i32,
    pub quest_id: i32,
}

impl Message for QuestAcceptRequest {
    const KIND: MessageKind = MessageKind::QuestAcceptRequest;

    fn encoded_len(&self) -> usize {
        8
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i32(self.npc_id);
        w.put_i32(self.quest_id);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            npc_id: r.get_i32()?,
            quest_id: r.get_i32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestAcceptResponse {
    pub quest_id: i32,
    /// 1 on success.
    pub result: u8,
    pub state: QuestState,
    pub current: u16,
    pub required: u16,
}

impl QuestAcceptResponse {
    pub fn accepted(&self) -> bool {
        self.result == 1
    }
}

impl Message for QuestAcceptResponse {
    const KIND: MessageKind = MessageKind::QuestAcceptResponse;

    fn encoded_len(&self) -> usize {
        10
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i32(self.quest_id);
        w.put_u8(self.result);
        w.put_u8(self.state.into());
        w.put_u16(self.current);
        w.put_u16(self.required);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            quest_id: r.get_i32()?,
            result: r.get_u8()?,
            state: r.get_u8()?.into(),
            current: r.get_u16()?,
            required: r.get_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestProgressNotify {
    pub quest_id: i32,
    pub current: u16,
    pub required: u16,
    pub state: QuestState,
}

impl Message for QuestProgressNotify {
    const KIND: MessageKind = MessageKind::QuestProgressNotify;

    fn encoded_len(&self) -> usize {
        9
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i32(self.quest_id);
        w.put_u16(self.current);
        w.put_u16(self.required);
        w.put_u8(self.state.into());
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            quest_id: r.get_i32()?,
            current: r.get_u16()?,
            required: r.get_u16()?,
            state: r.get_u8()?.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::roundtrip;

    #[test]
    fn talk_response_is_padded_to_128() {
        let msg = QuestTalkResponse {
            npc_id: 3,
            quest_id: 1001,
            state: QuestState::None,
            current: 0,
            required: 5,
            title: "Slime Trouble".into(),
            description: "Defeat five slimes near the well.".into(),
            reward_item_id: 2001,
            reward_quantity: 2,
        };
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn progress_roundtrip() {
        let msg = QuestProgressNotify {
            quest_id: 1001,
            current: 5,
            required: 5,
            state: QuestState::Completed,
        };
        assert_eq!(roundtrip(&msg), msg);
    }
}
