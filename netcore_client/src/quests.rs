//! Quest log.

use std::collections::BTreeMap;

use netcore_shared::{
    encoder::Outbox,
    message::{
        Message, MessageKind, QuestAcceptResponse, QuestProgressNotify, QuestState,
        QuestTalkResponse,
    },
    wire::FrameHeader,
};
use tracing::{debug, info, warn};

use crate::registry::FrameReceiver;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestEntry {
    pub quest_id: i32,
    /// NPC that offered the quest, once talked to.
    pub npc_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub state: QuestState,
    pub current: u16,
    pub required: u16,
    pub reward_item_id: u32,
    pub reward_quantity: u16,
}

impl QuestEntry {
    fn new(quest_id: i32) -> Self {
        Self {
            quest_id,
            ..Self::default()
        }
    }
}

/// Quest state per quest id.
#[derive(Debug, Default)]
pub struct QuestLog {
    quests: BTreeMap<i32, QuestEntry>,
}

impl QuestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, quest_id: i32) -> Option<&QuestEntry> {
        self.quests.get(&quest_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestEntry> {
        self.quests.values()
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    fn on_talk(&mut self, msg: QuestTalkResponse) {
        let entry = self
            .quests
            .entry(msg.quest_id)
            .or_insert_with(|| QuestEntry::new(msg.quest_id));
        // A quest finished locally stays finished even if the NPC still
        // reports an older state.
        if entry.state != QuestState::Completed {
            entry.state = msg.state;
        }
        entry.npc_id = Some(msg.npc_id);
        entry.title = msg.title;
        entry.description = msg.description;
        entry.current = msg.current;
        entry.required = msg.required;
        entry.reward_item_id = msg.reward_item_id;
        entry.reward_quantity = msg.reward_quantity;
        info!(quest_id = entry.quest_id, title = %entry.title, state = ?entry.state, "Quest offered");
    }

    fn on_accept(&mut self, msg: QuestAcceptResponse) {
        if !msg.accepted() {
            warn!(quest_id = msg.quest_id, result = msg.result, "Quest not accepted");
            return;
        }
        let entry = self
            .quests
            .entry(msg.quest_id)
            .or_insert_with(|| QuestEntry::new(msg.quest_id));
        entry.state = msg.state;
        entry.current = msg.current;
        entry.required = msg.required;
        info!(quest_id = msg.quest_id, current = msg.current, required = msg.required, "Quest accepted");
    }

    fn on_progress(&mut self, msg: QuestProgressNotify) {
        let Some(entry) = self.quests.get_mut(&msg.quest_id) else {
            debug!(quest_id = msg.quest_id, "Progress for unknown quest");
            return;
        };
        entry.state = msg.state;
        entry.current = msg.current;
        entry.required = msg.required;
        info!(quest_id = msg.quest_id, current = msg.current, required = msg.required, "Quest progress");
    }
}

impl FrameReceiver for QuestLog {
    fn on_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        _outbox: &mut Outbox,
    ) -> anyhow::Result<()> {
        match MessageKind::from_id(header.kind) {
            Some(MessageKind::QuestTalkResponse) => self.on_talk(QuestTalkResponse::decode(payload)?),
            Some(MessageKind::QuestAcceptResponse) => {
                self.on_accept(QuestAcceptResponse::decode(payload)?)
            }
            Some(MessageKind::QuestProgressNotify) => {
                self.on_progress(QuestProgressNotify::decode(payload)?)
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::deliver;

    fn talk(state: QuestState) -> QuestTalkResponse {
        QuestTalkResponse {
            npc_id: 3,
            quest_id: 1001,
            state,
            current: 0,
            required: 5,
            title: "Slime Trouble".into(),
            description: "Defeat five slimes.".into(),
            reward_item_id: 2001,
            reward_quantity: 2,
        }
    }

    #[test]
    fn talk_accept_progress() {
        let mut log = QuestLog::new();
        let mut outbox = Outbox::new();

        deliver(&mut log, &talk(QuestState::None), &mut outbox).unwrap();
        deliver(
            &mut log,
            &QuestAcceptResponse {
                quest_id: 1001,
                result: 1,
                state: QuestState::InProgress,
                current: 0,
                required: 5,
            },
            &mut outbox,
        )
        .unwrap();
        deliver(
            &mut log,
            &QuestProgressNotify {
                quest_id: 1001,
                current: 5,
                required: 5,
                state: QuestState::Completed,
            },
            &mut outbox,
        )
        .unwrap();

        let quest = log.get(1001).unwrap();
        assert_eq!(quest.npc_id, Some(3));
        assert_eq!(quest.state, QuestState::Completed);
        assert_eq!((quest.current, quest.required), (5, 5));

        // Talking again does not roll a completed quest back.
        deliver(&mut log, &talk(QuestState::InProgress), &mut outbox).unwrap();
        assert_eq!(log.get(1001).unwrap().state, QuestState::Completed);
    }

    #[test]
    fn refused_accept_and_unknown_progress_change_nothing() {
        let mut log = QuestLog::new();
        let mut outbox = Outbox::new();
        deliver(
            &mut log,
            &QuestAcceptResponse {
                quest_id: 7,
                result: 0,
                state: QuestState::InProgress,
                current: 0,
                required: 1,
            },
            &mut outbox,
        )
        .unwrap();
        deliver(
            &mut log,
            &QuestProgressNotify {
                quest_id: 7,
                current: 1,
                required: 1,
                state: QuestState::Completed,
            },
            &mut outbox,
        )
        .unwrap();
        assert!(log.is_empty());
    }
}
