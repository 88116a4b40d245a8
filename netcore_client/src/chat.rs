//! Chat history.
//!
//! Keeps the most recent lines in a bounded ring, oldest dropped first.

use std::collections::VecDeque;

use netcore_shared::{
    encoder::Outbox,
    message::{Message, MessageKind, ReceiveChatMessage},
    wire::FrameHeader,
};
use tracing::info;

use crate::registry::FrameReceiver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub sender: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ChatLog {
    history: VecDeque<ChatLine>,
    max: usize,
    /// Lines not yet taken by [`ChatLog::take_unread`].
    unread: usize,
}

impl ChatLog {
    pub fn new(max: usize) -> Self {
        Self {
            history: VecDeque::new(),
            max,
            unread: 0,
        }
    }

    pub fn push(&mut self, line: ChatLine) {
        self.history.push_back(line);
        self.unread += 1;
        while self.history.len() > self.max {
            self.history.pop_front();
        }
        self.unread = self.unread.min(self.history.len());
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> Option<&ChatLine> {
        self.history.back()
    }

    /// Lines received since the previous call, oldest first.
    pub fn take_unread(&mut self) -> Vec<ChatLine> {
        let start = self.history.len() - self.unread;
        self.unread = 0;
        self.history.iter().skip(start).cloned().collect()
    }
}

impl FrameReceiver for ChatLog {
    fn on_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        _outbox: &mut Outbox,
    ) -> anyhow::Result<()> {
        if MessageKind::from_id(header.kind) == Some(MessageKind::ReceiveChatMessage) {
            let msg = ReceiveChatMessage::decode(payload)?;
            info!(sender = %msg.sender, message = %msg.message, "Chat");
            self.push(ChatLine {
                sender: msg.sender,
                message: msg.message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::deliver;

    fn line(n: usize) -> ReceiveChatMessage {
        ReceiveChatMessage {
            sender: "bob".into(),
            message: format!("line {n}"),
        }
    }

    #[test]
    fn keeps_only_recent_lines() {
        let mut log = ChatLog::new(2);
        for n in 0..3 {
            deliver(&mut log, &line(n), &mut Outbox::new()).unwrap();
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().message, "line 2");

        let unread: Vec<String> = log.take_unread().into_iter().map(|l| l.message).collect();
        assert_eq!(unread, vec!["line 1", "line 2"]);
        assert!(log.take_unread().is_empty());

        deliver(&mut log, &line(3), &mut Outbox::new()).unwrap();
        assert_eq!(log.take_unread().len(), 1);
    }
}
