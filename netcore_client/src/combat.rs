//! Outgoing hit reports.
//!
//! Every report carries a sequence number the server uses to drop retries.
//! Numbers start at 1 and only grow for the life of the reporter; they wrap
//! after `u32::MAX`.

use netcore_shared::{math::Vec3, message::HitReport};
use tracing::debug;

#[derive(Debug, Default)]
pub struct HitReporter {
    last_seq: u32,
}

impl HitReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the next report for a hit on `enemy_id`.
    pub fn report(&mut self, enemy_id: i64, damage: i32, hit_pos: Vec3) -> HitReport {
        self.last_seq = self.last_seq.wrapping_add(1);
        debug!(enemy_id, damage, seq = self.last_seq, "Hit reported");
        HitReport {
            enemy_id,
            damage,
            hit_pos,
            seq: self.last_seq,
        }
    }

    /// Sequence number of the latest report, 0 before the first.
    pub fn last_seq(&self) -> u32 {
        self.last_seq
    }
}
