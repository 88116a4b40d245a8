//! Combat and enemy replication messages.

use super::{Message, MessageKind};
use crate::error::WireError;
use crate::math::{Quat, Vec3};
use crate::wire::{PayloadReader, PayloadWriter};

/// Client → server: local hit on an enemy, `seq` deduplicates retries.
#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    pub enemy_id: i64,
    pub damage: i32,
    pub hit_pos: Vec3,
    pub seq: u32,
}

impl Message for HitReport {
    const KIND: MessageKind = MessageKind::HitReport;

    fn encoded_len(&self) -> usize {
        28
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.enemy_id);
        w.put_i32(self.damage);
        w.put_vec3(self.hit_pos);
        w.put_u32(self.seq);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            enemy_id: r.get_i64()?,
            damage: r.get_i32()?,
            hit_pos: r.get_vec3()?,
            seq: r.get_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemySpawnNotify {
    pub enemy_id: i64,
    pub enemy_type: i32,
    pub position: Vec3,
    pub rotation: Quat,
    pub max_health: i32,
    pub current_health: i32,
}

impl Message for EnemySpawnNotify {
    const KIND: MessageKind = MessageKind::EnemySpawnNotify;

    fn encoded_len(&self) -> usize {
        48
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.enemy_id);
        w.put_i32(self.enemy_type);
        w.put_vec3(self.position);
        w.put_quat(self.rotation);
        w.put_i32(self.max_health);
        w.put_i32(self.current_health);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            enemy_id: r.get_i64()?,
            enemy_type: r.get_i32()?,
            position: r.get_vec3()?,
            rotation: r.get_quat()?,
            max_health: r.get_i32()?,
            current_health: r.get_i32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyDespawnNotify {
    pub enemy_id: i64,
}

impl Message for EnemyDespawnNotify {
    const KIND: MessageKind = MessageKind::EnemyDespawnNotify;

    fn encoded_len(&self) -> usize {
        8
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.enemy_id);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            enemy_id: r.get_i64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyPatrolUpdate {
    pub enemy_id: i64,
    pub position: Vec3,
    pub rotation: Quat,
}

impl Message for EnemyPatrolUpdate {
    const KIND: MessageKind = MessageKind::EnemyPatrolUpdate;

    fn encoded_len(&self) -> usize {
        36
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.enemy_id);
        w.put_vec3(self.position);
        w.put_quat(self.rotation);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            enemy_id: r.get_i64()?,
            position: r.get_vec3()?,
            rotation: r.get_quat()?,
        })
    }
}

/// Server → client: an enemy took damage; `remaining_health` is authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyDamageNotify {
    pub enemy_id: i64,
    pub attacker_id: i64,
    pub damage_amount: i32,
    pub remaining_health: i32,
}

impl Message for EnemyDamageNotify {
    const KIND: MessageKind = MessageKind::EnemyDamageNotify;

    fn encoded_len(&self) -> usize {
        24
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.enemy_id);
        w.put_i64(self.attacker_id);
        w.put_i32(self.damage_amount);
        w.put_i32(self.remaining_health);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            enemy_id: r.get_i64()?,
            attacker_id: r.get_i64()?,
            damage_amount: r.get_i32()?,
            remaining_health: r.get_i32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyDeathNotify {
    pub enemy_id: i64,
    pub killer_id: i64,
}

impl Message for EnemyDeathNotify {
    const KIND: MessageKind = MessageKind::EnemyDeathNotify;

    fn encoded_len(&self) -> usize {
        16
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_i64(self.enemy_id);
        w.put_i64(self.killer_id);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            enemy_id: r.get_i64()?,
            killer_id: r.get_i64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::roundtrip;

    #[test]
    fn spawn_roundtrip() {
        let msg = EnemySpawnNotify {
            enemy_id: 42,
            enemy_type: 2,
            position: Vec3::new(10.0, 0.0, -4.5),
            rotation: Quat::IDENTITY,
            max_health: 100,
            current_health: 80,
        };
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn hit_report_layout() {
        let msg = HitReport {
            enemy_id: 1,
            damage: 15,
            hit_pos: Vec3::new(1.0, 2.0, 3.0),
            seq: 9,
        };
        let mut w = PayloadWriter::default();
        msg.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[8..12], &15i32.to_le_bytes());
        assert_eq!(&bytes[24..], &9u32.to_le_bytes());
    }

    #[test]
    fn damage_roundtrip() {
        let msg = EnemyDamageNotify {
            enemy_id: 42,
            attacker_id: 7,
            damage_amount: 10,
            remaining_health: 90,
        };
        assert_eq!(roundtrip(&msg), msg);
    }
}
