//! Enemy roster.
//!
//! Damage, death and despawn notifications can overtake the spawn they refer
//! to. Those are parked in a [`ReconcileBuffer`] and replayed when the spawn
//! arrives, so an early hit lands exactly once.
//!
//! Ids of removed enemies are remembered for a while so late updates for
//! them are dropped instead of buffered. Only the most recent
//! [`RETIRED_MEMORY`] ids are kept.

use std::collections::{HashMap, HashSet, VecDeque};

use netcore_shared::{
    encoder::Outbox,
    math::{Quat, Vec3},
    message::{
        EnemyDamageNotify, EnemyDeathNotify, EnemyDespawnNotify, EnemyPatrolUpdate,
        EnemySpawnNotify, Message, MessageKind, PlayerNameSuccess,
    },
    reconcile::ReconcileBuffer,
    wire::{FrameHeader, Protocol},
};
use tracing::{debug, info, warn};

use crate::registry::FrameReceiver;

/// How many removed enemy ids are remembered.
pub const RETIRED_MEMORY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: i64,
    pub enemy_type: i32,
    pub position: Vec3,
    pub rotation: Quat,
    pub max_health: i32,
    pub health: i32,
}

/// Per-enemy updates that only make sense once it exists.
#[derive(Debug, Clone, PartialEq)]
enum EnemyEvent {
    Damaged {
        attacker_id: i64,
        amount: i32,
        remaining_health: i32,
    },
    Moved {
        position: Vec3,
        rotation: Quat,
    },
}

/// Terminal outcomes that arrived before the spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EnemyFate {
    Killed,
    Despawned,
}

/// Recently removed ids, oldest evicted first.
#[derive(Debug, Default)]
struct RetiredIds {
    ids: HashSet<i64>,
    order: VecDeque<i64>,
}

impl RetiredIds {
    fn insert(&mut self, id: i64) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > RETIRED_MEMORY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, id: i64) {
        if self.ids.remove(&id) {
            self.order.retain(|&other| other != id);
        }
    }

    fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.order.clear();
    }
}

#[derive(Debug, Default)]
pub struct EnemyRoster {
    enemies: HashMap<i64, Enemy>,
    pending: ReconcileBuffer<i64, EnemyEvent, EnemyFate>,
    /// Enemies that died or despawned; late updates for them are dropped.
    retired: RetiredIds,
    local_player: Option<i64>,
    local_kills: u32,
}

impl EnemyRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Enemies killed by the local player.
    pub fn local_kills(&self) -> u32 {
        self.local_kills
    }

    /// Removed enemies still remembered.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    /// Updates waiting for a spawn.
    pub fn pending_len(&self) -> usize {
        self.pending.pending_len()
    }

    fn spawn(&mut self, msg: EnemySpawnNotify) {
        if self.enemies.contains_key(&msg.enemy_id) {
            warn!(enemy_id = msg.enemy_id, "Enemy already exists");
            return;
        }
        let id = msg.enemy_id;
        self.retired.remove(id);
        self.enemies.insert(
            id,
            Enemy {
                id,
                enemy_type: msg.enemy_type,
                position: msg.position,
                rotation: msg.rotation,
                max_health: msg.max_health,
                health: msg.current_health,
            },
        );

        let pending = self.pending.on_entity_created(id);
        if !pending.is_empty() {
            debug!(enemy_id = id, events = pending.events.len(), "Replaying early updates");
        }
        for event in pending.events {
            self.apply(id, event);
        }
        if pending.conditions.contains(&EnemyFate::Killed) {
            self.retire(id, EnemyFate::Killed);
        } else if pending.conditions.contains(&EnemyFate::Despawned) {
            self.retire(id, EnemyFate::Despawned);
        }
        info!(enemy_id = id, enemy_type = msg.enemy_type, total = self.enemies.len(), "Enemy spawned");
    }

    fn apply(&mut self, id: i64, event: EnemyEvent) {
        let Some(enemy) = self.enemies.get_mut(&id) else {
            return;
        };
        match event {
            EnemyEvent::Damaged {
                attacker_id,
                amount,
                remaining_health,
            } => {
                enemy.health = remaining_health;
                if Some(attacker_id) == self.local_player {
                    debug!(enemy_id = id, damage = amount, "Hit");
                }
            }
            EnemyEvent::Moved { position, rotation } => {
                enemy.position = position;
                enemy.rotation = rotation;
            }
        }
    }

    fn retire(&mut self, id: i64, fate: EnemyFate) {
        self.pending.on_entity_removed(id);
        self.retired.insert(id);
        if self.enemies.remove(&id).is_some() {
            info!(enemy_id = id, ?fate, total = self.enemies.len(), "Enemy removed");
        }
    }

    fn on_update(&mut self, id: i64, event: EnemyEvent) {
        if self.retired.contains(id) {
            return;
        }
        if let Some(event) = self.pending.on_event(id, event) {
            self.apply(id, event);
        }
    }

    fn on_fate(&mut self, id: i64, fate: EnemyFate) {
        if self.retired.contains(id) {
            return;
        }
        if self.pending.on_condition(id, fate) {
            self.retire(id, fate);
        }
    }
}

impl FrameReceiver for EnemyRoster {
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
                self.local_player = Some(PlayerNameSuccess::decode(payload)?.assigned_id);
            }
            MessageKind::EnemySpawnNotify => self.spawn(EnemySpawnNotify::decode(payload)?),
            MessageKind::EnemyPatrolUpdate => {
                let msg = EnemyPatrolUpdate::decode(payload)?;
                self.on_update(
                    msg.enemy_id,
                    EnemyEvent::Moved {
                        position: msg.position,
                        rotation: msg.rotation,
                    },
                );
            }
            MessageKind::EnemyDamageNotify => {
                let msg = EnemyDamageNotify::decode(payload)?;
                self.on_update(
                    msg.enemy_id,
                    EnemyEvent::Damaged {
                        attacker_id: msg.attacker_id,
                        amount: msg.damage_amount,
                        remaining_health: msg.remaining_health,
                    },
                );
            }
            MessageKind::EnemyDeathNotify => {
                let msg = EnemyDeathNotify::decode(payload)?;
                if Some(msg.killer_id) == self.local_player && !self.retired.contains(msg.enemy_id)
                {
                    self.local_kills += 1;
                }
                self.on_fate(msg.enemy_id, EnemyFate::Killed);
            }
            MessageKind::EnemyDespawnNotify => {
                let msg = EnemyDespawnNotify::decode(payload)?;
                self.on_fate(msg.enemy_id, EnemyFate::Despawned);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_disconnect(&mut self, protocol: Protocol) {
        if protocol == Protocol::Reliable {
            self.enemies.clear();
            self.pending.clear();
            self.retired.clear();
        }
    }
}
