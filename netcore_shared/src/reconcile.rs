//! Reconciliation buffer for out-of-order entity events.
//!
//! Events can name an entity the client has not created yet (a damage
//! notification racing ahead of the spawn). The buffer holds them per entity
//! until [`ReconcileBuffer::on_entity_created`] hands them back.
//!
//! - Events: one pending event per `(entity, variant)`; a newer event of the
//!   same variant replaces the older one.
//! - Conditions: boolean flags such as "pending destruction", accumulated as
//!   a set.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::mem::{discriminant, Discriminant};

/// What was waiting for an entity when it was created.
#[derive(Debug)]
pub struct Pending<E, C> {
    /// Buffered events, in the order each variant was first buffered.
    pub events: Vec<E>,
    pub conditions: HashSet<C>,
}

impl<E, C> Pending<E, C> {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.conditions.is_empty()
    }
}

impl<E, C> Default for Pending<E, C> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            conditions: HashSet::new(),
        }
    }
}

/// Pending-events-by-key store plus pending-flags set.
#[derive(Debug)]
pub struct ReconcileBuffer<K, E, C> {
    known: HashSet<K>,
    events: HashMap<K, Vec<(Discriminant<E>, E)>>,
    conditions: HashMap<K, HashSet<C>>,
}

impl<K, E, C> Default for ReconcileBuffer<K, E, C> {
    fn default() -> Self {
        Self {
            known: HashSet::new(),
            events: HashMap::new(),
            conditions: HashMap::new(),
        }
    }
}

impl<K, E, C> ReconcileBuffer<K, E, C>
where
    K: Eq + Hash + Copy,
    C: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self, id: K) -> bool {
        self.known.contains(&id)
    }

    /// Returns the event if it can be applied now, otherwise buffers it.
    pub fn on_event(&mut self, id: K, event: E) -> Option<E> {
        if self.known.contains(&id) {
            return Some(event);
        }
        let slot = discriminant(&event);
        let pending = self.events.entry(id).or_default();
        match pending.iter_mut().find(|(d, _)| *d == slot) {
            Some(existing) => existing.1 = event,
            None => pending.push((slot, event)),
        }
        None
    }

    /// Returns `true` if the condition applies now, otherwise records it.
    pub fn on_condition(&mut self, id: K, condition: C) -> bool {
        if self.known.contains(&id) {
            return true;
        }
        self.conditions.entry(id).or_default().insert(condition);
        false
    }

    /// Marks the entity as created and drains everything buffered for it.
    pub fn on_entity_created(&mut self, id: K) -> Pending<E, C> {
        self.known.insert(id);
        Pending {
            events: self
                .events
                .remove(&id)
                .map(|v| v.into_iter().map(|(_, e)| e).collect())
                .unwrap_or_default(),
            conditions: self.conditions.remove(&id).unwrap_or_default(),
        }
    }

    /// Forgets the entity and anything still pending for it.
    pub fn on_entity_removed(&mut self, id: K) {
        self.known.remove(&id);
        self.events.remove(&id);
        self.conditions.remove(&id);
    }

    /// Number of buffered events and conditions across all entities.
    pub fn pending_len(&self) -> usize {
        self.events.values().map(Vec::len).sum::<usize>()
            + self.conditions.values().map(HashSet::len).sum::<usize>()
    }

    pub fn clear(&mut self) {
        self.known.clear();
        self.events.clear();
        self.conditions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Damage { amount: i32 },
        Move { x: f32 },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Flag {
        PendingDeath,
        Stunned,
    }

    type Buffer = ReconcileBuffer<i64, Event, Flag>;

    #[test]
    fn damage_before_spawn_is_applied_once_after_creation() {
        let mut buf = Buffer::new();
        let mut applied = Vec::new();

        assert_eq!(buf.on_event(42, Event::Damage { amount: 10 }), None);
        assert_eq!(buf.pending_len(), 1);

        let mut health = 100;
        for event in buf.on_entity_created(42).events {
            if let Event::Damage { amount } = event {
                health -= amount;
                applied.push(amount);
            }
        }

        assert_eq!(health, 90);
        assert_eq!(applied, vec![10]);
        assert_eq!(buf.pending_len(), 0);
        // A second creation does not replay anything.
        assert!(buf.on_entity_created(42).is_empty());
    }

    #[test]
    fn known_entity_applies_immediately() {
        let mut buf = Buffer::new();
        buf.on_entity_created(1);
        assert_eq!(
            buf.on_event(1, Event::Damage { amount: 3 }),
            Some(Event::Damage { amount: 3 })
        );
        assert!(buf.on_condition(1, Flag::PendingDeath));
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn same_variant_is_last_write_wins() {
        let mut buf = Buffer::new();
        buf.on_event(7, Event::Damage { amount: 1 });
        buf.on_event(7, Event::Move { x: 1.0 });
        buf.on_event(7, Event::Damage { amount: 5 });

        let pending = buf.on_entity_created(7);
        assert_eq!(
            pending.events,
            vec![Event::Damage { amount: 5 }, Event::Move { x: 1.0 }]
        );
    }

    #[test]
    fn conditions_accumulate() {
        let mut buf = Buffer::new();
        assert!(!buf.on_condition(3, Flag::PendingDeath));
        assert!(!buf.on_condition(3, Flag::Stunned));
        assert!(!buf.on_condition(3, Flag::PendingDeath));

        let pending = buf.on_entity_created(3);
        assert_eq!(pending.conditions.len(), 2);
        assert!(pending.conditions.contains(&Flag::PendingDeath));
    }

    #[test]
    fn entities_are_independent() {
        let mut buf = Buffer::new();
        buf.on_event(1, Event::Damage { amount: 1 });
        buf.on_event(2, Event::Damage { amount: 2 });
        assert_eq!(
            buf.on_entity_created(2).events,
            vec![Event::Damage { amount: 2 }]
        );
        assert_eq!(buf.pending_len(), 1);
    }

    #[test]
    fn removal_forgets_entity() {
        let mut buf = Buffer::new();
        buf.on_entity_created(9);
        buf.on_entity_removed(9);
        assert!(!buf.is_known(9));
        assert_eq!(buf.on_event(9, Event::Move { x: 0.0 }), None);
        buf.on_entity_removed(9);
        assert_eq!(buf.pending_len(), 0);
    }
}
