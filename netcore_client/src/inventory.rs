//! Client-side view of the player's inventory.
//!
//! The server is authoritative. After a successful add or any use, the
//! inventory asks for a fresh listing instead of patching slots locally.

use netcore_shared::{
    encoder::Outbox,
    message::{
        InventoryInfoResponse, Item, ItemAddResponse, ItemUseResponse, Message, MessageKind,
        MAX_INVENTORY_SLOTS,
    },
    wire::{FrameHeader, Protocol},
};
use tracing::{debug, info, warn};

use crate::registry::FrameReceiver;

#[derive(Debug)]
pub struct Inventory {
    slots: Vec<Option<Item>>,
    /// Listings received so far.
    refreshes: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: vec![None; MAX_INVENTORY_SLOTS],
            refreshes: 0,
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, index: usize) -> Option<&Item> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Occupied slots as `(index, item)`.
    pub fn items(&self) -> impl Iterator<Item = (usize, &Item)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (i, item)))
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    fn replace(&mut self, listing: InventoryInfoResponse) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.refreshes += 1;
        if listing.result != 0 {
            warn!(result = listing.result, "Inventory listing refused");
            return;
        }
        for (slot, item) in self.slots.iter_mut().zip(listing.items) {
            if !item.is_empty() {
                *slot = Some(item);
            }
        }
        info!(occupied = self.occupied(), "Inventory updated");
    }
}

fn request_listing(outbox: &mut Outbox) -> anyhow::Result<()> {
    outbox.push_empty(Protocol::Reliable, MessageKind::InventoryInfoRequest)?;
    Ok(())
}

impl FrameReceiver for Inventory {
    fn on_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        outbox: &mut Outbox,
    ) -> anyhow::Result<()> {
        match MessageKind::from_id(header.kind) {
            Some(MessageKind::InventoryInfoResponse) => {
                self.replace(InventoryInfoResponse::decode(payload)?);
            }
            Some(MessageKind::ItemAddResponse) => {
                let msg = ItemAddResponse::decode(payload)?;
                debug!(result = msg.result, slot = msg.slot_index, "Item add response");
                if msg.result == 0 {
                    request_listing(outbox)?;
                } else {
                    warn!(result = msg.result, item_id = msg.item.item_id, "Item add refused");
                }
            }
            Some(MessageKind::ItemUseResponse) => {
                let msg = ItemUseResponse::decode(payload)?;
                debug!(result = msg.result, slot = msg.slot_index, "Item use response");
                request_listing(outbox)?;
            }
            _ => {}
        }
        Ok(())
    }
}
