//! Inventory messages.
//!
//! `InventoryInfoResponse` is the only variable-size layout in the catalogue:
//! `result: u16, count: u16` followed by `count` 40-byte [`Item`] records.

use super::{Message, MessageKind};
use crate::error::WireError;
use crate::wire::{PayloadReader, PayloadWriter};

/// Number of inventory slots on the client.
pub const MAX_INVENTORY_SLOTS: usize = 20;
/// Byte budget of item names.
pub const ITEM_NAME_LEN: usize = 32;
/// Size of one item record on the wire.
pub const ITEM_SIZE: usize = 8 + ITEM_NAME_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemType {
    #[default]
    None,
    Weapon,
    Armor,
    Potion,
    Material,
    Quest,
    Other(u16),
}

impl From<u16> for ItemType {
    fn from(v: u16) -> Self {
        match v {
            0 => ItemType::None,
            1 => ItemType::Weapon,
            2 => ItemType::Armor,
            3 => ItemType::Potion,
            4 => ItemType::Material,
            5 => ItemType::Quest,
            other => ItemType::Other(other),
        }
    }
}

impl From<ItemType> for u16 {
    fn from(t: ItemType) -> u16 {
        match t {
            ItemType::None => 0,
            ItemType::Weapon => 1,
            ItemType::Armor => 2,
            ItemType::Potion => 3,
            ItemType::Material => 4,
            ItemType::Quest => 5,
            ItemType::Other(other) => other,
        }
    }
}

/// One inventory slot record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Item {
    pub item_id: u32,
    pub item_type: ItemType,
    pub quantity: u16,
    pub name: String,
}

impl Item {
    /// A zero id or zero quantity marks an empty slot.
    pub fn is_empty(&self) -> bool {
        self.item_id == 0 || self.quantity == 0
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_u32(self.item_id);
        w.put_u16(self.item_type.into());
        w.put_u16(self.quantity);
        w.put_fixed_str(&self.name, ITEM_NAME_LEN);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            item_id: r.get_u32()?,
            item_type: r.get_u16()?.into(),
            quantity: r.get_u16()?,
            name: r.get_fixed_str(ITEM_NAME_LEN)?,
        })
    }
}

/// Client → server: request a full inventory listing. Empty payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InventoryInfoRequest;

impl Message for InventoryInfoRequest {
    const KIND: MessageKind = MessageKind::InventoryInfoRequest;

    fn encoded_len(&self) -> usize {
        0
    }

    fn write(&self, _w: &mut PayloadWriter) {}

    fn read(_r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self)
    }
}

/// Server → client: full inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventoryInfoResponse {
    /// Zero on success.
    pub result: u16,
    pub items: Vec<Item>,
}

impl Message for InventoryInfoResponse {
    const KIND: MessageKind = MessageKind::InventoryInfoResponse;

    fn encoded_len(&self) -> usize {
        4 + self.items.len() * ITEM_SIZE
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_u16(self.result);
        w.put_u16(self.items.len() as u16);
        for item in &self.items {
            item.write(w);
        }
    }

    /// Reads at most `min(count, readable records, MAX_INVENTORY_SLOTS)` items.
    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        let result = r.get_u16()?;
        let declared = r.get_u16()? as usize;
        let readable = r.remaining() / ITEM_SIZE;
        let count = declared.min(readable).min(MAX_INVENTORY_SLOTS);

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(Item::read(r)?);
        }
        Ok(Self { result, items })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAddRequest {
    pub item_id: u32,
    pub quantity: u16,
}

impl Message for ItemAddRequest {
    const KIND: MessageKind = MessageKind::ItemAddRequest;

    fn encoded_len(&self) -> usize {
        6
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_u32(self.item_id);
        w.put_u16(self.quantity);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            item_id: r.get_u32()?,
            quantity: r.get_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAddResponse {
    pub result: u16,
    pub item: Item,
    pub slot_index: u16,
}

impl Message for ItemAddResponse {
    const KIND: MessageKind = MessageKind::ItemAddResponse;

    fn encoded_len(&self) -> usize {
        2 + ITEM_SIZE + 2
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_u16(self.result);
        self.item.write(w);
        w.put_u16(self.slot_index);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            result: r.get_u16()?,
            item: Item::read(r)?,
            slot_index: r.get_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUseRequest {
    pub slot_index: u16,
}

impl Message for ItemUseRequest {
    const KIND: MessageKind = MessageKind::ItemUseRequest;

    fn encoded_len(&self) -> usize {
        2
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_u16(self.slot_index);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            slot_index: r.get_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUseResponse {
    pub result: u16,
    pub slot_index: u16,
}

impl Message for ItemUseResponse {
    const KIND: MessageKind = MessageKind::ItemUseResponse;

    fn encoded_len(&self) -> usize {
        4
    }

    fn write(&self, w: &mut PayloadWriter) {
        w.put_u16(self.result);
        w.put_u16(self.slot_index);
    }

    fn read(r: &mut PayloadReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            result: r.get_u16()?,
            slot_index: r.get_u16()?,
        })
    }
}
