//! `netcore_client`
//!
//! Client-side systems:
//! - Transports for the reliable and unreliable connections
//! - Dispatch bridge from reader tasks to the host task
//! - Receiver registries and the [`GameClient`] host
//! - Consumers for session, match, enemies, inventory, quests and chat
//! - Sequenced hit reports
//! - Input sampling into movement messages
//! - Console command parsing for the binary

pub mod bridge;
pub mod chat;
pub mod client;
pub mod combat;
pub mod console;
pub mod enemies;
pub mod input;
pub mod inventory;
pub mod players;
pub mod quests;
pub mod registry;
pub mod session;
pub mod transport;

pub use client::{GameClient, PumpReport};
pub use registry::{handle, FrameReceiver, ReceiverHandle, ReceiverRegistry};
