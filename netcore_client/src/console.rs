//! Console command parsing for the `client` binary.
//!
//! Commands:
//!   say <message>              - Send chat message
//!   move <forward> <right>     - Send one movement sample
//!   hit <enemy_id> <damage>    - Report a hit on an enemy
//!   inv                        - Request the inventory listing
//!   add <item_id> [quantity]   - Request an item
//!   use <slot>                 - Use the item in a slot
//!   talk <npc_id>              - Ask an NPC for its quest
//!   accept <npc_id> <quest_id> - Accept a quest
//!   status                     - Show client status
//!   quit                       - Exit client

use std::str::FromStr;

use anyhow::{bail, Context};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say(String),
    Move { forward: f32, right: f32 },
    Hit { enemy_id: i64, damage: i32 },
    Inventory,
    Add { item_id: u32, quantity: u16 },
    Use { slot: u16 },
    Talk { npc_id: i32 },
    Accept { npc_id: i32, quest_id: i32 },
    Status,
    Quit,
}

fn arg<T>(tokens: &[&str], index: usize, usage: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = tokens.get(index) else {
        bail!("Usage: {usage}");
    };
    raw.parse()
        .with_context(|| format!("bad argument '{raw}'. Usage: {usage}"))
}

impl Command {
    /// Parses one console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&head) = tokens.first() else {
            return Ok(None);
        };

        let cmd = match head {
            "say" => {
                if tokens.len() < 2 {
                    bail!("Usage: say <message>");
                }
                Command::Say(tokens[1..].join(" "))
            }
            "move" => {
                let usage = "move <forward> <right>";
                Command::Move {
                    forward: arg(&tokens, 1, usage)?,
                    right: arg(&tokens, 2, usage)?,
                }
            }
            "hit" => {
                let usage = "hit <enemy_id> <damage>";
                Command::Hit {
                    enemy_id: arg(&tokens, 1, usage)?,
                    damage: arg(&tokens, 2, usage)?,
                }
            }
            "inv" | "inventory" => Command::Inventory,
            "add" => {
                let usage = "add <item_id> [quantity]";
                Command::Add {
                    item_id: arg(&tokens, 1, usage)?,
                    quantity: if tokens.len() > 2 {
                        arg(&tokens, 2, usage)?
                    } else {
                        1
                    },
                }
            }
            "use" => Command::Use {
                slot: arg(&tokens, 1, "use <slot>")?,
            },
            "talk" => Command::Talk {
                npc_id: arg(&tokens, 1, "talk <npc_id>")?,
            },
            "accept" => {
                let usage = "accept <npc_id> <quest_id>";
                Command::Accept {
                    npc_id: arg(&tokens, 1, usage)?,
                    quest_id: arg(&tokens, 2, usage)?,
                }
            }
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command '{other}'"),
        };
        Ok(Some(cmd))
    }
}
