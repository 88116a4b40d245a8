//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p netcore_client --bin client -- [--config client.json]
//!       [--host 127.0.0.1] [--tcp-port 5004] [--udp-port 5025] [--name Player]
//!
//! The client connects both transports, logs in, and pumps the network once
//! per tick. Console commands are listed in `netcore_client::console`.

use std::cell::RefCell;
use std::env;
use std::io::{BufRead, Write};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use netcore_client::{
    chat::ChatLog,
    combat::HitReporter,
    console::Command,
    enemies::EnemyRoster,
    handle,
    input::{build_movement, InputState},
    inventory::Inventory,
    players::MatchRoster,
    quests::QuestLog,
    session::Session,
    GameClient,
};
use netcore_shared::{
    config::ClientConfig,
    message::{
        ItemAddRequest, ItemUseRequest, MessageKind, QuestAcceptRequest, QuestTalkRequest,
        SendChatMessage,
    },
    wire::Protocol,
};
use tokio::sync::mpsc;
use tracing::info;

const CHAT_HISTORY: usize = 64;

fn parse_args() -> anyhow::Result<ClientConfig> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = &args[i + 1];
            let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
            ClientConfig::from_json_str(&text).with_context(|| format!("parse {path}"))?
        }
        _ => ClientConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" if i + 1 < args.len() => {
                cfg.host = args[i + 1].clone();
                i += 2;
            }
            "--tcp-port" if i + 1 < args.len() => {
                cfg.tcp_port = args[i + 1].parse().context("parse --tcp-port")?;
                i += 2;
            }
            "--udp-port" if i + 1 < args.len() => {
                cfg.udp_port = args[i + 1].parse().context("parse --udp-port")?;
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                cfg.player_name = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

/// Typed views of the consumers the console reports on.
struct Views {
    session: Rc<RefCell<Session>>,
    roster: Rc<RefCell<MatchRoster>>,
    enemies: Rc<RefCell<EnemyRoster>>,
    inventory: Rc<RefCell<Inventory>>,
    quests: Rc<RefCell<QuestLog>>,
    hits: HitReporter,
}

/// Runs one console command. Outgoing messages are queued and sent on the
/// next pump.
fn exec(client: &mut GameClient, views: &mut Views, cmd: Command) -> anyhow::Result<Vec<String>> {
    if cmd == Command::Status {
        return Ok(status(client, views));
    }
    let outbox = client.outbox();
    match cmd {
        Command::Say(message) => outbox.push(&SendChatMessage { message })?,
        Command::Move { forward, right } => {
            let Some(player_id) = views.session.borrow().player_id() else {
                return Ok(vec!["Not in a match yet".to_string()]);
            };
            let input = InputState {
                forward,
                right,
                ..InputState::default()
            };
            if let Some(movement) = build_movement(player_id, input) {
                outbox.push(&movement)?;
            }
        }
        Command::Hit { enemy_id, damage } => {
            let Some(hit_pos) = views.enemies.borrow().get(enemy_id).map(|e| e.position) else {
                return Ok(vec![format!("Unknown enemy {enemy_id}")]);
            };
            outbox.push(&views.hits.report(enemy_id, damage, hit_pos))?
        }
        Command::Inventory => {
            outbox.push_empty(Protocol::Reliable, MessageKind::InventoryInfoRequest)?
        }
        Command::Add { item_id, quantity } => {
            outbox.push(&ItemAddRequest { item_id, quantity })?
        }
        Command::Use { slot } => outbox.push(&ItemUseRequest { slot_index: slot })?,
        Command::Talk { npc_id } => outbox.push(&QuestTalkRequest { npc_id })?,
        Command::Accept { npc_id, quest_id } => {
            outbox.push(&QuestAcceptRequest { npc_id, quest_id })?
        }
        Command::Status | Command::Quit => {}
    }
    Ok(Vec::new())
}

fn status(client: &GameClient, views: &Views) -> Vec<String> {
    let session = views.session.borrow();
    let mut out = vec![
        format!("State: {:?}", session.state()),
        format!("Name: {}", session.name()),
        format!(
            "Connected: tcp={} ({}) udp={} ({})",
            client.is_connected(Protocol::Reliable),
            client.connection(Protocol::Reliable).remote_addr(),
            client.is_connected(Protocol::Unreliable),
            client.connection(Protocol::Unreliable).remote_addr(),
        ),
        format!("Players: {}", views.roster.borrow().len()),
        format!(
            "Enemies: {} (kills {})",
            views.enemies.borrow().len(),
            views.enemies.borrow().local_kills()
        ),
        format!("Hits reported: {}", views.hits.last_seq()),
    ];
    for (slot, item) in views.inventory.borrow().items() {
        out.push(format!("  [{slot}] {} x{}", item.name, item.quantity));
    }
    for quest in views.quests.borrow().iter() {
        out.push(format!(
            "  Quest {} '{}': {:?} {}/{}",
            quest.quest_id, quest.title, quest.state, quest.current, quest.required
        ));
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(host = %cfg.host, tcp_port = cfg.tcp_port, udp_port = cfg.udp_port, "Starting client");

    let mut client = GameClient::connect(&cfg).await.context("connect")?;

    let (session, session_handle) = handle(Session::new(cfg.player_name.clone()));
    let (roster, roster_handle) = handle(MatchRoster::new());
    let (enemies, enemies_handle) = handle(EnemyRoster::new());
    let (inventory, inventory_handle) = handle(Inventory::new());
    let (quests, quests_handle) = handle(QuestLog::new());
    let (chat, chat_handle) = handle(ChatLog::new(CHAT_HISTORY));

    client.subscribe(Protocol::Reliable, session_handle);
    client.subscribe(Protocol::Reliable, inventory_handle);
    client.subscribe(Protocol::Reliable, quests_handle);
    client.subscribe(Protocol::Reliable, chat_handle);
    for protocol in [Protocol::Reliable, Protocol::Unreliable] {
        client.subscribe(protocol, roster_handle.clone());
        client.subscribe(protocol, enemies_handle.clone());
    }
    let mut views = Views {
        session,
        roster,
        enemies,
        inventory,
        quests,
        hits: HitReporter::new(),
    };

    let login = views.session.borrow().login_request();
    client
        .send(Protocol::Reliable, &login)
        .context("send login")?;

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let tick_interval = Duration::from_secs_f64(1.0 / f64::from(cfg.tick_hz.max(1)));

    'host: loop {
        // Process console commands.
        while let Ok(line) = console_rx.try_recv() {
            match Command::parse(&line) {
                Ok(None) => {}
                Ok(Some(Command::Quit)) => break 'host,
                Ok(Some(cmd)) => match exec(&mut client, &mut views, cmd) {
                    Ok(output) => {
                        for line in output {
                            println!("{}", line);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
                Err(e) => println!("{}", e),
            }
        }

        let report = client.pump();

        for line in chat.borrow_mut().take_unread() {
            println!("[{}] {}", line.sender, line.message);
        }

        // If the reliable connection is gone, exit.
        if report.lost(Protocol::Reliable) {
            println!("Disconnected from server.");
            break;
        }

        tokio::time::sleep(tick_interval).await;
    }

    client.close();
    Ok(())
}
