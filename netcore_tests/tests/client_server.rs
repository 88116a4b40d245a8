//! Socket-level integration tests: a real client against the loopback stub.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use netcore_client::{
    handle,
    session::{Session, SessionState},
    FrameReceiver,
};
use netcore_shared::{
    encoder::{encode_typed, Outbox},
    error::NetError,
    message::{
        InventoryInfoResponse, Item, Message, MessageKind, PlayerJoined, PlayerMovement,
        PlayerName, PlayerNameSuccess, ReceiveChatMessage, SendChatMessage,
    },
    math::Quat,
    wire::{encode_frame, FrameHeader, Protocol},
};
use netcore_tests::{bind_ephemeral, connect_pair, init_tracing, pump_for, pump_until};

/// Records `(kind, payload)` for every frame it sees.
#[derive(Default)]
struct Recorder {
    frames: Vec<(u16, Vec<u8>)>,
    disconnects: Vec<Protocol>,
}

impl FrameReceiver for Recorder {
    fn on_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        _outbox: &mut Outbox,
    ) -> anyhow::Result<()> {
        self.frames.push((header.kind, payload.to_vec()));
        Ok(())
    }

    fn on_disconnect(&mut self, protocol: Protocol) {
        self.disconnects.push(protocol);
    }
}

fn recorder() -> (Rc<RefCell<Recorder>>, netcore_client::ReceiverHandle) {
    handle(Recorder::default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn login_roundtrip() -> anyhow::Result<()> {
    init_tracing();
    let (mut server, cfg) = bind_ephemeral().await?;
    let mut client = connect_pair(&mut server, &cfg).await?;

    let (session, session_handle) = handle(Session::new(cfg.player_name.clone()));
    client.subscribe(Protocol::Reliable, session_handle);

    let login = session.borrow().login_request();
    client.send(Protocol::Reliable, &login)?;

    let frame = server.read_frame().await?;
    assert_eq!(frame.kind(), MessageKind::PlayerName.id());
    assert_eq!(PlayerName::decode(&frame.payload)?.name, "TestPlayer");

    server
        .send(&PlayerNameSuccess {
            assigned_id: 1234,
            name: "TestPlayer".into(),
        })
        .await?;

    pump_until(&mut client, |_, _| session.borrow().player_id().is_some()).await?;
    assert_eq!(
        session.borrow().state(),
        &SessionState::InMatch { player_id: 1234 }
    );

    // The join announcement was queued by the session and flushed by the pump.
    let frame = server.read_frame().await?;
    assert_eq!(frame.kind(), MessageKind::PlayerJoined.id());
    let joined = PlayerJoined::decode(&frame.payload)?;
    assert_eq!((joined.id, joined.name.as_str()), (1234, "TestPlayer"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn split_and_coalesced_frames_arrive_in_order() -> anyhow::Result<()> {
    init_tracing();
    let (mut server, cfg) = bind_ephemeral().await?;
    let mut client = connect_pair(&mut server, &cfg).await?;
    let (rec, rec_handle) = recorder();
    client.subscribe(Protocol::Reliable, rec_handle);

    let mut bytes = Vec::new();
    for text in ["one", "two", "three"] {
        bytes.extend_from_slice(&encode_typed(&ReceiveChatMessage {
            sender: "srv".into(),
            message: text.into(),
        })?);
    }
    // An unknown kind is still delivered, opaque.
    bytes.extend_from_slice(&[9, 0, 0x39, 0x30, 0, 0xAA, 0xBB, 0xCC, 0xDD]);

    // Cuts inside a header, inside a payload, and across frame boundaries.
    server.write_chunked(&bytes, &[2, 40, 150, 240, 252]).await?;

    pump_until(&mut client, |_, _| rec.borrow().frames.len() == 4).await?;
    let rec = rec.borrow();
    let texts: Vec<String> = rec.frames[..3]
        .iter()
        .map(|(_, payload)| ReceiveChatMessage::decode(payload).map(|m| m.message))
        .collect::<Result<_, _>>()?;
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert_eq!(rec.frames[3], (12345, vec![0xAA, 0xBB, 0xCC, 0xDD]));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn broken_datagrams_are_dropped() -> anyhow::Result<()> {
    init_tracing();
    let (mut server, cfg) = bind_ephemeral().await?;
    let mut client = connect_pair(&mut server, &cfg).await?;
    let (rec, rec_handle) = recorder();
    client.subscribe(Protocol::Unreliable, rec_handle);

    // Movement goes out on the unreliable path and tells the stub our address.
    client
        .send(
            Protocol::Unreliable,
            &PlayerMovement {
                player_id: 1,
                dx: 0.0,
                dy: 1.0,
                rotation: Quat::IDENTITY,
            },
        )?;
    let datagram = server.recv_datagram().await?;
    assert_eq!(datagram.len(), 5 + 32);

    server.send_datagram(&[1, 2, 3]).await?;
    server.send_datagram(&[40, 0, 5, 0, 0, 1, 2, 3]).await?;
    server
        .send_datagram(&[9, 0, 0x05, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD])
        .await?;

    pump_until(&mut client, |_, _| !rec.borrow().frames.is_empty()).await?;
    pump_for(&mut client, Duration::from_millis(50)).await;

    assert_eq!(rec.borrow().frames, vec![(5, vec![0xAA, 0xBB, 0xCC, 0xDD])]);
    assert!(client.is_connected(Protocol::Unreliable));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn peer_close_is_reported_once() -> anyhow::Result<()> {
    init_tracing();
    let (mut server, cfg) = bind_ephemeral().await?;
    let mut client = connect_pair(&mut server, &cfg).await?;
    let (rec, rec_handle) = recorder();
    let (session, session_handle) = handle(Session::new("x"));
    client.subscribe(Protocol::Reliable, rec_handle);
    client.subscribe(Protocol::Reliable, session_handle);

    server.drop_client();

    let reports = pump_until(&mut client, |_, reports| {
        reports.iter().any(|r| r.lost(Protocol::Reliable))
    })
    .await?;
    let lost = reports
        .iter()
        .flat_map(|r| &r.disconnected)
        .find(|d| d.protocol == Protocol::Reliable)
        .map(|d| matches!(d.reason, Some(NetError::ReadFailed(_))));
    assert_eq!(lost, Some(true));

    let later = pump_for(&mut client, Duration::from_millis(50)).await;
    assert!(later.iter().all(|r| r.disconnected.is_empty()));

    assert!(!client.is_connected(Protocol::Reliable));
    assert!(client.is_connected(Protocol::Unreliable));
    assert_eq!(rec.borrow().disconnects, vec![Protocol::Reliable]);
    assert_eq!(session.borrow().state(), &SessionState::Disconnected);

    assert!(matches!(
        client
            .send(
                Protocol::Reliable,
                &SendChatMessage {
                    message: "late".into()
                }
            ),
        Err(NetError::Closed)
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_during_sends_fails_cleanly() -> anyhow::Result<()> {
    init_tracing();
    let (mut server, cfg) = bind_ephemeral().await?;
    let mut client = connect_pair(&mut server, &cfg).await?;

    let conn = client.connection(Protocol::Reliable).clone();
    let mut senders = Vec::new();
    for n in 0..32 {
        let conn = conn.clone();
        senders.push(tokio::spawn(async move {
            conn.send_typed(&SendChatMessage {
                message: format!("msg {n}"),
            })
        }));
    }
    tokio::task::yield_now().await;
    client.close();
    assert!(!conn.close());

    for sender in senders {
        match sender.await? {
            Ok(()) | Err(NetError::Closed) => {}
            Err(other) => panic!("unexpected send error: {other}"),
        }
    }

    // Every complete frame the stub sees is intact.
    while let Ok(frame) = server.read_frame().await {
        assert_eq!(frame.kind(), MessageKind::SendChatMessage.id());
        assert!(SendChatMessage::decode(&frame.payload)?
            .message
            .starts_with("msg "));
    }

    let reports = pump_until(&mut client, |_, reports| {
        let lost: Vec<_> = reports.iter().flat_map(|r| &r.disconnected).collect();
        lost.len() == 2
    })
    .await?;
    assert!(reports
        .iter()
        .flat_map(|r| &r.disconnected)
        .all(|d| d.reason.is_none()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_subscription_delivers_once() -> anyhow::Result<()> {
    init_tracing();
    let (mut server, cfg) = bind_ephemeral().await?;
    let mut client = connect_pair(&mut server, &cfg).await?;
    let (rec, rec_handle) = recorder();

    assert!(client.subscribe(Protocol::Reliable, rec_handle.clone()));
    assert!(!client.subscribe(Protocol::Reliable, rec_handle.clone()));

    server.write_raw(&encode_frame(77, &[1, 2, 3])?).await?;
    pump_until(&mut client, |_, _| !rec.borrow().frames.is_empty()).await?;
    pump_for(&mut client, Duration::from_millis(30)).await;
    assert_eq!(rec.borrow().frames.len(), 1);

    assert!(client.unsubscribe(Protocol::Reliable, &rec_handle));
    server.write_raw(&encode_frame(78, &[])?).await?;
    pump_for(&mut client, Duration::from_millis(50)).await;
    assert_eq!(rec.borrow().frames.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_peer_does_not_block_the_host() -> anyhow::Result<()> {
    init_tracing();
    let (mut server, cfg) = bind_ephemeral().await?;
    let mut client = connect_pair(&mut server, &cfg).await?;
    let (rec, rec_handle) = recorder();
    client.subscribe(Protocol::Reliable, rec_handle);
    let tick = Duration::from_secs_f64(1.0 / f64::from(cfg.tick_hz));

    // About 24 MB of reliable traffic to a server that never reads: far more
    // than the socket buffers hold.
    let bulk = InventoryInfoResponse {
        result: 0,
        items: vec![Item::default(); 1500],
    };
    for _ in 0..400 {
        client.outbox().push_on(Protocol::Reliable, &bulk)?;
    }

    let started = Instant::now();
    let report = client.pump();
    assert!(started.elapsed() < tick, "pump took {:?}", started.elapsed());
    assert_eq!((report.sent, report.send_failures), (400, 0));

    // Give the writer time to fill the socket and stall.
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Inbound traffic still flows while the writer is stuck.
    server.write_raw(&encode_frame(77, &[1, 2, 3])?).await?;
    pump_until(&mut client, |_, _| !rec.borrow().frames.is_empty()).await?;
    assert_eq!(rec.borrow().frames, vec![(77, vec![1, 2, 3])]);

    client.outbox().push(&SendChatMessage {
        message: "still here".into(),
    })?;
    let started = Instant::now();
    client.pump();
    assert!(started.elapsed() < tick, "pump took {:?}", started.elapsed());

    assert!(client.is_connected(Protocol::Reliable));
    Ok(())
}
