//! Two sessions sharing one game over an in-memory peer link, with the
//! handshake carried by a real relay

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use wordle_duet::core::{Completion, GameState, Key};
use wordle_duet::session::{
    Collaborators, MemoryStore, Session, SessionNotice, SessionOptions, StoredStatistics,
};
use wordle_duet::signaling::{ChannelId, RelayConfig, RelayServer};
use wordle_duet::transport::{LoopbackLink, NegotiationState, PeerEndpoint, Role};
use wordle_duet::wordlists::WordLists;

const WAIT: Duration = Duration::from_secs(5);

async fn start_relay() -> String {
    let server = RelayServer::bind(RelayConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    format!("ws://{addr}")
}

fn collaborators() -> Collaborators {
    collaborators_with(MemoryStore::new())
}

fn collaborators_with(store: MemoryStore) -> Collaborators {
    Collaborators {
        words: Arc::new(WordLists::embedded()),
        store: Arc::new(store.clone()),
        stats: Box::new(StoredStatistics::new(Arc::new(store))),
        on_end: None,
    }
}

fn fresh_game() -> GameState {
    GameState::new(&["crane", "slate"], 7, 2).unwrap()
}

fn open(url: &str, channel: &ChannelId, role: Role, endpoint: PeerEndpoint) -> Session {
    open_with(url, channel, role, endpoint, collaborators())
}

fn open_with(
    url: &str,
    channel: &ChannelId,
    role: Role,
    endpoint: PeerEndpoint,
    collab: Collaborators,
) -> Session {
    let options = SessionOptions {
        relay_url: url.to_string(),
        channel: channel.clone(),
        role,
    };
    Session::open(options, fresh_game(), collab, endpoint)
}

/// Start a leader, give its relay subscription time to land, then the joiner.
///
/// The relay does not confirm subscriptions to the session, and an init
/// published before the leader is subscribed is lost.
async fn open_pair(url: &str, endpoints: (PeerEndpoint, PeerEndpoint)) -> (Session, Session) {
    open_pair_with(url, endpoints, collaborators()).await
}

async fn open_pair_with(
    url: &str,
    endpoints: (PeerEndpoint, PeerEndpoint),
    joiner_collab: Collaborators,
) -> (Session, Session) {
    let channel = ChannelId::generate();
    let leader = open(url, &channel, Role::Leader, endpoints.0);
    // Typed before the peer exists; only the snapshot can carry it over
    leader.press(Key::Letter('c')).unwrap();
    sleep(Duration::from_millis(300)).await;
    let joiner = open_with(url, &channel, Role::Joiner, endpoints.1, joiner_collab);
    (leader, joiner)
}

/// Open a pair and wait until the joiner has adopted the leader's game.
///
/// Keys typed before the snapshot lands would be overwritten by it, so tests
/// only type once this returns.
async fn connected_pair(url: &str) -> (Session, Session) {
    connected_pair_with(url, collaborators()).await
}

async fn connected_pair_with(url: &str, joiner_collab: Collaborators) -> (Session, Session) {
    let (mut leader, mut joiner) =
        open_pair_with(url, LoopbackLink::pair(), joiner_collab).await;
    expect_notice(&mut leader, SessionNotice::Connected).await;
    expect_notice(&mut joiner, SessionNotice::Connected).await;
    wait_for_state(&joiner, |g| g.active_guess == "c").await;
    (leader, joiner)
}

async fn expect_notice(session: &mut Session, expected: SessionNotice) {
    let notice = timeout(WAIT, session.next_notice()).await.unwrap();
    assert_eq!(notice, Some(expected));
}

fn type_word(session: &Session, word: &str) {
    for ch in word.chars() {
        session.press(Key::Letter(ch)).unwrap();
    }
}

async fn wait_for_state(session: &Session, check: impl FnMut(&GameState) -> bool) -> GameState {
    let mut state = session.watch_state();
    timeout(WAIT, state.wait_for(check))
        .await
        .unwrap()
        .unwrap()
        .clone()
}

#[tokio::test]
async fn joiner_adopts_leader_game_on_connect() {
    let url = start_relay().await;
    let (leader, joiner) = connected_pair(&url).await;

    assert_eq!(leader.negotiation(), Some(NegotiationState::Connected));
    assert_eq!(joiner.negotiation(), Some(NegotiationState::Connected));
    assert_eq!(
        joiner.snapshot().await.unwrap(),
        leader.snapshot().await.unwrap()
    );

    leader.close().await;
    joiner.close().await;
}

#[tokio::test]
async fn keys_from_both_peers_converge() {
    let url = start_relay().await;
    let (mut leader, joiner) = connected_pair(&url).await;

    type_word(&leader, "ra");
    wait_for_state(&joiner, |g| g.active_guess == "cra").await;

    type_word(&joiner, "ne");
    joiner.press(Key::Enter).unwrap();

    let solved = |g: &GameState| g.boards[0].complete == Completion::Success;
    let on_leader = wait_for_state(&leader, solved).await;
    let on_joiner = wait_for_state(&joiner, solved).await;
    assert_eq!(on_leader, on_joiner);
    assert!(on_leader.active_guess.is_empty());
    assert_eq!(on_leader.boards[1].complete, Completion::Incomplete);

    // A rejected guess is rejected on both sides
    type_word(&leader, "zzzzz");
    leader.press(Key::Enter).unwrap();
    expect_notice(&mut leader, SessionNotice::NotInWordList).await;
    let on_joiner = wait_for_state(&joiner, |g| g.active_guess == "zzzzz").await;
    assert_eq!(on_joiner, leader.snapshot().await.unwrap());

    leader.close().await;
    joiner.close().await;
}

#[tokio::test]
async fn finishing_together_ends_both_sessions() {
    let url = start_relay().await;
    let (mut leader, mut joiner) = connected_pair(&url).await;

    type_word(&leader, "rane");
    leader.press(Key::Enter).unwrap();
    wait_for_state(&joiner, |g| g.boards[0].complete == Completion::Success).await;

    type_word(&joiner, "slate");
    joiner.press(Key::Enter).unwrap();

    let leader_end = timeout(WAIT, leader.next_notice()).await.unwrap();
    let joiner_end = timeout(WAIT, joiner.next_notice()).await.unwrap();
    let Some(SessionNotice::Ended(leader_win)) = leader_end else {
        panic!("leader did not finish: {leader_end:?}")
    };
    assert_eq!(joiner_end, Some(SessionNotice::Ended(leader_win.clone())));
    assert_eq!(leader_win.wins(), 2);

    leader.close().await;
    joiner.close().await;
}

#[tokio::test]
async fn joiner_who_finished_alone_still_ends_the_shared_game() {
    let store = MemoryStore::new();
    let solo = Session::solo(fresh_game(), collaborators_with(store.clone()));
    for word in ["crane", "slate"] {
        type_word(&solo, word);
        solo.press(Key::Enter).unwrap();
    }
    assert!(solo.snapshot().await.unwrap().is_complete());
    solo.close().await;

    let url = start_relay().await;
    let (mut leader, mut joiner) =
        connected_pair_with(&url, collaborators_with(store.clone())).await;
    assert!(!joiner.snapshot().await.unwrap().is_complete());

    type_word(&joiner, "rane");
    joiner.press(Key::Enter).unwrap();
    wait_for_state(&leader, |g| g.boards[0].complete == Completion::Success).await;
    type_word(&leader, "slate");
    leader.press(Key::Enter).unwrap();

    let joiner_end = timeout(WAIT, joiner.next_notice()).await.unwrap();
    let Some(SessionNotice::Ended(win)) = joiner_end else {
        panic!("joiner did not finish: {joiner_end:?}")
    };
    assert_eq!(win.wins(), 2);
    expect_notice(&mut leader, SessionNotice::Ended(win)).await;

    let stats = StoredStatistics::new(Arc::new(store)).load(5, 2).unwrap();
    assert_eq!(stats.played, 2);

    leader.close().await;
    joiner.close().await;
}

#[tokio::test]
async fn peer_close_leaves_a_solo_session() {
    let url = start_relay().await;
    let (mut leader, joiner) = connected_pair(&url).await;

    joiner.close().await;
    expect_notice(&mut leader, SessionNotice::PeerClosed).await;
    assert_eq!(leader.negotiation(), None);

    // Still playable alone
    leader.press(Key::Letter('s')).unwrap();
    assert_eq!(leader.snapshot().await.unwrap().active_guess, "cs");
    leader.close().await;
}

#[tokio::test]
async fn stalled_negotiation_hangs_silently() {
    let url = start_relay().await;
    let (mut leader, mut joiner) =
        open_pair(&url, LoopbackLink::pair_dropping_candidates()).await;

    let joined = timeout(Duration::from_millis(800), joiner.next_notice()).await;
    assert!(joined.is_err(), "no notice while the handshake is stuck");
    assert!(leader.take_notices().is_empty());

    assert_eq!(leader.negotiation(), Some(NegotiationState::Negotiating));
    assert_eq!(joiner.negotiation(), Some(NegotiationState::Negotiating));

    // Local play still works while waiting
    joiner.press(Key::Letter('a')).unwrap();
    assert_eq!(joiner.snapshot().await.unwrap().active_guess, "a");
    assert_eq!(leader.snapshot().await.unwrap().active_guess, "c");

    leader.close().await;
    joiner.close().await;
}

#[tokio::test]
async fn joining_without_a_relay_reports_failure() {
    let (_, endpoint) = LoopbackLink::pair();
    let mut joiner = open(
        "ws://127.0.0.1:1",
        &ChannelId::generate(),
        Role::Joiner,
        endpoint,
    );
    let notice = timeout(WAIT, joiner.next_notice()).await.unwrap();
    assert!(matches!(notice, Some(SessionNotice::SignalingFailed(_))));

    joiner.press(Key::Letter('c')).unwrap();
    assert_eq!(joiner.snapshot().await.unwrap().active_guess, "c");
    joiner.close().await;
}
