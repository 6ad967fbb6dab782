//! Tests for the client controller: mode transitions, polling cadence, and
//! the snapshot-to-render pipeline, driven end to end over a scripted
//! transport.

mod common;

use common::{Script, ScriptedTransport};
use mnk_client::{
    Action, CellView, ClientController, Command, Envelope, RenderFrame, Transport,
};
use serde_json::json;
use std::sync::Arc;

fn rule_set_catalog() -> Script {
    Script::Reply(Envelope::success(json!([{
        "id": 1,
        "name": "Tic-tac-toe",
        "num_players": 2,
        "exact": false,
        "m": 3, "n": 3, "k": 3, "p": 1, "q": 1,
        "num_games": 12
    }])))
}

fn lobby_listing() -> Script {
    Script::Reply(Envelope::success(json!([{
        "id": 7,
        "players": ["alice"],
        "current_player": 0,
        "playing_as": 0,
        "rule_set_id": 1,
        "state": "waiting"
    }])))
}

fn playing_snapshot() -> Script {
    Script::Reply(Envelope::success(json!({
        "players": ["alice", "bob"],
        "board": [[1, 0, 0], [0, 0, 0], [0, 0, 0]],
        "playing_as": 1,
        "current_player": 2,
        "state": "playing",
        "turn": 1,
        "rule_set_id": 1
    })))
}

fn win_snapshot() -> Script {
    Script::Reply(Envelope::success(json!({
        "players": ["alice", "bob"],
        "board": [[1, 2, 0], [2, 1, 0], [0, 0, 1]],
        "playing_as": 1,
        "current_player": 0,
        "state": "win",
        "turn": 5,
        "rule_set_id": 1
    })))
}

#[tokio::test(start_paused = true)]
async fn test_game_is_polled_until_won_then_polling_stops() {
    common::init_tracing();
    let transport = Arc::new(ScriptedTransport::new(vec![
        rule_set_catalog(),
        lobby_listing(),
        playing_snapshot(),
        win_snapshot(),
    ]));
    let (controller, mut handles) = ClientController::new(Arc::clone(&transport) as Arc<dyn Transport>);
    let runner = tokio::spawn(controller.run());

    // Initial refresh lists the lobby.
    let frame = handles.frames.recv().await.unwrap();
    let RenderFrame::Lobby { games } = frame else {
        panic!("expected the lobby listing, got {frame:?}");
    };
    assert_eq!(games.len(), 1);

    // Opening a game shows the loading placeholder, then the snapshot.
    handles.commands.send(Command::OpenGame(mnk_client::GameId(7))).unwrap();
    assert_eq!(handles.frames.recv().await.unwrap(), RenderFrame::Loading);

    let frame = handles.frames.recv().await.unwrap();
    let RenderFrame::Game(view) = frame else {
        panic!("expected a game frame, got {frame:?}");
    };
    assert_eq!(view.status_line(), "Waiting for bob...");
    assert!(matches!(view.cells()[0][0], CellView::Filled(1)));

    // The next poll fires on the playing cadence and delivers the win.
    let frame = handles.frames.recv().await.unwrap();
    let RenderFrame::Game(view) = frame else {
        panic!("expected the won game frame, got {frame:?}");
    };
    assert_eq!(view.status_line(), "You win!");
    let winning: Vec<(usize, usize)> = (0..3)
        .flat_map(|x| (0..3).map(move |y| (x, y)))
        .filter(|&(x, y)| matches!(view.cells()[x][y], CellView::Winning(1)))
        .collect();
    assert_eq!(winning, vec![(0, 0), (1, 1), (2, 2)]);

    // The second status fetch was keyed by the last-known turn.
    let calls = transport.calls();
    assert_eq!(
        calls.iter().map(|(a, _)| *a).collect::<Vec<_>>(),
        vec![
            Action::GetRuleSets,
            Action::GetGames,
            Action::GetGameStatus,
            Action::GetGameStatus,
        ]
    );
    let (_, last_params) = &calls[3];
    assert!(last_params.contains(&("turn", json!(1))));

    // A finished game schedules no further polls.
    handles.commands.send(Command::Shutdown).unwrap();
    runner.await.unwrap().unwrap();
    assert_eq!(transport.calls().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_lobby_resets_game_polling() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        rule_set_catalog(),
        lobby_listing(),
        playing_snapshot(),
        lobby_listing(),
        lobby_listing(),
    ]));
    let (controller, mut handles) = ClientController::new(Arc::clone(&transport) as Arc<dyn Transport>);
    let runner = tokio::spawn(controller.run());

    assert!(matches!(
        handles.frames.recv().await.unwrap(),
        RenderFrame::Lobby { .. }
    ));

    handles.commands.send(Command::OpenGame(mnk_client::GameId(7))).unwrap();
    assert_eq!(handles.frames.recv().await.unwrap(), RenderFrame::Loading);
    assert!(matches!(
        handles.frames.recv().await.unwrap(),
        RenderFrame::Game(_)
    ));

    // Back to the lobby: per-game state is released and the game's pending
    // poll is replaced by the lobby cadence.
    handles.commands.send(Command::ReturnToLobby).unwrap();
    assert!(matches!(
        handles.frames.recv().await.unwrap(),
        RenderFrame::Lobby { .. }
    ));

    // The next timer fire must list games again, not poll the left game.
    assert!(matches!(
        handles.frames.recv().await.unwrap(),
        RenderFrame::Lobby { .. }
    ));
    let actions = transport.actions();
    assert_eq!(
        &actions[2..],
        &[Action::GetGameStatus, Action::GetGames, Action::GetGames]
    );

    handles.commands.send(Command::Shutdown).unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_moves_are_ignored_outside_game_mode() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        rule_set_catalog(),
        lobby_listing(),
    ]));
    let (controller, mut handles) = ClientController::new(Arc::clone(&transport) as Arc<dyn Transport>);
    let runner = tokio::spawn(controller.run());

    assert!(matches!(
        handles.frames.recv().await.unwrap(),
        RenderFrame::Lobby { .. }
    ));

    handles
        .commands
        .send(Command::PlaceStone { x: 0, y: 0 })
        .unwrap();
    handles.commands.send(Command::Shutdown).unwrap();
    runner.await.unwrap().unwrap();

    assert!(
        !transport.actions().contains(&Action::PutTile),
        "a move in lobby mode must never reach the service"
    );
}

#[tokio::test(start_paused = true)]
async fn test_move_response_reuses_the_status_path() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        rule_set_catalog(),
        lobby_listing(),
        playing_snapshot(),
    ]));
    let (controller, mut handles) = ClientController::new(Arc::clone(&transport) as Arc<dyn Transport>);
    let runner = tokio::spawn(controller.run());

    assert!(matches!(
        handles.frames.recv().await.unwrap(),
        RenderFrame::Lobby { .. }
    ));
    handles.commands.send(Command::OpenGame(mnk_client::GameId(7))).unwrap();
    assert_eq!(handles.frames.recv().await.unwrap(), RenderFrame::Loading);
    assert!(matches!(
        handles.frames.recv().await.unwrap(),
        RenderFrame::Game(_)
    ));

    // The move reply is a snapshot and renders exactly like a poll result.
    transport.push(Script::Reply(Envelope::success(json!({
        "players": ["alice", "bob"],
        "board": [[1, 0, 0], [0, 2, 0], [1, 0, 0]],
        "playing_as": 1,
        "current_player": 2,
        "state": "playing",
        "turn": 3,
        "rule_set_id": 1
    }))));
    handles
        .commands
        .send(Command::PlaceStone { x: 2, y: 0 })
        .unwrap();

    let frame = handles.frames.recv().await.unwrap();
    let RenderFrame::Game(view) = frame else {
        panic!("expected a game frame, got {frame:?}");
    };
    assert!(matches!(view.cells()[2][0], CellView::Filled(1)));
    assert!(transport.actions().contains(&Action::PutTile));

    handles.commands.send(Command::Shutdown).unwrap();
    runner.await.unwrap().unwrap();
}
