//! End-to-end play through the engine on a real database file.
//!
//! Run with: `cargo test -p sandbox-core --test engine_flow`

use rusqlite::Connection;
use sandbox_core::config::EngineConfig;
use sandbox_core::testing::scenario_json;
use sandbox_core::world::{Meter, Meters};
use sandbox_core::{
    Engine, EngineError, GameMode, Reply, RunSetup, ScriptedTextService, TurnView,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn offline_engine(dir: &TempDir) -> Engine {
    let config = EngineConfig::default().with_db_path(dir.path().join("game.db"));
    Engine::open(config, None).expect("open engine")
}

// =============================================================================
// Offline play
// =============================================================================

#[tokio::test]
async fn test_offline_run_plays_several_turns() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir).with_seed(11);

    let run = engine.start_run("ali", "TestCo").await.unwrap();
    let start = engine.run(run).unwrap();
    assert_eq!(start.meters, Meters::initial());
    assert_eq!(start.turn, 1);

    let mut resolved = 0;
    for expected_turn in 1..=3 {
        let view = engine.current_event(run).await.unwrap();
        let TurnView::Active { run: current, event } = view else {
            break;
        };
        assert_eq!(current.turn, expected_turn);
        assert_eq!(event.turn, expected_turn);
        assert_eq!(event.options.len(), 3);

        // Pick the option that leaves the weakest meter strongest.
        let option = event
            .options
            .iter()
            .max_by_key(|o| {
                let after = current.meters;
                ((after.capital + o.impacts.capital) / 10)
                    .min(after.reputation + o.impacts.reputation)
                    .min(after.morale + o.impacts.morale)
            })
            .unwrap();
        let outcome = engine.resolve_choice(run, option.id).await.unwrap();
        resolved += 1;

        assert_eq!(outcome.run.turn, expected_turn + 1);
        assert!(outcome.narrative.starts_with("Decision applied."));
        assert_eq!(outcome.record.turn, expected_turn);
        if !outcome.game_over.is_empty() {
            break;
        }
    }

    let timeline = engine.timeline(run).unwrap();
    assert_eq!(timeline.len(), resolved);
    let turns: Vec<i64> = timeline.iter().map(|r| r.turn).collect();
    let expected: Vec<i64> = (1..=resolved as i64).collect();
    assert_eq!(turns, expected);
    assert!(resolved >= 1);
}

#[tokio::test]
async fn test_run_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (run, event_id) = {
        let engine = offline_engine(&dir);
        let run = engine.start_run("ali", "TestCo").await.unwrap();
        let view = engine.current_event(run).await.unwrap();
        (run, view.event().unwrap().id)
    };

    let engine = offline_engine(&dir);
    assert!(engine.store().reconcile_report().is_noop());
    let view = engine.current_event(run).await.unwrap();
    assert_eq!(view.event().unwrap().id, event_id);
}

// =============================================================================
// Game over
// =============================================================================

#[tokio::test]
async fn test_exhausted_capital_ends_run() {
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir);
    let run = engine.start_run("ali", "TestCo").await.unwrap();
    let view = engine.current_event(run).await.unwrap();
    let option = view.event().unwrap().options[0].id;

    // Another process drains the treasury.
    let conn = Connection::open(dir.path().join("game.db")).unwrap();
    conn.execute("UPDATE games SET budget = 0 WHERE id = ?1", [run.0])
        .unwrap();

    let view = engine.current_event(run).await.unwrap();
    match view {
        TurnView::GameOver { run: ended, reasons } => {
            assert_eq!(reasons, vec![Meter::Capital]);
            assert!(ended.game_over);
        }
        other => panic!("expected game over, got {other:?}"),
    }

    let result = engine.resolve_choice(run, option).await;
    assert!(matches!(
        result,
        Err(EngineError::GameOver { ref reasons }) if reasons == &vec![Meter::Capital]
    ));
    assert!(engine.timeline(run).unwrap().is_empty());

    let flagged: (i64, String) = conn
        .query_row(
            "SELECT is_game_over, game_over_reason FROM games WHERE id = ?1",
            [run.0],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(flagged, (1, "CAPITAL".to_string()));
}

#[tokio::test]
async fn test_choice_that_empties_morale_ends_run() {
    let ruinous = r#"{"title": "Mass Layoffs", "description": "The board demands cuts.", "options": [
        {"text": "Cut half the staff", "capital_impact": 500, "reputation_impact": -10, "morale_impact": -50, "risk_level": 5},
        {"text": "Cut salaries", "capital_impact": 200, "reputation_impact": -5, "morale_impact": -30, "risk_level": 4},
        {"text": "Refuse the board", "capital_impact": -300, "reputation_impact": 0, "morale_impact": 10, "risk_level": 3}
    ]}"#;
    let service = Arc::new(ScriptedTextService::new().with_model_reply(
        "claude-sonnet-4-20250514",
        Reply::text(ruinous),
    ));
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_db_path(dir.path().join("game.db"));
    let engine = Engine::open(config, Some(service)).unwrap();

    let run = engine
        .start_run_with(RunSetup::new("ali", "TestCo").with_mode(GameMode::Hard))
        .await
        .unwrap();

    // Hard mode: -50 * 1.1 = -55 morale per layoff round.
    let mut ended = None;
    for _ in 0..3 {
        let view = engine.current_event(run).await.unwrap();
        let Some(event) = view.event() else { break };
        let outcome = engine.resolve_choice(run, event.options[0].id).await.unwrap();
        if !outcome.game_over.is_empty() {
            ended = Some(outcome);
            break;
        }
    }

    let outcome = ended.expect("run should have ended");
    assert_eq!(outcome.game_over, vec![Meter::Morale]);
    assert_eq!(outcome.run.meters.morale, 0);
    assert!(outcome.run.game_over);
    assert!(engine.current_event(run).await.unwrap().is_game_over());
    assert_eq!(engine.timeline(run).unwrap().len(), 2);
}

#[tokio::test]
async fn test_check_game_over_reports_only_failed_meter() {
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir);
    let run = engine.start_run("ali", "TestCo").await.unwrap();
    assert!(engine.check_game_over(run).unwrap().is_empty());
    assert!(!engine.run(run).unwrap().game_over);

    let conn = Connection::open(dir.path().join("game.db")).unwrap();
    conn.execute("UPDATE games SET budget = 0 WHERE id = ?1", [run.0])
        .unwrap();

    assert_eq!(engine.check_game_over(run).unwrap(), vec![Meter::Capital]);
    assert!(engine.run(run).unwrap().game_over);

    let flagged: (i64, String) = conn
        .query_row(
            "SELECT is_game_over, game_over_reason FROM games WHERE id = ?1",
            [run.0],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(flagged, (1, "CAPITAL".to_string()));
}

#[tokio::test]
async fn test_check_game_over_reports_every_failed_meter() {
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir);
    let run = engine.start_run("ali", "TestCo").await.unwrap();

    let conn = Connection::open(dir.path().join("game.db")).unwrap();
    conn.execute(
        "UPDATE games SET budget = 0, reputation = 0, morale = 0 WHERE id = ?1",
        [run.0],
    )
    .unwrap();

    assert_eq!(
        engine.check_game_over(run).unwrap(),
        vec![Meter::Capital, Meter::Reputation, Meter::Morale]
    );

    let flagged: (i64, String) = conn
        .query_row(
            "SELECT is_game_over, game_over_reason FROM games WHERE id = ?1",
            [run.0],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(flagged, (1, "CAPITAL,REPUTATION,MORALE".to_string()));
}

#[tokio::test]
async fn test_flagged_run_without_reason_stays_over() {
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir);
    let run = engine.start_run("ali", "TestCo").await.unwrap();
    let option = engine.current_event(run).await.unwrap().event().unwrap().options[0].id;

    let conn = Connection::open(dir.path().join("game.db")).unwrap();
    conn.execute(
        "UPDATE games SET is_game_over = 1, game_over_reason = NULL WHERE id = ?1",
        [run.0],
    )
    .unwrap();

    // Healthy meters leave nothing to report.
    assert!(engine.check_game_over(run).unwrap().is_empty());
    match engine.current_event(run).await.unwrap() {
        TurnView::GameOver { reasons, .. } => assert!(reasons.is_empty()),
        other => panic!("expected game over, got {other:?}"),
    }
    assert!(matches!(
        engine.resolve_choice(run, option).await,
        Err(EngineError::GameOver { .. })
    ));
}

#[tokio::test]
async fn test_flagged_run_without_reason_recovers_it_from_meters() {
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir);
    let run = engine.start_run("ali", "TestCo").await.unwrap();

    let conn = Connection::open(dir.path().join("game.db")).unwrap();
    conn.execute(
        "UPDATE games SET is_game_over = 1, game_over_reason = NULL, budget = 0 WHERE id = ?1",
        [run.0],
    )
    .unwrap();

    match engine.current_event(run).await.unwrap() {
        TurnView::GameOver { reasons, .. } => assert_eq!(reasons, vec![Meter::Capital]),
        other => panic!("expected game over, got {other:?}"),
    }

    let reason: String = conn
        .query_row(
            "SELECT game_over_reason FROM games WHERE id = ?1",
            [run.0],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(reason, "CAPITAL");
}

// =============================================================================
// Generated content
// =============================================================================

#[tokio::test]
async fn test_recent_titles_reach_the_prompt() {
    let service = Arc::new(ScriptedTextService::new().with_replies([
        Reply::text(scenario_json("Competitor Launch")),
        Reply::text("It went fine."),
        Reply::text(scenario_json("Hiring Freeze")),
    ]));
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_db_path(dir.path().join("game.db"));
    let engine = Engine::open(config, Some(service.clone())).unwrap();

    let run = engine.start_run("ali", "TestCo").await.unwrap();
    let view = engine.current_event(run).await.unwrap();
    assert_eq!(view.event().unwrap().title, "Competitor Launch");
    let option = view.event().unwrap().options[1].id;
    engine.resolve_choice(run, option).await.unwrap();

    let view = engine.current_event(run).await.unwrap();
    assert_eq!(view.event().unwrap().title, "Hiring Freeze");

    let calls = service.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].prompt.contains("Competitor Launch"));
    assert!(calls[2].prompt.contains("Turn: 2"));
}

#[tokio::test]
async fn test_unreachable_service_still_serves_events() {
    let service = Arc::new(ScriptedTextService::unreachable());
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default()
        .with_db_path(dir.path().join("game.db"))
        .with_request_timeout(Duration::from_millis(200));
    let engine = Engine::open(config, Some(service)).unwrap();

    let run = engine.start_run("ali", "TestCo").await.unwrap();
    let view = engine.current_event(run).await.unwrap();
    let event = view.event().unwrap();
    assert_eq!(event.options.len(), 3);

    let outcome = engine.resolve_choice(run, event.options[2].id).await.unwrap();
    assert!(outcome.narrative.starts_with("Decision applied."));
}

#[tokio::test]
async fn test_rejected_key_stops_further_calls() {
    let service = Arc::new(ScriptedTextService::new().with_default(Reply::Fail(
        sandbox_core::ServiceError::Auth("invalid x-api-key".to_string()),
    )));
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_db_path(dir.path().join("game.db"));
    let engine = Engine::open(config, Some(service.clone())).unwrap();

    let run = engine.start_run("ali", "TestCo").await.unwrap();
    engine.current_event(run).await.unwrap();
    engine.advance_turn(run).await.unwrap();
    engine.advance_turn(run).await.unwrap();

    assert_eq!(service.calls().len(), 1);
    assert!(!engine.generator().service_available());
}
