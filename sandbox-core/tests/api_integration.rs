//! Integration tests that call the real text generation API.
//!
//! These tests require ANTHROPIC_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p sandbox-core --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid API costs and slow runs.

use sandbox_core::config::EngineConfig;
use sandbox_core::generator::ContentSource;
use sandbox_core::world::{Category, Meters};
use sandbox_core::{ContentGenerator, Engine, Store, TextService};
use std::sync::Arc;
use tempfile::TempDir;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Check if API key is available
fn has_api_key() -> bool {
    std::env::var("ANTHROPIC_API_KEY").is_ok()
}

fn live_service() -> Arc<dyn TextService> {
    Arc::new(textgen::Client::from_env().expect("Failed to create client"))
}

#[tokio::test]
#[ignore] // Run with: cargo test -p sandbox-core --test api_integration -- --ignored
async fn test_live_scenario_has_three_options() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let config = EngineConfig::default();
    let generator = ContentGenerator::new(Some(live_service()), config.generator.clone());
    let ctx = sandbox_core::generator::ScenarioContext {
        venture: "TestCo",
        idea: "same-day bicycle courier network",
        turn: 1,
        meters: Meters::initial(),
        category: Category::Crisis,
        difficulty: Category::Crisis.difficulty(),
        recent_titles: &[],
    };

    let generated = generator.draft(&ctx).await;
    println!("Source: {:?}", generated.source);
    println!("Title: {}", generated.draft.title);

    assert!(
        matches!(generated.source, ContentSource::Service { .. }),
        "expected generated content, got {:?}",
        generated.source
    );
    assert_eq!(generated.draft.options.len(), 3);
    let bounds = config.generator.impact_bounds;
    for option in &generated.draft.options {
        assert!(!option.text.trim().is_empty());
        assert!(option.impacts.capital >= bounds.capital.min);
        assert!(option.impacts.capital <= bounds.capital.max);
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test -p sandbox-core --test api_integration -- --ignored
async fn test_live_turn_round_trip() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = Store::open(dir.path().join("live.db")).expect("Failed to open store");
    let engine = Engine::with_store(store, Some(live_service()), EngineConfig::default());

    let run = engine.start_run("ali", "TestCo").await.unwrap();
    let view = engine.current_event(run).await.unwrap();
    let event = view.event().expect("run should be active");
    println!("Event: {} ({})", event.title, event.category);

    let outcome = engine.resolve_choice(run, event.options[0].id).await.unwrap();
    println!("Narrative: {}", outcome.narrative);

    assert!(!outcome.narrative.trim().is_empty());
    assert_eq!(outcome.run.turn, 2);
}
