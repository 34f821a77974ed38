//! Startup management sandbox engine.
//!
//! This crate provides:
//! - Turn-based runs with three bounded meters (capital, reputation, morale)
//! - Weighted event selection driven by the run's state
//! - Generated events with model fallback and built-in content when the
//!   text service is unavailable
//! - SQLite persistence that reconciles and reads older database layouts
//!
//! # Quick Start
//!
//! ```ignore
//! use sandbox_core::{Engine, TurnView};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::from_env()?;
//!     let run = engine.start_run("ali", "TestCo").await?;
//!
//!     if let TurnView::Active { event, .. } = engine.current_event(run).await? {
//!         println!("{}: {}", event.title, event.description);
//!         let outcome = engine.resolve_choice(run, event.options[0].id).await?;
//!         println!("{}", outcome.narrative);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod generator;
pub mod rules;
pub mod selector;
pub mod store;
pub mod testing;
pub mod world;

// Primary public API
pub use config::EngineConfig;
pub use engine::{ChoiceOutcome, Engine, EngineError, RunSetup, TurnView};
pub use generator::{ContentGenerator, ServiceError, TextService};
pub use store::{ReconcileReport, Store, StoreError};
pub use testing::{Reply, ScriptedTextService};
pub use world::{
    Category, Difficulty, Event, EventOption, GameMode, Meter, Meters, Player, Run, RunId,
    TurnRecord,
};
