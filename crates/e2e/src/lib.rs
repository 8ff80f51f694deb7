//! StreamLens E2E Verification Harness
//!
//! A Rust-controlled end-to-end harness that:
//! - Spawns the dashboard web server as a subprocess
//! - Drives a headless browser through Playwright-generated Node scripts
//! - Parses declarative YAML scenario specs
//! - Performs visual regression testing with baseline screenshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── run_spec(spec) -> ScenarioResult                     │
//! │    │     └── PlaywrightHandle::run_scenario (one session)   │
//! │    └── VisualTester::compare(actual, baseline) -> Diff      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioSpec (YAML)                                        │
//! │    ├── name, description, tags, viewport                    │
//! │    ├── steps: [Step]                                        │
//! │    │     ├── navigate { url }                               │
//! │    │     ├── upload { selector, file }                      │
//! │    │     ├── wait { selector, timeout_ms }                  │
//! │    │     ├── assert { selector, visible?, text?, count? }   │
//! │    │     └── screenshot { name, full_page? }                │
//! │    └── visual_regression + visual_threshold                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod playwright;
pub mod runner;
pub mod server;
pub mod spec;
pub mod visual;

pub use error::{E2eError, E2eResult};
pub use runner::ScenarioRunner;
pub use spec::{ScenarioSpec, ScenarioStep};
