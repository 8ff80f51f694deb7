//! Scenario runner that orchestrates the server, Playwright, and visual
//! regression

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle, StepResult};
use crate::server::{ServerConfig, ServerHandle};
use crate::spec::ScenarioSpec;
use crate::visual::{VisualConfig, VisualTester};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub visual_diffs: Vec<VisualDiffResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualDiffResult {
    pub name: String,
    pub matches: bool,
    pub diff_percent: f64,
    pub diff_image_path: Option<String>,
}

/// Result of running the whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Orchestrates one suite run
pub struct ScenarioRunner {
    server_config: ServerConfig,
    playwright_config: PlaywrightConfig,
    visual_config: VisualConfig,

    /// Running server handle (if any)
    server: Option<ServerHandle>,

    specs_dir: PathBuf,
    output_dir: PathBuf,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            server_config: config.server,
            playwright_config: config.playwright,
            visual_config: config.visual,
            server: None,
            specs_dir: config.specs_dir,
            output_dir: config.output_dir,
        }
    }

    /// Start the server under test
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }

        let server = ServerHandle::spawn(self.server_config.clone()).await?;

        // Scenarios navigate relative to the spawned server
        self.playwright_config.base_url = server.base_url().to_string();

        self.server = Some(server);
        Ok(())
    }

    /// Stop the server under test
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Run all scenarios in the specs directory
    pub async fn run_all(&mut self) -> E2eResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.specs_dir)?;
        self.run_specs(&specs).await
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.specs_dir)?;
        let filtered: Vec<ScenarioSpec> =
            specs.into_iter().filter(|s| s.has_tag(tag)).collect();
        self.run_specs(&filtered).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<ScenarioResult> {
        let specs = ScenarioSpec::load_all(&self.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {}", name)))?;

        self.start_server().await?;
        self.run_spec(&spec).await
    }

    /// Run a list of scenarios sequentially
    pub async fn run_specs(&mut self, specs: &[ScenarioSpec]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        self.start_server().await?;

        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            match self.run_spec(spec).await {
                Ok(result) => {
                    if result.success {
                        passed += 1;
                        info!("✓ {} ({} ms)", result.name, result.duration_ms);
                    } else {
                        failed += 1;
                        error!(
                            "✗ {} - {}",
                            result.name,
                            result.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    results.push(result);
                }
                Err(e) => {
                    failed += 1;
                    error!("✗ {} - {}", spec.name, e);
                    results.push(ScenarioResult {
                        name: spec.name.clone(),
                        success: false,
                        duration_ms: 0,
                        steps: vec![],
                        visual_diffs: vec![],
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(SuiteResult {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a single scenario
    pub async fn run_spec(&mut self, spec: &ScenarioSpec) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let mut pw_config = self.playwright_config.clone();
        pw_config.viewport_width = spec.viewport.width;
        pw_config.viewport_height = spec.viewport.height;

        let playwright = PlaywrightHandle::new(pw_config)?;

        let step_results = playwright.run_scenario(spec).await?;

        let mut test_error = step_results
            .iter()
            .find(|r| !r.success)
            .map(|r| format!("{}: {}", r.step_name, r.error.as_deref().unwrap_or("failed")));

        // Screenshots taken by successful steps feed visual regression
        let screenshots: Vec<String> = step_results
            .iter()
            .filter(|r| r.success)
            .filter_map(|r| r.screenshot_path.as_ref())
            .filter_map(|p| p.file_stem())
            .map(|n| n.to_string_lossy().to_string())
            .collect();

        let mut visual_diffs = Vec::new();
        if spec.visual_regression && test_error.is_none() {
            let visual_tester = VisualTester::new(self.visual_config.clone())?;

            for screenshot_name in &screenshots {
                match visual_tester.compare(screenshot_name, Some(spec.visual_threshold)) {
                    Ok(diff) => {
                        if !diff.matches {
                            test_error = Some(format!(
                                "Visual regression in '{}': {:.2}% pixels differ",
                                screenshot_name, diff.diff_percent
                            ));
                        }
                        visual_diffs.push(VisualDiffResult {
                            name: screenshot_name.clone(),
                            matches: diff.matches,
                            diff_percent: diff.diff_percent,
                            diff_image_path: diff
                                .diff_image_path
                                .map(|p| p.to_string_lossy().to_string()),
                        });
                    }
                    Err(E2eError::BaselineNotFound(_)) => {
                        // First run; next run with --update-baselines records one
                        info!(
                            "No baseline for '{}' - create one with --update-baselines",
                            screenshot_name
                        );
                    }
                    Err(e) => {
                        test_error = Some(format!("Visual comparison error: {}", e));
                    }
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = test_error.is_none();

        Ok(ScenarioResult {
            name: spec.name.clone(),
            success,
            duration_ms,
            steps: step_results,
            visual_diffs,
            error: test_error,
        })
    }

    /// Promote every current screenshot to a baseline
    pub fn update_baselines(&self) -> E2eResult<()> {
        let visual_tester = VisualTester::new(self.visual_config.clone())?;

        for entry in std::fs::read_dir(&self.visual_config.actual_dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "png").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    visual_tester.update_baseline(&name.to_string_lossy())?;
                }
            }
        }

        Ok(())
    }

    /// Write suite results to a JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScenarioRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub server: ServerConfig,
    pub playwright: PlaywrightConfig,
    pub visual: VisualConfig,
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            playwright: PlaywrightConfig::default(),
            visual: VisualConfig::default(),
            specs_dir: PathBuf::from("crates/e2e/specs"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}
