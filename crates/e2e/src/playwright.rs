//! Playwright browser automation
//!
//! A scenario executes as a single generated Node script so that page state
//! survives across steps - the dashboard rendered by an upload step must
//! still be there for the wait and screenshot that follow. The browser is
//! acquired when the script starts and released by its `finally` block.
//! The script prints one JSON line per completed step on stdout; the handle
//! parses those lines back into per-step results.

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::spec::{ScenarioSpec, ScenarioStep, WaitState};

/// Playwright browser handle
pub struct PlaywrightHandle {
    /// Base URL of the server under test
    base_url: String,

    /// Directory screenshots land in
    screenshot_dir: PathBuf,

    /// Viewport dimensions
    viewport_width: u32,
    viewport_height: u32,

    /// Browser type
    browser: Browser,

    /// Headless mode
    headless: bool,

    /// Hard cap on one scenario's wall-clock time
    script_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

/// Result of executing one scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

/// One status line emitted by the generated script
#[derive(Debug, Deserialize)]
struct ScriptEvent {
    step: usize,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    ms: u64,
    #[serde(default)]
    error: Option<String>,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        std::fs::create_dir_all(&config.screenshot_dir)?;

        Ok(Self {
            base_url: config.base_url,
            screenshot_dir: config.screenshot_dir,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            browser: config.browser,
            headless: config.headless,
            script_timeout: config.script_timeout,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Execute every step of a scenario in one browser session.
    ///
    /// Execution stops at the first failed step; steps after it produce no
    /// result entries.
    pub async fn run_scenario(&self, spec: &ScenarioSpec) -> E2eResult<Vec<StepResult>> {
        let steps = resolve_upload_paths(&spec.steps)?;
        let script = self.build_script(&steps);

        debug!("Running scenario '{}' ({} steps)", spec.name, steps.len());
        let output = self.run_script(&script).await?;

        self.collect_results(&steps, &output)
    }

    /// Turn the script's stdout lines into per-step results.
    fn collect_results(
        &self,
        steps: &[ScenarioStep],
        output: &Output,
    ) -> E2eResult<Vec<StepResult>> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let events: Vec<ScriptEvent> = stdout
            .lines()
            .filter_map(|line| serde_json::from_str(line.trim()).ok())
            .collect();

        if events.is_empty() {
            // The script died before the first step: missing playwright
            // module, bad node install, syntax error in generated code.
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "script produced no step results (exit: {:?}):\n{}",
                output.status.code(),
                stderr
            )));
        }

        let mut results = Vec::new();
        for event in events {
            let step = steps.get(event.step);
            let step_name = step.map(step_name).unwrap_or_else(|| "?".to_string());

            let screenshot_path = match (event.ok, step) {
                (true, Some(ScenarioStep::Screenshot { name, .. })) => {
                    Some(self.screenshot_dir.join(format!("{}.png", name)))
                }
                _ => None,
            };

            results.push(StepResult {
                success: event.ok,
                step_name,
                duration_ms: event.ms,
                error: event.error,
                screenshot_path,
            });
        }

        Ok(results)
    }

    /// Build the Node script for a list of steps
    pub fn build_script(&self, steps: &[ScenarioStep]) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = '{base_url}';
  let stepIndex = 0;
  let t0 = 0;
  const mark = (startedAt) => {{
    console.log(JSON.stringify({{ step: stepIndex++, ok: true, ms: Date.now() - startedAt }}));
  }};

  try {{
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport_width,
            height = self.viewport_height,
            base_url = js_str(&self.base_url),
        ));

        for (i, step) in steps.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, step_name(step)));
            script.push_str("    t0 = Date.now();\n");
            script.push_str(&self.step_to_js(step, i));
            script.push_str("    mark(t0);\n");
        }

        script.push_str(
            r#"  } catch (error) {
    console.log(JSON.stringify({ step: stepIndex, ok: false, error: error.message }));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }

    /// Convert a step to JavaScript
    fn step_to_js(&self, step: &ScenarioStep, step_index: usize) -> String {
        match step {
            ScenarioStep::Navigate {
                url,
                wait_for_selector,
            } => {
                let wait = wait_for_selector
                    .as_ref()
                    .map(|s| format!("    await page.waitForSelector('{}');\n", js_str(s)))
                    .unwrap_or_default();
                format!(
                    "    await page.goto(baseUrl + '{}');\n{}",
                    js_str(url),
                    wait
                )
            }
            ScenarioStep::Click {
                selector,
                timeout_ms,
            } => {
                let timeout = timeout_ms.unwrap_or(5000);
                format!(
                    "    await page.click('{}', {{ timeout: {} }});\n",
                    js_str(selector),
                    timeout
                )
            }
            ScenarioStep::Upload { selector, file } => {
                // The click opens the native chooser; the event listener
                // must be armed before the click or the chooser is missed.
                format!(
                    "    const chooser{idx} = await Promise.all([\n      \
                     page.waitForEvent('filechooser'),\n      \
                     page.click('{sel}'),\n    ]).then(([fc]) => fc);\n    \
                     await chooser{idx}.setFiles('{file}');\n",
                    idx = step_index,
                    sel = js_str(selector),
                    file = js_str(&file.to_string_lossy()),
                )
            }
            ScenarioStep::Fill { selector, value } => {
                format!(
                    "    await page.fill('{}', '{}');\n",
                    js_str(selector),
                    js_str(value)
                )
            }
            ScenarioStep::Wait {
                selector,
                timeout_ms,
                state,
            } => {
                let state_str = match state {
                    WaitState::Visible => "visible",
                    WaitState::Hidden => "hidden",
                    WaitState::Attached => "attached",
                    WaitState::Detached => "detached",
                };
                format!(
                    "    await page.waitForSelector('{}', {{ state: '{}', timeout: {} }});\n",
                    js_str(selector),
                    state_str,
                    timeout_ms
                )
            }
            ScenarioStep::Sleep { ms } => {
                format!("    await page.waitForTimeout({});\n", ms)
            }
            ScenarioStep::Assert {
                selector,
                visible,
                text,
                text_contains,
                count,
            } => {
                let sel = js_str(selector);
                let mut checks = String::new();

                if let Some(vis) = visible {
                    if *vis {
                        checks.push_str(&format!(
                            "    if (!(await page.locator('{sel}').first().isVisible())) \
                             throw new Error('expected {sel} to be visible');\n"
                        ));
                    } else {
                        checks.push_str(&format!(
                            "    if (await page.locator('{sel}').count() > 0 && \
                             await page.locator('{sel}').first().isVisible()) \
                             throw new Error('expected {sel} to be hidden');\n"
                        ));
                    }
                }

                if let Some(t) = text {
                    let expected = js_str(t);
                    checks.push_str(&format!(
                        "    {{\n      const actual = (await page.locator('{sel}').first().innerText()).trim();\n      \
                         if (actual !== '{expected}') \
                         throw new Error('text mismatch on {sel}: ' + actual);\n    }}\n"
                    ));
                }

                if let Some(tc) = text_contains {
                    let expected = js_str(tc);
                    checks.push_str(&format!(
                        "    {{\n      const actual = await page.locator('{sel}').first().innerText();\n      \
                         if (!actual.includes('{expected}')) \
                         throw new Error('text of {sel} does not contain {expected}: ' + actual);\n    }}\n"
                    ));
                }

                if let Some(c) = count {
                    checks.push_str(&format!(
                        "    {{\n      const n = await page.locator('{sel}').count();\n      \
                         if (n !== {c}) \
                         throw new Error('expected {c} of {sel}, found ' + n);\n    }}\n"
                    ));
                }

                checks
            }
            ScenarioStep::Screenshot {
                name,
                selector,
                full_page,
            } => {
                let path = self.screenshot_dir.join(format!("{}.png", name));
                let path_str = js_str(&path.to_string_lossy());

                match selector {
                    Some(sel) => format!(
                        "    await page.locator('{}').first().screenshot({{ path: '{}' }});\n",
                        js_str(sel),
                        path_str
                    ),
                    None => format!(
                        "    await page.screenshot({{ path: '{}', fullPage: {} }});\n",
                        path_str, full_page
                    ),
                }
            }
            ScenarioStep::Evaluate { script, expected } => {
                let mut block = format!(
                    "    {{\n      const result = await page.evaluate(() => {{ {} }});\n",
                    script
                );
                if let Some(expected) = expected {
                    block.push_str(&format!(
                        "      const expected = {};\n      \
                         if (JSON.stringify(result) !== JSON.stringify(expected)) \
                         throw new Error('evaluate mismatch: ' + JSON.stringify(result));\n",
                        expected
                    ));
                }
                block.push_str("    }\n");
                block
            }
            ScenarioStep::Log { message } => {
                // stderr, so the stdout status lines stay parseable
                format!("    console.error('[scenario] {}');\n", js_str(message))
            }
        }
    }

    /// Write the script to a temp dir and run it with node.
    async fn run_script(&self, script: &str) -> E2eResult<Output> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        // No current_dir override: `require('playwright')` resolves from
        // the harness's working directory, where node_modules lives.
        let run = TokioCommand::new("node").arg(&script_path).output();

        match tokio::time::timeout(self.script_timeout, run).await {
            Ok(output) => Ok(output?),
            Err(_) => {
                warn!("Scenario script exceeded {:?}", self.script_timeout);
                Err(E2eError::Playwright(format!(
                    "scenario timed out after {:?}",
                    self.script_timeout
                )))
            }
        }
    }
}

/// Display name for a step
pub fn step_name(step: &ScenarioStep) -> String {
    match step {
        ScenarioStep::Navigate { url, .. } => format!("navigate:{}", url),
        ScenarioStep::Click { selector, .. } => format!("click:{}", selector),
        ScenarioStep::Upload { selector, .. } => format!("upload:{}", selector),
        ScenarioStep::Fill { selector, .. } => format!("fill:{}", selector),
        ScenarioStep::Wait { selector, .. } => format!("wait:{}", selector),
        ScenarioStep::Sleep { ms } => format!("sleep:{}ms", ms),
        ScenarioStep::Assert { selector, .. } => format!("assert:{}", selector),
        ScenarioStep::Screenshot { name, .. } => format!("screenshot:{}", name),
        ScenarioStep::Evaluate { .. } => "evaluate".to_string(),
        ScenarioStep::Log { message } => {
            format!("log:{}", &message[..message.len().min(30)])
        }
    }
}

/// Canonicalize upload paths up front so a missing file fails the scenario
/// with a useful error instead of a browser-side exception.
fn resolve_upload_paths(steps: &[ScenarioStep]) -> E2eResult<Vec<ScenarioStep>> {
    steps
        .iter()
        .map(|step| match step {
            ScenarioStep::Upload { selector, file } => {
                let resolved = std::fs::canonicalize(file).map_err(|_| {
                    E2eError::UploadFileMissing(file.display().to_string())
                })?;
                Ok(ScenarioStep::Upload {
                    selector: selector.clone(),
                    file: resolved,
                })
            }
            other => Ok(other.clone()),
        })
        .collect()
}

/// Escape a string for a single-quoted JavaScript literal
fn js_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    pub script_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            script_timeout: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn handle() -> PlaywrightHandle {
        // Bypass the installation probe; codegen needs no browser
        PlaywrightHandle {
            base_url: "http://127.0.0.1:9000".to_string(),
            screenshot_dir: PathBuf::from("/tmp/shots"),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            script_timeout: Duration::from_secs(120),
        }
    }

    #[test]
    fn script_wraps_steps_in_one_session() {
        let steps = vec![
            ScenarioStep::Navigate {
                url: "/".to_string(),
                wait_for_selector: None,
            },
            ScenarioStep::Wait {
                selector: "div.container h2".to_string(),
                timeout_ms: 10_000,
                state: WaitState::Visible,
            },
        ];
        let script = handle().build_script(&steps);

        assert_eq!(script.matches("chromium.launch").count(), 1);
        assert!(script.contains("await browser.close()"));
        assert!(script.contains(
            "await page.waitForSelector('div.container h2', { state: 'visible', timeout: 10000 })"
        ));
    }

    #[test]
    fn upload_step_intercepts_the_file_chooser() {
        let steps = vec![ScenarioStep::Upload {
            selector: "label.file-label".to_string(),
            file: PathBuf::from("/data/sample_data.json"),
        }];
        let script = handle().build_script(&steps);

        assert!(script.contains("page.waitForEvent('filechooser')"));
        assert!(script.contains("page.click('label.file-label')"));
        assert!(script.contains(".setFiles('/data/sample_data.json')"));
    }

    #[test]
    fn screenshot_step_lands_in_the_screenshot_dir() {
        let steps = vec![ScenarioStep::Screenshot {
            name: "dashboard".to_string(),
            selector: None,
            full_page: true,
        }];
        let script = handle().build_script(&steps);

        assert!(script.contains("path: '/tmp/shots/dashboard.png'"));
        assert!(script.contains("fullPage: true"));
    }

    #[test]
    fn selectors_are_escaped() {
        let steps = vec![ScenarioStep::Click {
            selector: "a[title='it\\'s']".to_string(),
            timeout_ms: None,
        }];
        let script = handle().build_script(&steps);

        assert!(!script.contains("'it's'"));
    }

    #[test]
    fn missing_upload_file_is_reported() {
        let steps = vec![ScenarioStep::Upload {
            selector: "label.file-label".to_string(),
            file: PathBuf::from("/definitely/not/here.json"),
        }];
        let err = resolve_upload_paths(&steps).unwrap_err();
        assert!(matches!(err, E2eError::UploadFileMissing(_)));
    }

    #[test]
    fn collect_results_maps_events_to_steps() {
        let steps = vec![
            ScenarioStep::Navigate {
                url: "/".to_string(),
                wait_for_selector: None,
            },
            ScenarioStep::Screenshot {
                name: "dashboard".to_string(),
                selector: None,
                full_page: false,
            },
        ];
        let output = Output {
            status: exit_ok(),
            stdout: b"{\"step\":0,\"ok\":true,\"ms\":42}\n{\"step\":1,\"ok\":true,\"ms\":7}\n"
                .to_vec(),
            stderr: Vec::new(),
        };

        let results = handle().collect_results(&steps, &output).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].step_name, "navigate:/");
        assert_eq!(
            results[1].screenshot_path.as_deref(),
            Some(Path::new("/tmp/shots/dashboard.png"))
        );
    }

    #[test]
    fn collect_results_surfaces_step_failure() {
        let steps = vec![ScenarioStep::Wait {
            selector: "div.container h2".to_string(),
            timeout_ms: 10_000,
            state: WaitState::Visible,
        }];
        let output = Output {
            status: exit_ok(),
            stdout: b"{\"step\":0,\"ok\":false,\"error\":\"Timeout 10000ms exceeded\"}\n".to_vec(),
            stderr: Vec::new(),
        };

        let results = handle().collect_results(&steps, &output).unwrap();
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("Timeout"));
    }

    #[test]
    fn no_events_is_a_harness_error() {
        let output = Output {
            status: exit_ok(),
            stdout: Vec::new(),
            stderr: b"Cannot find module 'playwright'".to_vec(),
        };
        let err = handle().collect_results(&[], &output).unwrap_err();
        assert!(matches!(err, E2eError::Playwright(_)));
    }

    #[cfg(unix)]
    fn exit_ok() -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(0)
    }
}
