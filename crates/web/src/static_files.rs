//! Static file serving
//!
//! The dashboard UI ships embedded in the binary so the server is a single
//! artifact; a directory override exists for UI development (see
//! `STREAMLENS_WEB_STATIC_DIR` in the server module).

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Embedded static asset handler
pub struct StaticFiles;

impl StaticFiles {
    pub fn new() -> Self {
        Self
    }

    /// Serve an embedded asset by its path under `/assets/`.
    pub fn serve(&self, path: &str) -> Response {
        let content_type = guess_content_type(path);

        match path {
            "app.js" => serve_embedded(APP_JS, content_type),
            "style.css" => serve_embedded(STYLE_CSS, content_type),
            _ => (StatusCode::NOT_FOUND, "File not found").into_response(),
        }
    }
}

impl Default for StaticFiles {
    fn default() -> Self {
        Self::new()
    }
}

fn guess_content_type(path: &str) -> &'static str {
    if path.ends_with(".js") {
        "application/javascript"
    } else if path.ends_with(".css") {
        "text/css"
    } else if path.ends_with(".html") {
        "text/html"
    } else if path.ends_with(".png") {
        "image/png"
    } else if path.ends_with(".svg") {
        "image/svg+xml"
    } else {
        "application/octet-stream"
    }
}

fn serve_embedded(content: &'static str, content_type: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response()
}

/// The dashboard index page. The upload control is a `label.file-label`
/// wrapping a hidden file input, and every result section renders an `h2`
/// inside `div.container` - the selectors the e2e scenarios key on.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>StreamLens</title>
  <link rel="stylesheet" href="/assets/style.css">
</head>
<body>
  <div class="container">
    <h1>StreamLens</h1>
    <p class="tagline">Upload your streaming history export to see where the hours went.</p>
    <label class="file-label">
      Choose export files
      <input id="file-input" type="file" multiple accept=".json">
    </label>
    <p id="status" class="status" hidden></p>
    <div id="dashboard"></div>
  </div>
  <script src="/assets/app.js"></script>
</body>
</html>
"#;

const APP_JS: &str = r#"'use strict';

const input = document.getElementById('file-input');
const statusEl = document.getElementById('status');
const dashboard = document.getElementById('dashboard');

input.addEventListener('change', () => {
  if (input.files.length > 0) {
    handleFiles(input.files);
  }
});

async function handleFiles(fileList) {
  setStatus('Parsing files...');
  dashboard.textContent = '';
  try {
    const files = Array.from(fileList);
    const texts = await Promise.all(files.map((f) => f.text()));

    const records = [];
    for (const text of texts) {
      const parsed = JSON.parse(text);
      if (Array.isArray(parsed)) {
        records.push(...parsed);
      } else if (parsed && typeof parsed === 'object') {
        Object.values(parsed)
          .filter(Array.isArray)
          .forEach((a) => records.push(...a));
      }
    }

    if (records.length === 0) {
      setStatus('No records found in files.');
      return;
    }

    const resp = await fetch('/api/analyze', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(records),
    });
    if (!resp.ok) {
      const err = await resp.json().catch(() => ({ error: resp.statusText }));
      setStatus('Analysis failed: ' + err.error);
      return;
    }

    render(await resp.json());
    clearStatus();
  } catch (err) {
    console.error(err);
    setStatus('Error parsing files.');
  }
}

function setStatus(text) {
  statusEl.textContent = text;
  statusEl.hidden = false;
}

function clearStatus() {
  statusEl.hidden = true;
}

function fmtInt(n) {
  return Math.round(n).toLocaleString();
}

const MONTHS = ['Jan', 'Feb', 'Mar', 'Apr', 'May', 'Jun',
                'Jul', 'Aug', 'Sep', 'Oct', 'Nov', 'Dec'];

function fmtMonthKey(ym) {
  const [y, m] = ym.split('-').map(Number);
  return MONTHS[m - 1] + ' ' + y;
}

function fmtFirst(iso) {
  if (!iso) return 'N/A';
  const d = new Date(iso);
  return MONTHS[d.getUTCMonth()] + ' ' + d.getUTCFullYear();
}

function section(title) {
  const div = document.createElement('div');
  div.className = 'section';
  const h2 = document.createElement('h2');
  h2.textContent = title;
  div.appendChild(h2);
  dashboard.appendChild(div);
  return div;
}

function barRows(container, entries, labelOf, valueOf) {
  const max = Math.max(...entries.map(valueOf), 1);
  for (const entry of entries) {
    const row = document.createElement('div');
    row.className = 'bar-row';

    const label = document.createElement('span');
    label.className = 'bar-label';
    label.textContent = labelOf(entry);

    const track = document.createElement('span');
    track.className = 'bar-track';
    const fill = document.createElement('span');
    fill.className = 'bar-fill';
    fill.style.width = (100 * valueOf(entry) / max).toFixed(1) + '%';
    track.appendChild(fill);

    const value = document.createElement('span');
    value.className = 'bar-value';
    value.textContent = fmtInt(valueOf(entry));

    row.append(label, track, value);
    container.appendChild(row);
  }
}

function render(stats) {
  const s = stats.summary;
  const summary = section('Summary');
  const ul = document.createElement('ul');
  for (const [label, value] of [
    ['Total plays', s.total_plays],
    ['Total minutes', s.total_minutes],
    ['Total hours', s.total_hours],
    ['Unique artists', s.unique_artists],
    ['Unique songs', s.unique_tracks],
  ]) {
    const li = document.createElement('li');
    li.textContent = label + ': ' + fmtInt(value);
    ul.appendChild(li);
  }
  summary.appendChild(ul);

  if (stats.monthly.length > 0) {
    const monthly = section('Listening Over Time (Hours per Month)');
    barRows(monthly, stats.monthly,
      (m) => fmtMonthKey(m.month),
      (m) => m.hours);
  }

  if (stats.top_artists.length > 0) {
    const artists = section('Top 50 Artists');
    barRows(artists, stats.top_artists,
      (a) => a.name + ' (First: ' + fmtFirst(a.first_played) + ')',
      (a) => a.minutes);
  }

  if (stats.top_tracks.length > 0) {
    const tracks = section('Top 50 Songs');
    barRows(tracks, stats.top_tracks,
      (t) => t.name + ' (First: ' + fmtFirst(t.first_played) + ')',
      (t) => t.minutes);
  }
}
"#;

const STYLE_CSS: &str = r#"* {
  box-sizing: border-box;
}

body {
  margin: 0;
  padding: 20px;
  font-family: sans-serif;
  color: #222;
  background: #fafafa;
}

.container {
  max-width: 960px;
  margin: 0 auto;
}

h1 {
  margin-top: 0;
}

.tagline {
  color: #555;
}

.file-label {
  display: inline-block;
  padding: 10px 18px;
  background: #1db954;
  color: #fff;
  border-radius: 4px;
  cursor: pointer;
}

.file-label input {
  display: none;
}

.status {
  color: #555;
  font-style: italic;
}

.section {
  margin-top: 28px;
}

.section h2 {
  border-bottom: 1px solid #ddd;
  padding-bottom: 6px;
}

.bar-row {
  display: flex;
  align-items: center;
  gap: 10px;
  margin: 4px 0;
}

.bar-label {
  flex: 0 0 320px;
  overflow: hidden;
  text-overflow: ellipsis;
  white-space: nowrap;
  font-size: 14px;
}

.bar-track {
  flex: 1;
  height: 14px;
  background: #eee;
  border-radius: 3px;
  overflow: hidden;
}

.bar-fill {
  display: block;
  height: 100%;
  background: #1db954;
  transition: width 0.2s ease-out;
}

.bar-value {
  flex: 0 0 70px;
  text-align: right;
  font-size: 14px;
  color: #444;
}

/* Screenshot runs must be pixel-stable */
body.test-mode * {
  transition: none !important;
  animation: none !important;
}
"#;
