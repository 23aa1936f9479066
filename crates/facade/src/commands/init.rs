//! Scaffold a new site in the current directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing facade site...");

    let src_dir = Path::new("src");

    if src_dir.exists() && !yes {
        tracing::warn!("src/ directory already exists. Use --yes to overwrite.");
        return Ok(());
    }

    for dir in [
        "src/assets/css",
        "src/assets/js",
        "src/assets/img",
        "src/assets/video",
        "src/assets/fonts",
        "src/assets/icons",
        "src/html/pages",
        "src/html/layouts",
        "src/html/partials",
        "src/html/data",
    ] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir))?;
    }

    write_if_absent("facade.toml", DEFAULT_CONFIG, yes)?;
    write_if_absent("src/html/layouts/default.html", DEFAULT_LAYOUT, yes)?;
    write_if_absent("src/html/pages/index.html", DEFAULT_INDEX, yes)?;
    write_if_absent("src/html/partials/nav.html", DEFAULT_NAV, yes)?;
    write_if_absent("src/html/data/site.json", DEFAULT_DATA, yes)?;
    write_if_absent("src/assets/css/app.css", DEFAULT_CSS, yes)?;
    write_if_absent("src/assets/js/app.js", DEFAULT_JS, yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'facade dev' to start the development server.");

    Ok(())
}

fn write_if_absent(path: &str, content: &str, overwrite: bool) -> Result<()> {
    let p = Path::new(path);
    if !p.exists() || overwrite {
        fs::write(p, content).with_context(|| format!("Failed to write {}", path))?;
        tracing::info!("Created {}", path);
    }
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Facade configuration

[site]
# Source tree
source = "src"

# Output tree
output = "dist"

[styles]
# Browserslist queries for CSS lowering
browsers = ["last 2 versions"]

[server]
port = 3000
host = "127.0.0.1"
"#;

const DEFAULT_LAYOUT: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{{ title }}</title>
    <link rel="stylesheet" href="{{ asset('css/main.min.css') }}">
  </head>
  <body>
    {% include "partials/nav.html" %}
    <main>
      {{ body | safe }}
    </main>
    <script src="{{ asset('js/bundle.min.js') }}"></script>
  </body>
</html>
"#;

const DEFAULT_INDEX: &str = r#"---
title: Home
---
<h1>{{ data.site.name }}</h1>
<p>Welcome to your new site. Edit <code>src/html/pages/index.html</code> to get started.</p>
"#;

const DEFAULT_NAV: &str = r#"<nav>
  <a href="/">{{ data.site.name }}</a>
</nav>
"#;

const DEFAULT_DATA: &str = r#"{
  "name": "My Site"
}
"#;

const DEFAULT_CSS: &str = r#"body {
  margin: 0;
  font-family: system-ui, sans-serif;

  & main {
    max-width: 40rem;
    margin: 0 auto;
    padding: 1rem;
  }
}
"#;

const DEFAULT_JS: &str = r#"document.addEventListener('DOMContentLoaded', () => {
  console.log('ready');
});
"#;
