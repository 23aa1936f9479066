//! Front matter extraction and parsing.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Parsed front matter from a page source file.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct PageMeta {
    /// Layout this page renders into, resolved under `layouts/`.
    /// Defaults to the configured default layout when absent.
    #[serde(default)]
    pub layout: Option<String>,

    /// Page title
    #[serde(default)]
    pub title: Option<String>,

    /// Any further keys are exposed to the templates as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Errors that can occur when parsing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed front matter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),
}

/// Extract front matter from page content.
///
/// Returns the parsed metadata and the remaining content after the front
/// matter block.
pub fn extract_frontmatter(source: &str) -> Result<(Option<PageMeta>, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml_content = &after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    let meta: PageMeta = serde_yaml::from_str(yaml_content)
        .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    Ok((Some(meta), remaining.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_layout_and_title() {
        let source = r#"---
layout: post
title: Hello
author: jo
---

<h1>Body</h1>
"#;

        let (meta, content) = extract_frontmatter(source).unwrap();
        let meta = meta.unwrap();

        assert_eq!(meta.layout.as_deref(), Some("post"));
        assert_eq!(meta.title.as_deref(), Some("Hello"));
        assert_eq!(
            meta.extra.get("author"),
            Some(&serde_yaml::Value::String("jo".to_string()))
        );
        assert!(content.starts_with("<h1>Body</h1>"));
    }

    #[test]
    fn handles_no_front_matter() {
        let source = "<p>Plain page</p>";

        let (meta, content) = extract_frontmatter(source).unwrap();

        assert!(meta.is_none());
        assert_eq!(content, source);
    }

    #[test]
    fn errors_on_unclosed_block() {
        let source = "---\nlayout: post\n<p>No closing</p>";

        assert!(matches!(
            extract_frontmatter(source),
            Err(FrontmatterError::Unclosed)
        ));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let source = "---\nlayout: [broken\n---\n";

        assert!(matches!(
            extract_frontmatter(source),
            Err(FrontmatterError::InvalidYaml(_))
        ));
    }
}
