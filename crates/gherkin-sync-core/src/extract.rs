//! Feature file extraction.
//!
//! Turns raw feature-file text into a [`SpecDocument`]: the title, the
//! free-text description, the background steps, and every scenario with its
//! steps and content hash. Grammar parsing is delegated to the `gherkin`
//! crate; the description is read from the raw lines so it survives exactly
//! as written.
//!
//! # Hash inputs
//!
//! - **Scenario**: its steps, one `"<keyword> <text>"` line each, hashed with
//!   the file path.
//! - **Feature**: the description plus a newline (when present), then the
//!   background step lines, then every scenario's step lines in source
//!   order, all hashed with the file path.

use gherkin::{Feature, GherkinEnv};

use crate::hash::content_hash;
use crate::models::{steps_text, ScenarioRecord, SpecDocument, Step};

/// Line prefixes that end the feature description.
const BLOCK_KEYWORDS: &[&str] = &["Background:", "Scenario", "Example", "Rule:"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Extract a normalized document from `content` found at `path`.
///
/// Returns `Ok(None)` when the text has no `Feature:` heading (empty or
/// non-Gherkin files), and [`ExtractError::Parse`] when the grammar parser
/// rejects it.
pub fn extract(content: &str, path: &str) -> Result<Option<SpecDocument>, ExtractError> {
    if !has_feature_heading(content) {
        return Ok(None);
    }

    let feature = parse_feature(content, path)?;

    // The grammar admits at most one background per feature.
    let background = feature.background.as_ref().map(|bg| convert_steps(&bg.steps));

    // Top-level scenarios precede rules in Gherkin, so this is source order.
    let scenarios: Vec<ScenarioRecord> = feature
        .scenarios
        .iter()
        .chain(feature.rules.iter().flat_map(|rule| rule.scenarios.iter()))
        .map(|scenario| {
            let steps = convert_steps(&scenario.steps);
            let hash = content_hash(&steps_text(&steps), path);
            ScenarioRecord {
                title: scenario.name.trim().to_string(),
                steps,
                hash,
            }
        })
        .collect();

    let description = extract_description(content);
    let feature_hash = feature_hash(description.as_deref(), background.as_deref(), &scenarios, path);

    Ok(Some(SpecDocument {
        title: feature.name.trim().to_string(),
        description,
        background,
        scenarios,
        feature_hash,
    }))
}

fn has_feature_heading(content: &str) -> bool {
    content
        .lines()
        .any(|line| line.trim_start().starts_with("Feature:"))
}

fn parse_feature(content: &str, path: &str) -> Result<Feature, ExtractError> {
    // The grammar expects every line, including the last, to be terminated.
    let parsed = if content.ends_with('\n') {
        Feature::parse(content, GherkinEnv::default())
    } else {
        Feature::parse(format!("{}\n", content), GherkinEnv::default())
    };
    parsed.map_err(|e| ExtractError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn convert_steps(steps: &[gherkin::Step]) -> Vec<Step> {
    steps
        .iter()
        .map(|step| Step::new(step.keyword.trim(), step.value.trim()))
        .collect()
}

/// Collect the free text between the `Feature:` line and the first
/// block, skipping comments, tags, and blank lines.
fn extract_description(content: &str) -> Option<String> {
    let mut lines = content.lines().map(str::trim);
    lines.by_ref().find(|line| line.starts_with("Feature:"))?;

    let text: Vec<&str> = lines
        .take_while(|line| !BLOCK_KEYWORDS.iter().any(|kw| line.starts_with(kw)))
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('@'))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text.join("\n"))
    }
}

fn feature_hash(
    description: Option<&str>,
    background: Option<&[Step]>,
    scenarios: &[ScenarioRecord],
    path: &str,
) -> String {
    let mut content = String::new();
    if let Some(description) = description {
        content.push_str(description);
        content.push('\n');
    }
    if let Some(background) = background {
        content.push_str(&steps_text(background));
    }
    for scenario in scenarios {
        content.push_str(&steps_text(&scenario.steps));
    }
    content_hash(&content, path)
}
