//! Stimulus category labels.
//!
//! Category file: one integer label per stimulus, in stimulus order. Blank
//! lines and `#` comments are skipped, as is an optional `label` header.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};

/// Per-stimulus category labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StimulusCategories {
    labels: Vec<i64>,
}

impl StimulusCategories {
    pub fn new(labels: Vec<i64>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Number of stimuli covered.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct labels, ascending.
    pub fn distinct(&self) -> Vec<i64> {
        self.groups().into_keys().collect()
    }

    /// Stimulus indices per label, labels ascending.
    pub fn groups(&self) -> BTreeMap<i64, Vec<usize>> {
        let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in self.labels.iter().enumerate() {
            groups.entry(label).or_default().push(idx);
        }
        groups
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut labels = Vec::new();
        let mut seen_data = false;
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if !seen_data && line.eq_ignore_ascii_case("label") {
                continue;
            }
            seen_data = true;
            let label = line
                .parse::<i64>()
                .with_context(|| format!("line {}: '{}' is not an integer label", lineno + 1, line))?;
            labels.push(label);
        }
        if labels.is_empty() {
            bail!("category file lists no label");
        }
        Ok(Self { labels })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read category file '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid category file '{}'", path.display()))
    }
}
