//! Station-pair selection and display names.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StretchError};

/// Sentinel meaning "average across every available pair".
pub const ALL_PAIRS: &str = "all";

/// File holding the custom pair substitutions inside the project directory.
pub const SUBSTITUTIONS_FILE_NAME: &str = "change_pairs.csv";

// ── PairSelector ──────────────────────────────────────────────────────────────

/// Which pairs one aggregated series averages over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairSelector {
    /// Every pair file found in the result store.
    All,
    /// Explicit raw pair identifiers, e.g. `YA_UV05_YA_UV06`.
    Pairs(Vec<String>),
}

impl PairSelector {
    /// Parse one command-line entry: `all`, a single pair or a
    /// comma-separated group of pairs averaged together.
    pub fn parse(entry: &str) -> Self {
        let pairs: Vec<String> = entry
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if pairs.is_empty() || pairs.iter().any(|p| p.eq_ignore_ascii_case(ALL_PAIRS)) {
            PairSelector::All
        } else {
            PairSelector::Pairs(pairs)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PairSelector::All)
    }
}

impl fmt::Display for PairSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairSelector::All => f.write_str(ALL_PAIRS),
            PairSelector::Pairs(pairs) => f.write_str(&pairs.join(",")),
        }
    }
}

// ── PairSubstitutions ─────────────────────────────────────────────────────────

/// Ordered `(match, replacement)` rules for custom display names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSubstitutions {
    rules: Vec<(String, String)>,
}

impl PairSubstitutions {
    pub fn new(rules: Vec<(String, String)>) -> Self {
        Self { rules }
    }

    /// Return the substitutions path inside `project_dir`.
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(SUBSTITUTIONS_FILE_NAME)
    }

    /// Load a two-column, header-less CSV. Blank or missing cells are empty
    /// strings; row order is kept.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StretchError::FileNotFound(path.to_path_buf()));
        }
        let csv_err = |source: csv::Error| StretchError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let mut rules = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            let pattern = record.get(0).unwrap_or("").to_string();
            let replacement = record.get(1).unwrap_or("").to_string();
            rules.push((pattern, replacement));
        }
        debug!("Loaded {} pair substitutions from {}", rules.len(), path.display());
        Ok(Self { rules })
    }

    /// Apply every rule in order to the accumulated string.
    pub fn apply(&self, pair: &str) -> String {
        self.rules
            .iter()
            .filter(|(pattern, _)| !pattern.is_empty())
            .fold(pair.to_string(), |acc, (pattern, replacement)| {
                acc.replace(pattern.as_str(), replacement)
            })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ── Display names ─────────────────────────────────────────────────────────────

/// Default cosmetic rule: the first and the last underscore become dots.
///
/// `YA_UV05_YA_UV06` → `YA.UV05_YA.UV06`.
pub fn default_display_name(pair: &str) -> String {
    let mut name = pair.replacen('_', ".", 1);
    if let Some(idx) = name.rfind('_') {
        name.replace_range(idx..idx + 1, ".");
    }
    name
}

/// Raw selectors plus the parallel display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicePairs {
    pub selectors: Vec<PairSelector>,
    pub display: Vec<String>,
}

impl NicePairs {
    /// `true` when the first selector averages over every pair.
    pub fn is_all(&self) -> bool {
        self.selectors.first().is_some_and(PairSelector::is_all)
    }
}

/// Turn raw pair entries into selectors and display names.
///
/// No entries means a single [`PairSelector::All`]. With `substitutions` the
/// custom rules build the display names, otherwise
/// [`default_display_name`] does. A comma-separated group is named by
/// naming each member on its own and joining the names with `", "`.
pub fn nicen_pairs<S: AsRef<str>>(
    pairs: &[S],
    substitutions: Option<&PairSubstitutions>,
) -> NicePairs {
    if pairs.is_empty() {
        return NicePairs {
            selectors: vec![PairSelector::All],
            display: vec![ALL_PAIRS.to_string()],
        };
    }

    let mut selectors = Vec::with_capacity(pairs.len());
    let mut display = Vec::with_capacity(pairs.len());
    for entry in pairs {
        let selector = PairSelector::parse(entry.as_ref());
        let name = match &selector {
            PairSelector::All => ALL_PAIRS.to_string(),
            PairSelector::Pairs(members) => members
                .iter()
                .map(|p| match substitutions {
                    Some(subs) => subs.apply(p),
                    None => default_display_name(p),
                })
                .collect::<Vec<_>>()
                .join(", "),
        };
        selectors.push(selector);
        display.push(name);
    }

    NicePairs { selectors, display }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
