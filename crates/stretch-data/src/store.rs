//! Layout of the on-disk stretching result store.
//!
//! ```text
//! <root>/STR/<filter>/<NNN>_DAYS/<component>/<pair>.csv      per-pair series
//! <root>/STR_Mat/<filter>/<NNN>_DAYS/<component>/<pair>.csv  coefficient matrices
//! ```

use std::fmt;
use std::path::PathBuf;

/// Which of the two result trees to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Per-pair dv/v and correlation series.
    Series,
    /// Per-pair stretching-coefficient matrices.
    Matrix,
}

impl ResultKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Series => "STR",
            Self::Matrix => "STR_Mat",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Root of a processing project's result store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one CSV per pair for a filter, window and component.
    pub fn component_dir(
        &self,
        kind: ResultKind,
        filter_key: &str,
        mov_stack: u32,
        component: &str,
    ) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(filter_key)
            .join(window_dir_name(mov_stack))
            .join(component)
    }

    /// Path of one pair's CSV file.
    pub fn pair_file(
        &self,
        kind: ResultKind,
        filter_key: &str,
        mov_stack: u32,
        component: &str,
        pair: &str,
    ) -> PathBuf {
        self.component_dir(kind, filter_key, mov_stack, component)
            .join(format!("{}.csv", pair))
    }
}

/// `5` → `005_DAYS`.
pub fn window_dir_name(mov_stack: u32) -> String {
    format!("{:03}_DAYS", mov_stack)
}
