/// Output retention: clearing a variable's artifacts before it is recomputed,
/// and collecting artifacts of variables that left the active registry.
///
/// Output is never updated in place. A driver run clears everything for its
/// variable first, so a crash between clearing and rewriting leaves the
/// variable without artifacts until the next run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{self, Component};
use crate::model::{OutputTree, TrendsError};
use crate::store::{self, naming};

/// What a clear removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub removed_files: Vec<PathBuf>,
    pub removed_data_dirs: Vec<PathBuf>,
}

impl ClearOutcome {
    pub fn is_empty(&self) -> bool {
        self.removed_files.is_empty() && self.removed_data_dirs.is_empty()
    }

    fn merge(&mut self, other: ClearOutcome) {
        self.removed_files.extend(other.removed_files);
        self.removed_data_dirs.extend(other.removed_data_dirs);
    }
}

/// Whether a root-level file belongs to `variable`: its stem must be
/// `<prefix>_<variable>` with an underscore-free prefix (`sitemeta`, `trends`).
///
/// `sitemeta_concss.csv` names `concss`; `sitemeta_concsspm25.csv` does not,
/// and `trends_stale_var.csv` names `stale_var` but not `var`.
fn names_variable(file_name: &str, variable: &str) -> bool {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    match stem.split_once('_') {
        Some((prefix, rest)) => !prefix.is_empty() && rest == variable,
        None => false,
    }
}

/// Removes every file directly under `root` named for `variable`, and the
/// `data_<variable>/` directory.
///
/// Idempotent: a missing root or nothing to remove is not an error.
pub fn clear_output(root: &Path, variable: &str) -> Result<ClearOutcome, TrendsError> {
    let mut outcome = ClearOutcome::default();
    if !root.is_dir() {
        return Ok(outcome);
    }

    for name in store::list_file_names(root)? {
        if names_variable(&name, variable) {
            let path = root.join(&name);
            fs::remove_file(&path).map_err(|e| TrendsError::io(&path, e))?;
            outcome.removed_files.push(path);
        }
    }

    let data_dir = root.join(naming::data_dir_name(variable));
    if data_dir.is_dir() {
        fs::remove_dir_all(&data_dir).map_err(|e| TrendsError::io(&data_dir, e))?;
        outcome.removed_data_dirs.push(data_dir);
    }

    if !outcome.is_empty() {
        logging::info(
            Component::Retention,
            Some(variable),
            &format!(
                "deleted output in {} ({} file(s), {} data dir(s))",
                root.display(),
                outcome.removed_files.len(),
                outcome.removed_data_dirs.len()
            ),
        );
    }
    Ok(outcome)
}

/// Clears artifacts of every variable that has a sitemeta file under `root`
/// but is not in `active`. Returns the cleared variables.
pub fn delete_outdated_output(root: &Path, active: &BTreeSet<String>) -> Result<Vec<String>, TrendsError> {
    let mut cleared = Vec::new();
    for variable in stale_variables(root, active)? {
        clear_output(root, &variable)?;
        cleared.push(variable);
    }
    Ok(cleared)
}

/// `clear_output` in both trees of a data repository.
pub fn clear_variable(repo: &Path, variable: &str) -> Result<ClearOutcome, TrendsError> {
    let mut outcome = ClearOutcome::default();
    for tree in OutputTree::ALL {
        outcome.merge(clear_output(&tree.root(repo), variable)?);
    }
    Ok(outcome)
}

/// Repository-wide version of [`delete_outdated_output`].
///
/// Sitemeta only exists in `obs_output/`, so stale variables are found there
/// and cleared from both trees.
pub fn delete_outdated_repo(repo: &Path, active: &BTreeSet<String>) -> Result<Vec<String>, TrendsError> {
    let stale = stale_variables(&OutputTree::Obs.root(repo), active)?;
    for variable in &stale {
        clear_variable(repo, variable)?;
    }
    Ok(stale)
}

fn stale_variables(root: &Path, active: &BTreeSet<String>) -> Result<Vec<String>, TrendsError> {
    Ok(store::list_file_names(root)?
        .iter()
        .filter_map(|name| naming::variable_from_sitemeta_name(name))
        .filter(|variable| !active.contains(*variable))
        .map(String::from)
        .collect())
}
