// src/stylesheet/naming.rs

//! Flat output naming and collision planning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::errors::{DocpipeError, Result};
use crate::types::CollisionPolicy;

/// A source stylesheet and the CSS file it compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Output file name for a source: directory stripped, extension forced to `.css`.
///
/// Returns `None` for paths without a file stem.
pub fn output_file_name(source: &Path) -> Option<String> {
    let stem = source.file_stem()?.to_str()?;
    Some(format!("{stem}.css"))
}

/// Map every source onto the flat `output_dir`.
///
/// `sources` may come in any order. Collisions are resolved before anything
/// is compiled:
/// - [`CollisionPolicy::Error`]: return [`DocpipeError::StyleCollision`]
///   naming every clash.
/// - [`CollisionPolicy::LastWriteWins`]: keep the lexicographically last
///   source per output; shadowed sources are returned separately.
///
/// The plan is sorted by output path.
pub fn plan_outputs(
    sources: &[PathBuf],
    output_dir: &Path,
    policy: CollisionPolicy,
) -> Result<(Vec<PlannedOutput>, Vec<PathBuf>)> {
    let mut by_output: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for source in sources {
        let Some(name) = output_file_name(source) else {
            warn!(path = %source.display(), "stylesheet without a file name; skipping");
            continue;
        };
        by_output
            .entry(output_dir.join(name))
            .or_default()
            .push(source.clone());
    }

    let clashes: Vec<String> = by_output
        .iter()
        .filter(|(_, srcs)| srcs.len() > 1)
        .map(|(out, srcs)| {
            let srcs: Vec<String> = srcs.iter().map(|s| s.display().to_string()).collect();
            format!("{} <- [{}]", out.display(), srcs.join(", "))
        })
        .collect();

    if !clashes.is_empty() && policy == CollisionPolicy::Error {
        return Err(DocpipeError::StyleCollision(clashes.join("; ")));
    }

    let mut plan = Vec::with_capacity(by_output.len());
    let mut shadowed = Vec::new();
    for (output, mut srcs) in by_output {
        srcs.sort();
        let Some(winner) = srcs.pop() else {
            continue;
        };
        for loser in srcs {
            warn!(
                path = %loser.display(),
                output = %output.display(),
                winner = %winner.display(),
                "stylesheet output shadowed by a later source"
            );
            shadowed.push(loser);
        }
        plan.push(PlannedOutput {
            source: winner,
            output,
        });
    }

    Ok((plan, shadowed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn strips_directories_and_forces_css() {
        assert_eq!(
            output_file_name(Path::new("theme/components/nav/styles.less")).as_deref(),
            Some("styles.css")
        );
        assert_eq!(
            output_file_name(Path::new("print.scss")).as_deref(),
            Some("print.css")
        );
    }

    #[test]
    fn distinct_stems_map_one_to_one() {
        let (plan, shadowed) = plan_outputs(
            &paths(&["/t/a/print.less", "/t/b/screen.less"]),
            Path::new("/out"),
            CollisionPolicy::Error,
        )
        .unwrap();
        assert!(shadowed.is_empty());
        assert_eq!(
            plan,
            vec![
                PlannedOutput {
                    source: "/t/a/print.less".into(),
                    output: "/out/print.css".into()
                },
                PlannedOutput {
                    source: "/t/b/screen.less".into(),
                    output: "/out/screen.css".into()
                },
            ]
        );
    }

    #[test]
    fn collision_is_an_error_by_default() {
        let err = plan_outputs(
            &paths(&["/t/a/styles.less", "/t/b/styles.less"]),
            Path::new("/out"),
            CollisionPolicy::default(),
        )
        .unwrap_err();
        match err {
            DocpipeError::StyleCollision(msg) => {
                assert!(msg.contains("/t/a/styles.less"));
                assert!(msg.contains("/t/b/styles.less"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn last_write_wins_keeps_lexicographically_last() {
        let (plan, shadowed) = plan_outputs(
            &paths(&["/t/b/styles.less", "/t/a/styles.less"]),
            Path::new("/out"),
            CollisionPolicy::LastWriteWins,
        )
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].source, PathBuf::from("/t/b/styles.less"));
        assert_eq!(shadowed, paths(&["/t/a/styles.less"]));
    }
}
