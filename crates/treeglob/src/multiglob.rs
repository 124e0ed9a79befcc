//! Globbing many patterns at once.
//!
//! Patterns are grouped by their cleaned root so each root is read from
//! the filesystem once. A group walks with the union of its members'
//! automata, and groups are distributed over a small pool of worker tasks.
//! The first failing worker cancels its peers; an external cancellation
//! does the same from outside.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::WalkOptions;
use crate::fs::{GlobFs, OsFs};
use crate::nfa::{Nfa, StateSet};
use crate::paths;
use crate::pattern::Pattern;
use crate::walker::{display_path, Flow, WalkControl, WalkError, WalkFn, WalkState};

/// Glob several patterns concurrently, one walk per distinct root.
///
/// Grouping is purely textual, so a file reachable under two roots that
/// appear in *different* groups can be surfaced more than once. The
/// callback must be safe for concurrent invocation, or `worker_limit`
/// capped at 1.
///
/// Cancelling `cancel` stops the walks at their next entry; the first
/// worker error (or the cancellation) becomes the returned error.
pub async fn multi_glob(
    cancel: CancellationToken,
    patterns: &[Pattern],
    callback: WalkFn,
    options: WalkOptions,
) -> Result<(), WalkError> {
    let mut groups: BTreeMap<String, Vec<Pattern>> = BTreeMap::new();
    for p in patterns {
        groups.entry(paths::clean(&p.root)).or_default().push(p.clone());
    }
    if groups.is_empty() {
        return Ok(());
    }

    let worker_count = if options.worker_limit == 0 || options.worker_limit > groups.len() {
        groups.len()
    } else {
        options.worker_limit
    };

    let (tx, rx) = mpsc::channel::<(String, Vec<Pattern>)>(1);
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    let cause: Arc<Mutex<Option<WalkError>>> = Arc::new(Mutex::new(None));
    let work_token = cancel.child_token();

    let mut workers = Vec::with_capacity(worker_count);
    for id in 0..worker_count {
        let rx = rx.clone();
        let callback = callback.clone();
        let options = options.clone();
        let cause = cause.clone();
        let work_token = work_token.clone();
        workers.push(tokio::spawn(async move {
            debug!(worker = id, "multi-glob worker started");
            loop {
                let work = {
                    let mut rx = rx.lock().await;
                    tokio::select! {
                        work = rx.recv() => work,
                        _ = work_token.cancelled() => None,
                    }
                };
                let Some((root, group)) = work else { break };
                debug!(worker = id, root = %root, patterns = group.len(), "walking group");
                if let Err(err) = walk_group(&root, &group, &callback, &options, &work_token).await
                {
                    // First cause wins; peers stop at their next boundary.
                    let mut slot = cause.lock().unwrap_or_else(|e| e.into_inner());
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                    drop(slot);
                    work_token.cancel();
                    break;
                }
            }
            debug!(worker = id, "multi-glob worker finished");
        }));
    }

    for work in groups {
        tokio::select! {
            _ = work_token.cancelled() => break,
            sent = tx.send(work) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    drop(tx);

    for worker in workers {
        let _ = worker.await;
    }

    let stored = cause.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(err) = stored {
        return Err(err);
    }
    if cancel.is_cancelled() {
        return Err(WalkError::Cancelled);
    }
    Ok(())
}

/// Walk one root group: union the members' automata, stat-and-report the
/// fully literal members, then run an ordinary walk.
async fn walk_group(
    root: &str,
    group: &[Pattern],
    callback: &WalkFn,
    options: &WalkOptions,
    cancel: &CancellationToken,
) -> Result<(), WalkError> {
    let fs: Arc<dyn GlobFs> = match &options.filesystem {
        Some(fs) => fs.clone(),
        None => Arc::new(OsFs::new(".")),
    };

    let mut nfa = Nfa::new();
    let mut states = StateSet::new();
    for p in group {
        let Some(initial) = p.initial else {
            // Fully literal pattern: the root names the path itself.
            let display = display_path(root, options);
            let control = match fs.stat(root).await {
                Ok(entry) => callback(&display, Some(&entry), None),
                Err(err) => callback(&display, None, Some(&err)),
            };
            match control {
                WalkControl::Continue => {}
                WalkControl::SkipDir | WalkControl::SkipAll => return Ok(()),
                WalkControl::Abort(e) => return Err(WalkError::Callback(e)),
            }
            continue;
        };
        let offset = nfa.absorb(&p.nfa);
        states.insert(initial.offset_by(offset));
    }

    if states.is_empty() {
        return Ok(());
    }

    // A root that is not visible in a caller-supplied filesystem is an
    // input error rather than an empty result.
    if options.filesystem.is_some() && root != "." {
        if let Err(err) = fs.stat(root).await {
            return Err(WalkError::RootInvalid {
                root: root.to_string(),
                source: err,
            });
        }
    }

    let base = if root == "." { String::new() } else { root.to_string() };
    let walk = WalkState {
        nfa: &nfa,
        opts: options,
        callback,
        fs: fs.as_ref(),
        base,
        root: root.to_string(),
        states,
        depth: 0,
        cancel: Some(cancel),
    };
    match walk.run().await {
        Flow::Abort(err) => Err(err),
        _ => Ok(()),
    }
}
