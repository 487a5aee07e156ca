// Replay command - drive a reporter from a recorded session script

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cli::ReplayArgs;
use crate::config::Config;
use crate::error::ReportError;
use crate::model::{BundleDescriptor, ExecutionEvent, NodeId, NodeSpec, TestTree};
use crate::report::{self, CancelToken, Reporter, ReporterSpec};

/// A recorded session: the tree, the host snapshot and the callbacks in order
#[derive(Debug, Clone, Deserialize)]
pub struct SessionScript {
    #[serde(default)]
    pub bundles: Vec<BundleDescriptor>,

    pub nodes: Vec<NodeSpec>,

    #[serde(default)]
    pub events: Vec<ExecutionEvent>,

    /// Number of tests announced; defaults to the leaf count of `nodes`
    #[serde(default)]
    pub count: Option<usize>,

    /// Finish with `aborted()` instead of a normal end
    #[serde(default)]
    pub aborted: bool,
}

impl SessionScript {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session script: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse session script: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

pub fn handle_replay(args: &ReplayArgs, config: &Config) -> Result<()> {
    let script = SessionScript::load(&args.script)?;

    let spec: ReporterSpec = config
        .resolve_reporter(args.reporter.as_deref())
        .context("No reporter configured. Use --reporter port:<number> or file:<path>")?
        .parse()?;
    let parallel = args.parallel_jobs(&config.run.parallel);

    let Some(reporter) = spec.open(&config.connect.policy(), &CancelToken::new()) else {
        warn!("No listener reachable for {}, nothing was reported", spec);
        return Ok(());
    };

    info!("Replaying {} event(s) into {}", script.events.len(), spec);
    let errors = replay(reporter.as_ref(), &script, parallel)?;

    if !errors.is_empty() {
        for e in &errors {
            warn!("{}", e);
        }
        anyhow::bail!("{} reporting error(s) while replaying", errors.len());
    }

    Ok(())
}

/// Run `script` through `reporter` and return every internal reporting error.
///
/// With `parallel > 1`, the events of each leaf test are dispatched as one
/// unit from a pool of worker threads. Suite brackets stay on the calling
/// thread: everything but suite ends goes out before the leaves, suite ends
/// after them.
pub fn replay(
    reporter: &dyn Reporter,
    script: &SessionScript,
    parallel: usize,
) -> Result<Vec<ReportError>> {
    let tree = TestTree::new(script.nodes.iter().cloned());
    let count = script.count.unwrap_or_else(|| tree.leaf_count());

    reporter
        .begin(&script.bundles, &tree, count)
        .context("Failed to start reporting session")?;

    let mut errors = if parallel > 1 {
        replay_parallel(reporter, &tree, &script.events, parallel)
    } else {
        script
            .events
            .iter()
            .filter_map(|event| report::dispatch(reporter, &tree, event).err())
            .collect()
    };

    if script.aborted {
        errors.extend(reporter.aborted());
    }
    errors.extend(reporter.end());

    Ok(errors)
}

fn replay_parallel(
    reporter: &dyn Reporter,
    tree: &TestTree,
    events: &[ExecutionEvent],
    parallel: usize,
) -> Vec<ReportError> {
    let is_suite = |id: NodeId| tree.get(id).is_some_and(|node| node.is_suite());

    let mut leading = Vec::new();
    let mut trailing = Vec::new();
    let mut groups: Vec<Vec<&ExecutionEvent>> = Vec::new();
    let mut group_of: HashMap<NodeId, usize> = HashMap::new();

    for event in events {
        let id = event.node();
        if is_suite(id) {
            match event {
                ExecutionEvent::End { .. } => trailing.push(event),
                _ => leading.push(event),
            }
            continue;
        }

        let index = *group_of.entry(id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(event);
    }

    debug!(
        "Dispatching {} test(s) on {} worker(s)",
        groups.len(),
        parallel
    );

    let errors = Mutex::new(Vec::new());
    let record = |result: Result<(), ReportError>| {
        if let Err(e) = result {
            errors.lock().unwrap_or_else(|p| p.into_inner()).push(e);
        }
    };

    for event in leading {
        record(report::dispatch(reporter, tree, event));
    }

    let queue = Mutex::new(groups.into_iter());
    std::thread::scope(|scope| {
        for _ in 0..parallel {
            scope.spawn(|| {
                loop {
                    let next = queue.lock().unwrap_or_else(|p| p.into_inner()).next();
                    let Some(group) = next else { break };
                    for event in group {
                        record(report::dispatch(reporter, tree, event));
                    }
                }
            });
        }
    });

    for event in trailing {
        record(report::dispatch(reporter, tree, event));
    }

    errors.into_inner().unwrap_or_else(|p| p.into_inner())
}
