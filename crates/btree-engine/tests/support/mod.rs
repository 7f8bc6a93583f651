#![allow(dead_code)]

use std::any::Any;
use std::collections::BTreeMap;

use btree_engine::{Behavior, Result, Status, TaskId, TaskTree, TickContext};

/// Installs a test-friendly subscriber once; `RUST_LOG=btree_engine=trace`
/// shows the engine's lifecycle logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Blackboard recording what the scripted leaves did.
#[derive(Debug, Default)]
pub struct Board {
    pub journal: Vec<String>,
    pub starts: BTreeMap<&'static str, u32>,
    pub events: Vec<(&'static str, u32)>,
}

impl Board {
    pub fn starts(&self, label: &str) -> u32 {
        self.starts.get(label).copied().unwrap_or(0)
    }

    pub fn exits(&self, label: &str) -> usize {
        let prefix = format!("{label}:exit:");
        self.journal
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .count()
    }
}

/// Leaf that replays a fixed list of statuses, one per execute.
///
/// The last entry repeats once the script runs out.
pub struct Scripted {
    label: &'static str,
    script: Vec<Status>,
}

impl Scripted {
    pub fn new(label: &'static str, script: impl IntoIterator<Item = Status>) -> Self {
        Self {
            label,
            script: script.into_iter().collect(),
        }
    }
}

impl Behavior<Board> for Scripted {
    fn name(&self) -> &'static str {
        self.label
    }

    fn max_children(&self) -> Option<usize> {
        Some(0)
    }

    fn enter(&mut self, cx: &mut TickContext<'_, Board>) -> Result<Status> {
        let board = cx.blackboard_mut();
        *board.starts.entry(self.label).or_default() += 1;
        board.journal.push(format!("{}:enter", self.label));
        Ok(Status::Running)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, Board>) -> Result<Status> {
        let frame = cx.run_frames() as usize;
        Ok(self
            .script
            .get(frame)
            .or(self.script.last())
            .copied()
            .unwrap_or(Status::Success))
    }

    fn exit(&mut self, cx: &mut TickContext<'_, Board>) {
        let entry = format!("{}:exit:{}", self.label, cx.status());
        cx.blackboard_mut().journal.push(entry);
    }

    fn on_event(&mut self, cx: &mut TickContext<'_, Board>, event: &dyn Any) -> Result<()> {
        if let Some(&value) = event.downcast_ref::<u32>() {
            cx.blackboard_mut().events.push((self.label, value));
        }
        Ok(())
    }
}

pub fn scripted(
    tree: &mut TaskTree<Board>,
    label: &'static str,
    script: impl IntoIterator<Item = Status>,
) -> TaskId {
    tree.insert(Scripted::new(label, script))
}
