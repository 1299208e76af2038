//! Turns a finished sizer pass into a [`Stats`] snapshot.

use crate::config::MAX_SUBCOMPONENT_BYTES;
use crate::name_tree::{NameIndex, NameTree};
use crate::sizer::Sizer;
use crate::stats::{Component, Stats, TimerKind};
use std::time::Instant;
use tracing::debug;

/// Builds a depth-first, size-sorted [`Stats`] from a [`Sizer`].
///
/// Subtrees whose total is at or below the threshold are left out. The
/// sizer is cleared once the snapshot is built.
pub struct StatsBuilder<'a> {
    sizer: &'a mut Sizer,
    min_subcomponent_bytes: u64,
}

impl<'a> StatsBuilder<'a> {
    /// `min_subcomponent_bytes` outside `[0, 0x10000000]` falls back to 0.
    pub fn new(sizer: &'a mut Sizer, min_subcomponent_bytes: i64) -> Self {
        let min_subcomponent_bytes =
            if (0..=MAX_SUBCOMPONENT_BYTES).contains(&min_subcomponent_bytes) {
                min_subcomponent_bytes as u64
            } else {
                0
            };
        Self {
            sizer,
            min_subcomponent_bytes,
        }
    }

    pub fn min_subcomponent_bytes(&self) -> u64 {
        self.min_subcomponent_bytes
    }

    /// Build a new snapshot.
    pub fn build(self) -> Stats {
        let mut stats = Stats::new();
        self.build_into(&mut stats);
        stats
    }

    /// Rebuild `stats` in place, reusing its allocation.
    pub fn build_into(self, stats: &mut Stats) {
        stats.reset();

        let started = Instant::now();
        if !self.sizer.is_finalized() {
            self.sizer.end();
        }
        add_name_subtree(self.sizer.names(), self.min_subcomponent_bytes, stats, 0, 0);
        stats.record_timer(TimerKind::Transformation, started.elapsed());

        debug!(
            components = stats.len(),
            total = stats.total_bytes(),
            threshold = self.min_subcomponent_bytes,
            "Built memory statistics"
        );

        let started = Instant::now();
        self.sizer.clear();
        stats.record_timer(TimerKind::Cleanup, started.elapsed());
    }
}

/// Append `index` and its qualifying descendants to `stats`.
///
/// Returns the node's total, whether or not it was emitted.
fn add_name_subtree(
    names: &NameTree,
    min_bytes: u64,
    stats: &mut Stats,
    depth: u32,
    index: NameIndex,
) -> u64 {
    let Some(node) = names.get(index) else {
        return 0;
    };
    if node.total_bytes <= min_bytes {
        return node.total_bytes;
    }

    stats.push_component(Component {
        name: node.name.clone(),
        depth,
        object_count: node.object_count,
        direct_bytes: node.direct_bytes,
        total_bytes: node.total_bytes,
    });

    // Children always come after their parent
    let mut children: Vec<NameIndex> = names
        .nodes()
        .iter()
        .enumerate()
        .skip(index + 1)
        .filter(|(_, child)| child.parent == index && child.total_bytes > min_bytes)
        .map(|(child, _)| child)
        .collect();

    children.sort_by(|&a, &b| {
        let (a, b) = (&names.nodes()[a], &names.nodes()[b]);
        b.total_bytes
            .cmp(&a.total_bytes)
            .then_with(|| a.name.cmp(&b.name))
    });

    for child in children {
        add_name_subtree(names, min_bytes, stats, depth + 1, child);
    }

    node.total_bytes
}
