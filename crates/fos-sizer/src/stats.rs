//! Memory statistics snapshot.

use serde::Serialize;
use std::time::Duration;

/// One row of the memory report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    /// Component label, without the ancestor path
    pub name: String,
    /// Distance from the root row
    pub depth: u32,
    /// Objects attributed directly to this component
    pub object_count: usize,
    /// Bytes attributed directly to this component
    pub direct_bytes: u64,
    /// Bytes of this component and everything below it
    pub total_bytes: u64,
}

impl Component {
    /// True when all of the bytes belong to the component itself.
    pub fn is_leaf(&self) -> bool {
        self.total_bytes == self.direct_bytes
    }
}

/// Overhead measured while producing a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimerKind {
    /// Walking the object graphs into the sizer
    Collection,
    /// Sorting and trimming the name tree
    Transformation,
    /// Clearing the sizer afterwards
    Cleanup,
}

impl TimerKind {
    pub const ALL: [TimerKind; 3] = [Self::Collection, Self::Transformation, Self::Cleanup];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Collection => "Collection",
            Self::Transformation => "Transformation",
            Self::Cleanup => "Cleanup",
        }
    }

    fn slot(&self) -> usize {
        match self {
            Self::Collection => 0,
            Self::Transformation => 1,
            Self::Cleanup => 2,
        }
    }
}

/// Display unit for sizes in dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Kilobytes,
    Megabytes,
}

impl SizeUnit {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kilobytes => "KB",
            Self::Megabytes => "MB",
        }
    }

    pub fn convert(&self, bytes: u64) -> f64 {
        match self {
            Self::Kilobytes => bytes as f64 / 1024.0,
            Self::Megabytes => bytes as f64 / (1024.0 * 1024.0),
        }
    }
}

/// Sorted, trimmed memory report, independent of the sizer it came from.
///
/// Components are stored depth-first; siblings are ordered largest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    components: Vec<Component>,
    /// Milliseconds per [`TimerKind`]
    timers: [Option<f64>; 3],
    age_frames: u32,
    max_name_length: usize,
}

impl Stats {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot from already sorted, depth-first components.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        let mut stats = Self::new();
        for component in components {
            stats.push_component(component);
        }
        stats
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Frames since the snapshot was built.
    pub fn age_frames(&self) -> u32 {
        self.age_frames
    }

    pub fn increment_age(&mut self) {
        self.age_frames = self.age_frames.saturating_add(1);
    }

    /// Widest indented name: `name.len() + depth` over all components.
    pub fn max_name_length(&self) -> usize {
        self.max_name_length
    }

    /// Record how long one stage took.
    pub fn record_timer(&mut self, kind: TimerKind, elapsed: Duration) {
        self.timers[kind.slot()] = Some(elapsed.as_secs_f64() * 1000.0);
    }

    /// Recorded milliseconds for `kind`.
    pub fn timer(&self, kind: TimerKind) -> Option<f64> {
        self.timers[kind.slot()]
    }

    /// All recorded timers, in stage order.
    pub fn timers(&self) -> impl Iterator<Item = (TimerKind, f64)> + '_ {
        TimerKind::ALL
            .into_iter()
            .filter_map(|kind| self.timer(kind).map(|ms| (kind, ms)))
    }

    /// Total bytes of the root row, or 0 for an empty snapshot.
    pub fn total_bytes(&self) -> u64 {
        self.components.first().map_or(0, |c| c.total_bytes)
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn push_component(&mut self, component: Component) {
        let width = component.name.len() + component.depth as usize;
        self.max_name_length = self.max_name_length.max(width);
        self.components.push(component);
    }

    /// Empty the snapshot and zero its age before a rebuild.
    pub(crate) fn reset(&mut self) {
        self.components.clear();
        self.timers = [None; 3];
        self.age_frames = 0;
        self.max_name_length = 0;
    }
}

/// Format memory size for display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
