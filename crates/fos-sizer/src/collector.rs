//! Resource collectors.
//!
//! A sizer can forward named resource references (textures, meshes, sound
//! banks) to a collector alongside the byte accounting. The sizer always
//! holds one; when nothing is attached it uses [`NullResourceCollector`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::trace;

/// Sink for named resources discovered while walking an object graph.
pub trait ResourceCollector {
    /// Record a resource. Returns `false` if it was already recorded.
    fn add_resource(&mut self, name: &str, size: u64) -> bool;

    /// Resources added until the matching `close_dependencies` depend on `name`.
    fn open_dependencies(&mut self, name: &str);

    fn close_dependencies(&mut self);

    /// Forget everything collected so far. Called by `Sizer::clear`.
    fn reset(&mut self);
}

/// Collector that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResourceCollector;

impl ResourceCollector for NullResourceCollector {
    fn add_resource(&mut self, _name: &str, _size: u64) -> bool {
        true
    }

    fn open_dependencies(&mut self, _name: &str) {}

    fn close_dependencies(&mut self) {}

    fn reset(&mut self) {}
}

/// Shared collector, so the caller can read results after the pass.
impl<T: ResourceCollector> ResourceCollector for Rc<RefCell<T>> {
    fn add_resource(&mut self, name: &str, size: u64) -> bool {
        self.borrow_mut().add_resource(name, size)
    }

    fn open_dependencies(&mut self, name: &str) {
        self.borrow_mut().open_dependencies(name);
    }

    fn close_dependencies(&mut self) {
        self.borrow_mut().close_dependencies();
    }

    fn reset(&mut self) {
        self.borrow_mut().reset();
    }
}

/// A resource recorded by [`ResourceList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub size: u64,
    /// Resource whose dependency block was open when this one was added
    pub parent: Option<String>,
}

/// Collector that keeps a flat, de-duplicated list of resources.
#[derive(Debug, Default)]
pub struct ResourceList {
    entries: Vec<ResourceEntry>,
    seen: HashSet<String>,
    open: Vec<String>,
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Current dependency nesting depth.
    pub fn depth(&self) -> usize {
        self.open.len()
    }
}

impl ResourceCollector for ResourceList {
    fn add_resource(&mut self, name: &str, size: u64) -> bool {
        if !self.seen.insert(name.to_string()) {
            return false;
        }
        trace!(resource = name, size, "Collected resource");
        self.entries.push(ResourceEntry {
            name: name.to_string(),
            size,
            parent: self.open.last().cloned(),
        });
        true
    }

    fn open_dependencies(&mut self, name: &str) {
        self.open.push(name.to_string());
    }

    fn close_dependencies(&mut self) {
        self.open.pop();
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.seen.clear();
        self.open.clear();
    }
}
