//! The sizer: scope stack, name tree and identity set behind one API.
//!
//! A walker brackets its object graph with `push`/`pop` (or the
//! [`SizerScope`] guard) and reports every heap block with `add_object`.
//! After `end`, every node carries the bytes of its whole subtree.

use crate::collector::{NullResourceCollector, ResourceCollector};
use crate::config::SizerConfig;
use crate::error::SizerError;
use crate::identity_set::{Insert, ObjectIdentitySet};
use crate::name_tree::{NameIndex, NameNode, NameTree};
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::{debug, trace, warn};

/// Identity of a value: its address.
pub fn identity_of<T: ?Sized>(value: &T) -> usize {
    value as *const T as *const () as usize
}

/// Hierarchical object-size profiler.
///
/// One instance serves one walk at a time; it is not meant to be shared
/// between threads. Reuse it across passes with [`Sizer::clear`].
pub struct Sizer {
    config: SizerConfig,
    names: NameTree,
    objects: ObjectIdentitySet,
    /// Active scopes; the root (0) is always at the bottom
    stack: Vec<NameIndex>,
    /// Pushes absorbed past the depth limit, popped before the real stack
    overflow: usize,
    /// Identity and recorded size of the most recent object
    last_added: Option<(usize, u64)>,
    total_size: u64,
    finalized: bool,
    collector: Box<dyn ResourceCollector>,
}

impl Sizer {
    /// Create a sizer with the given configuration.
    pub fn new(config: SizerConfig) -> Self {
        Self {
            config,
            names: NameTree::new(),
            objects: ObjectIdentitySet::new(),
            stack: vec![0],
            overflow: 0,
            last_added: None,
            total_size: 0,
            finalized: false,
            collector: Box::new(NullResourceCollector),
        }
    }

    /// Create a sizer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SizerConfig::default())
    }

    pub fn config(&self) -> &SizerConfig {
        &self.config
    }

    /// Report one object of `size` bytes at the current scope.
    ///
    /// Returns `true` if the call changed the totals.
    pub fn add_object(&mut self, identity: usize, size: usize) -> bool {
        self.add_objects(identity, size, 1)
    }

    /// Report a block holding `count` objects, `size` bytes in total.
    pub fn add_objects(&mut self, identity: usize, size: usize, count: usize) -> bool {
        if identity == 0 || size == 0 {
            trace!(identity, size, "Ignoring null or empty object");
            return false;
        }
        let size = size as u64;
        if self.last_added == Some((identity, size)) {
            return false;
        }

        let scope = self.current_scope();
        let added = match self.objects.insert(identity, size, scope) {
            Insert::Inserted => {
                if let Some(node) = self.names.get_mut(scope) {
                    node.object_count += count;
                    node.direct_bytes += size;
                }
                true
            }
            Insert::Duplicate => false,
            Insert::Resized { owner, added } => {
                warn!(
                    identity,
                    added,
                    component = %self.names.path(owner),
                    "Object reported again with a different size"
                );
                if let Some(node) = self.names.get_mut(owner) {
                    node.direct_bytes += added;
                }
                true
            }
        };

        self.last_added = self.objects.get(identity).map(|record| (identity, record.size));
        if added {
            self.total_size += size;
            self.finalized = false;
        }
        added
    }

    /// Report `value`, using its address as identity.
    pub fn add_object_ref<T: ?Sized>(&mut self, value: &T, size: usize) -> bool {
        self.add_object(identity_of(value), size)
    }

    /// Enter the child scope `name` of the current scope.
    ///
    /// Exceeding the depth limit is a bug in the walker: debug builds
    /// assert, release builds absorb the push and its matching pop.
    pub fn push(&mut self, name: &str) {
        if let Err(err) = self.try_push(name) {
            warn!(%err, "Ignoring scope push");
            debug_assert!(false, "{err}");
            self.overflow += 1;
        }
    }

    /// Same as [`Sizer::push`]; used by naming helpers.
    pub fn push_subcomponent(&mut self, name: &str) {
        self.push(name);
    }

    /// Leave the current scope.
    ///
    /// Popping the root is a bug in the walker: debug builds assert,
    /// release builds ignore the call.
    pub fn pop(&mut self) {
        if let Err(err) = self.try_pop() {
            warn!(%err, "Ignoring scope pop");
            debug_assert!(false, "{err}");
        }
    }

    /// Fallible [`Sizer::push`]; leaves the sizer untouched on error.
    pub fn try_push(&mut self, name: &str) -> Result<NameIndex, SizerError> {
        if self.overflow > 0 || self.stack.len() >= self.config.max_scope_depth {
            return Err(SizerError::ScopeOverflow {
                name: name.to_string(),
                depth: self.stack.len() + self.overflow,
                limit: self.config.max_scope_depth,
            });
        }
        let parent = self.current_scope();
        let index = self
            .names
            .find_or_insert(parent, name, self.config.case_sensitive_names);
        self.stack.push(index);
        Ok(index)
    }

    /// Fallible [`Sizer::pop`]; returns the scope that was left.
    pub fn try_pop(&mut self) -> Result<Option<NameIndex>, SizerError> {
        if self.overflow > 0 {
            self.overflow -= 1;
            return Ok(None);
        }
        if self.stack.len() <= 1 {
            return Err(SizerError::ScopeUnderflow);
        }
        Ok(self.stack.pop())
    }

    /// Push `name` for as long as the returned guard lives.
    pub fn scope(&mut self, name: &str) -> SizerScope<'_> {
        self.push(name);
        SizerScope { sizer: self }
    }

    /// Innermost active scope; the root if the stack is somehow empty.
    pub fn current_scope(&self) -> NameIndex {
        self.stack.last().copied().unwrap_or(0)
    }

    /// Number of active scopes above the root.
    pub fn scope_depth(&self) -> usize {
        self.stack.len().saturating_sub(1) + self.overflow
    }

    /// Finish the pass: roll every node's bytes up into its ancestors.
    pub fn end(&mut self) {
        if self.stack.len() > 1 || self.overflow > 0 {
            warn!(
                open_scopes = self.scope_depth(),
                "Ending sizer pass with unbalanced scopes"
            );
        }
        self.names.accumulate_totals();
        self.finalized = true;
        debug!(
            total = self.total_size,
            objects = self.object_count(),
            components = self.names.len(),
            "Sizer pass finished"
        );
    }

    /// Whether `end` ran since the last change.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Sum of the sizes of all distinct objects in this pass.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Number of distinct objects in this pass.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of parent hops from `index` to the root.
    pub fn depth_level(&self, index: NameIndex) -> usize {
        self.names.depth_level(index)
    }

    pub fn names(&self) -> &NameTree {
        &self.names
    }

    pub fn node(&self, index: NameIndex) -> Option<&NameNode> {
        self.names.get(index)
    }

    /// Look up a node by its slash-separated path below the root.
    pub fn find(&self, path: &str) -> Option<&NameNode> {
        let mut current = 0;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = self.names.get(current)?.children.iter().copied().find(|&child| {
                self.names.get(child).is_some_and(|node| {
                    if self.config.case_sensitive_names {
                        node.name == part
                    } else {
                        node.name.eq_ignore_ascii_case(part)
                    }
                })
            })?;
        }
        self.names.get(current)
    }

    /// Empty the sizer for a new pass. The resource collector stays
    /// attached and is reset.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.names.reset();
        self.stack.clear();
        self.stack.push(0);
        self.overflow = 0;
        self.last_added = None;
        self.total_size = 0;
        self.finalized = false;
        self.collector.reset();
    }

    /// Same as [`Sizer::clear`].
    pub fn reset(&mut self) {
        self.clear();
    }

    /// Attach a collector, or detach with `None`. Returns the previous one.
    pub fn set_resource_collector(
        &mut self,
        collector: Option<Box<dyn ResourceCollector>>,
    ) -> Box<dyn ResourceCollector> {
        let collector = collector.unwrap_or_else(|| Box::new(NullResourceCollector));
        std::mem::replace(&mut self.collector, collector)
    }

    pub fn resource_collector(&mut self) -> &mut dyn ResourceCollector {
        self.collector.as_mut()
    }
}

impl Default for Sizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for Sizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sizer")
            .field("components", &self.names.len())
            .field("objects", &self.objects.len())
            .field("total_size", &self.total_size)
            .field("scope_depth", &self.scope_depth())
            .field("finalized", &self.finalized)
            .finish()
    }
}

/// Scope pushed by [`Sizer::scope`]; pops on drop.
pub struct SizerScope<'a> {
    sizer: &'a mut Sizer,
}

impl Deref for SizerScope<'_> {
    type Target = Sizer;

    fn deref(&self) -> &Sizer {
        self.sizer
    }
}

impl DerefMut for SizerScope<'_> {
    fn deref_mut(&mut self) -> &mut Sizer {
        self.sizer
    }
}

impl Drop for SizerScope<'_> {
    fn drop(&mut self) {
        self.sizer.pop();
    }
}
