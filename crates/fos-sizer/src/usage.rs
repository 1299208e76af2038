//! Walking object graphs into a [`Sizer`].
//!
//! Types report their heap blocks by implementing [`MemoryUsage`]. Inline
//! fields are accounted for by whoever owns the value, so only heap
//! allocations are reported; a block reached twice (e.g. through an `Arc`)
//! is counted once.

use crate::sizer::{Sizer, identity_of};
use std::collections::HashMap;
use std::mem::{size_of, size_of_val};
use std::sync::Arc;

/// A value that can report the heap memory it owns.
pub trait MemoryUsage {
    fn memory_usage(&self, sizer: &mut Sizer);
}

impl Sizer {
    /// Report the buffer of a vector (its capacity, not its length).
    pub fn add_vec<T>(&mut self, vec: &Vec<T>) -> bool {
        self.add_objects(
            vec.as_ptr() as usize,
            vec.capacity() * size_of::<T>(),
            vec.len(),
        )
    }

    /// Report the buffer of a string.
    pub fn add_string(&mut self, string: &String) -> bool {
        self.add_object(string.as_ptr() as usize, string.capacity())
    }

    /// Report the allocation behind a box.
    pub fn add_boxed<T: ?Sized>(&mut self, boxed: &Box<T>) -> bool {
        self.add_object(identity_of(&**boxed), size_of_val(&**boxed))
    }

    /// Walk `value` inside a child scope called `name`.
    pub fn add_usage<T: MemoryUsage + ?Sized>(&mut self, name: &str, value: &T) {
        let mut scope = self.scope(name);
        value.memory_usage(&mut scope);
    }
}

macro_rules! impl_inline_usage {
    ($($ty:ty),*) => {
        $(
            impl MemoryUsage for $ty {
                fn memory_usage(&self, _sizer: &mut Sizer) {}
            }
        )*
    };
}

impl_inline_usage!(bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

impl MemoryUsage for String {
    fn memory_usage(&self, sizer: &mut Sizer) {
        sizer.add_string(self);
    }
}

impl<T: MemoryUsage> MemoryUsage for Vec<T> {
    fn memory_usage(&self, sizer: &mut Sizer) {
        sizer.add_vec(self);
        for item in self {
            item.memory_usage(sizer);
        }
    }
}

impl<T: MemoryUsage> MemoryUsage for Box<T> {
    fn memory_usage(&self, sizer: &mut Sizer) {
        sizer.add_boxed(self);
        (**self).memory_usage(sizer);
    }
}

impl<T: MemoryUsage> MemoryUsage for Option<T> {
    fn memory_usage(&self, sizer: &mut Sizer) {
        if let Some(value) = self {
            value.memory_usage(sizer);
        }
    }
}

impl<T: MemoryUsage> MemoryUsage for Arc<T> {
    /// The shared block is reported by whichever owner reaches it first;
    /// its contents are only walked then.
    fn memory_usage(&self, sizer: &mut Sizer) {
        let block = size_of::<T>() + 2 * size_of::<usize>();
        if sizer.add_object(Arc::as_ptr(self) as usize, block) {
            (**self).memory_usage(sizer);
        }
    }
}

impl<K: MemoryUsage, V: MemoryUsage, S> MemoryUsage for HashMap<K, V, S> {
    /// Approximates the table as `capacity` slots of `(K, V)`.
    fn memory_usage(&self, sizer: &mut Sizer) {
        sizer.add_objects(
            identity_of(self),
            self.capacity() * size_of::<(K, V)>(),
            self.len(),
        );
        for (key, value) in self {
            key.memory_usage(sizer);
            value.memory_usage(sizer);
        }
    }
}
