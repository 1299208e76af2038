//! fOS Memory Sizer
//!
//! Lets subsystems report their memory footprint under a hierarchical
//! component path (`Render/Textures/Diffuse`), de-duplicates objects that
//! are reported more than once, and turns the result into a depth-first,
//! size-sorted snapshot for on-screen display or log dumps.
//!
//! # Data flow
//!
//! ```text
//!  subsystem walkers          Sizer                 StatsBuilder        StatsRenderer
//! ┌────────────────┐  push  ┌──────────────┐ end  ┌─────────────┐     ┌──────────────┐
//! │ memory_usage() │──────▶│ NameTree     │─────▶│ sort + trim │────▶│ screen / log │
//! │                │  add   │ IdentitySet  │      │   → Stats   │     │              │
//! └────────────────┘  pop   └──────────────┘      └─────────────┘     └──────────────┘
//! ```
//!
//! The snapshot is decoupled from the sizer: building it clears the sizer
//! for the next pass while the [`Stats`] value survives across frames.

mod builder;
mod collector;
mod config;
mod error;
mod identity_set;
mod monitor;
mod name_tree;
mod renderer;
mod sizer;
mod stats;
mod usage;

pub use builder::StatsBuilder;
pub use collector::{NullResourceCollector, ResourceCollector, ResourceEntry, ResourceList};
pub use config::{ConfigError, ConfigFormat, MemStatsConfig, SizerConfig};
pub use error::SizerError;
pub use identity_set::{IdentityRecord, Insert, ObjectIdentitySet, SHARD_COUNT};
pub use monitor::MemStatsMonitor;
pub use name_tree::{NameIndex, NameNode, NameTree, ROOT_NAME};
pub use renderer::{
    Color, LogSink, RowCells, ScrollWindow, StatsRenderer, TextDrawer, TextGrid,
    TextModeConsole, TracingLogSink,
};
pub use sizer::{Sizer, SizerScope, identity_of};
pub use stats::{Component, SizeUnit, Stats, TimerKind, format_bytes};
pub use usage::MemoryUsage;
