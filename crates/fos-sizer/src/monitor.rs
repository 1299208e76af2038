//! Periodic memory report.
//!
//! Collecting and sorting a full report is expensive, so the snapshot is
//! only rebuilt every `refresh_interval_ms`; in between, it is shown again
//! and aged by one frame per update.

use crate::builder::StatsBuilder;
use crate::config::MemStatsConfig;
use crate::renderer::{LogSink, ScrollWindow, StatsRenderer, TextDrawer, TextModeConsole};
use crate::sizer::Sizer;
use crate::stats::{SizeUnit, Stats, TimerKind};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Owns the sizer and the latest snapshot for the periodic report.
#[derive(Debug)]
pub struct MemStatsMonitor {
    config: MemStatsConfig,
    sizer: Sizer,
    stats: Option<Stats>,
    last_refresh: Option<Instant>,
    scroll: ScrollWindow,
    refreshed: bool,
}

impl MemStatsMonitor {
    pub fn new(config: MemStatsConfig) -> Self {
        info!(
            refresh_ms = config.refresh_interval_ms,
            threshold = config.min_subcomponent_bytes,
            max_depth = config.max_depth,
            "Creating memory statistics monitor"
        );
        Self {
            sizer: Sizer::new(config.sizer.clone()),
            scroll: ScrollWindow::new(config.page_rows),
            config,
            stats: None,
            last_refresh: None,
            refreshed: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MemStatsConfig::default())
    }

    pub fn config(&self) -> &MemStatsConfig {
        &self.config
    }

    /// Apply new settings. Takes effect on the next update; the current
    /// snapshot is kept.
    pub fn set_config(&mut self, config: MemStatsConfig) {
        if config.sizer != self.config.sizer {
            self.sizer = Sizer::new(config.sizer.clone());
        }
        if config.page_rows != self.scroll.page_rows() {
            self.scroll = ScrollWindow::new(config.page_rows);
        }
        if !config.is_enabled() {
            self.last_refresh = None;
        }
        self.config = config;
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn scroll(&self) -> ScrollWindow {
        self.scroll
    }

    /// Advance one frame. `walk` reports the object graphs into the sizer
    /// and only runs when a rebuild is due.
    ///
    /// Returns `true` if the snapshot was rebuilt.
    pub fn update<F>(&mut self, now: Instant, walk: F) -> bool
    where
        F: FnOnce(&mut Sizer),
    {
        self.refreshed = false;
        if !self.config.is_enabled() {
            return false;
        }

        let interval = Duration::from_millis(self.config.refresh_interval_ms);
        let due = match (self.stats.as_ref(), self.last_refresh) {
            (Some(_), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        };
        if !due {
            if let Some(stats) = self.stats.as_mut() {
                stats.increment_age();
            }
            return false;
        }

        self.sizer.clear();
        let started = Instant::now();
        walk(&mut self.sizer);
        let collection = started.elapsed();

        let stats = self.stats.get_or_insert_with(Stats::new);
        StatsBuilder::new(&mut self.sizer, self.config.builder_min_bytes).build_into(stats);
        stats.record_timer(TimerKind::Collection, collection);

        debug!(
            components = stats.len(),
            total = stats.total_bytes(),
            "Memory statistics refreshed"
        );
        self.last_refresh = Some(now);
        self.refreshed = true;
        true
    }

    fn renderer<'a>(&self, stats: &'a Stats) -> StatsRenderer<'a> {
        StatsRenderer::new(stats, self.config.max_depth, self.config.min_subcomponent_bytes)
            .with_scroll(self.scroll)
    }

    /// Number of rows the current snapshot shows.
    pub fn visible_rows(&self) -> usize {
        self.stats
            .as_ref()
            .map_or(0, |stats| self.renderer(stats).visible_rows().len())
    }

    /// Draw the snapshot, marking it if the last update rebuilt it.
    pub fn render(
        &self,
        drawer: &mut dyn TextDrawer,
        console: Option<&mut dyn TextModeConsole>,
    ) -> usize {
        match self.stats.as_ref() {
            Some(stats) if self.config.is_enabled() => {
                self.renderer(stats).render(drawer, console, self.refreshed)
            }
            _ => 0,
        }
    }

    /// Dump the snapshot in the configured unit.
    pub fn dump(&self, sink: &mut dyn LogSink) {
        let Some(stats) = self.stats.as_ref() else {
            sink.log_line("No memory statistics collected");
            return;
        };
        let unit = if self.config.use_kilobytes {
            SizeUnit::Kilobytes
        } else {
            SizeUnit::Megabytes
        };
        self.renderer(stats).dump(sink, unit);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        let total = self.visible_rows();
        self.scroll.scroll_down(rows, total);
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll.scroll_up(rows);
    }

    pub fn page_up(&mut self) {
        self.scroll.page_up();
    }
}
