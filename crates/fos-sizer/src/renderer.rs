//! Presentation of a [`Stats`] snapshot.
//!
//! Two modes share one row filter:
//! - `render`: a paged, colored table drawn through a [`TextDrawer`] and
//!   optionally mirrored to a headless [`TextModeConsole`]
//! - `dump`: a flat listing written line by line to a [`LogSink`]

use crate::config::MAX_SUBCOMPONENT_BYTES;
use crate::stats::{Component, SizeUnit, Stats};
use std::fmt;
use std::ops::Range;
use tracing::info;

/// Display threshold used when the requested one is out of range (32 KB)
pub const DEFAULT_MIN_SUBCOMPONENT_BYTES: u64 = 32 * 1024;

/// Default display depth
pub const DEFAULT_MAX_DEPTH: u32 = 2;

/// Timers at or below this many milliseconds are not shown
const OVERHEAD_VISIBLE_MS: f64 = 20.0;

/// Longest run of indentation dots
const MAX_INDENT: usize = 30;

const MIN_NAME_WIDTH: usize = 25;
const SIZE_WIDTH: usize = 10;
const COUNT_WIDTH: usize = 8;

// Screen layout in pixels
const LEFT: f32 = 8.0;
const TOP: f32 = 16.0;
const LINE_HEIGHT: f32 = 12.0;
const TEXT_SCALE: f32 = 1.2;

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const HEADER: Color = Color::rgb(1.0, 1.0, 0.4);
    pub const OVERHEAD: Color = Color::rgb(1.0, 0.5, 0.5);

    /// One color per top-level component group, cycled
    pub const SUBGROUPS: [Color; 6] = [
        Color::from_hex(0x99CCFF),
        Color::from_hex(0x99FF99),
        Color::from_hex(0xFFCC80),
        Color::from_hex(0xE699FF),
        Color::from_hex(0x80FFFF),
        Color::from_hex(0xFF99B3),
    ];

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// `0xRRGGBB`, opaque.
    pub const fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn subgroup(group: usize) -> Self {
        Self::SUBGROUPS[group % Self::SUBGROUPS.len()]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Fixed-width text drawing at screen coordinates.
pub trait TextDrawer {
    fn draw_text(&mut self, x: f32, y: f32, scale: f32, color: Color, text: &str);
}

/// Headless console addressed by text column and row.
pub trait TextModeConsole {
    fn put_text(&mut self, column: usize, row: usize, text: &str);
}

/// Line-oriented log output.
pub trait LogSink {
    fn log_line(&mut self, line: &str);
}

impl LogSink for Vec<String> {
    fn log_line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Writes dump lines to the `memstats` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log_line(&mut self, line: &str) {
        info!(target: "memstats", "{line}");
    }
}

/// In-memory [`TextModeConsole`].
#[derive(Debug, Default, Clone)]
pub struct TextGrid {
    rows: Vec<String>,
}

impl TextGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl TextModeConsole for TextGrid {
    fn put_text(&mut self, column: usize, row: usize, text: &str) {
        if self.rows.len() <= row {
            self.rows.resize(row + 1, String::new());
        }
        let mut chars: Vec<char> = self.rows[row].chars().collect();
        if chars.len() < column {
            chars.resize(column, ' ');
        }
        for (offset, ch) in text.chars().enumerate() {
            match chars.get_mut(column + offset) {
                Some(slot) => *slot = ch,
                None => chars.push(ch),
            }
        }
        self.rows[row] = chars.into_iter().collect();
    }
}

impl fmt::Display for TextGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", row.trim_end())?;
        }
        Ok(())
    }
}

/// Which size columns a row shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCells {
    /// Own bytes plus children: total and partial side by side
    Both { total: u64, partial: u64 },
    /// Nothing attributed directly: total only
    TotalOnly(u64),
    /// No children: the size alone, in the total column
    Leaf(u64),
}

impl RowCells {
    pub fn of(component: &Component) -> Self {
        if component.direct_bytes == 0 {
            Self::TotalOnly(component.total_bytes)
        } else if component.total_bytes > component.direct_bytes {
            Self::Both {
                total: component.total_bytes,
                partial: component.direct_bytes,
            }
        } else {
            Self::Leaf(component.direct_bytes)
        }
    }

    fn format(&self, unit: SizeUnit) -> String {
        match *self {
            Self::Both { total, partial } => format!(
                "{:>w$.3}{:>w$.3}",
                unit.convert(total),
                unit.convert(partial),
                w = SIZE_WIDTH
            ),
            Self::TotalOnly(size) | Self::Leaf(size) => {
                format!("{:>w$.3}{:>w$}", unit.convert(size), "", w = SIZE_WIDTH)
            }
        }
    }
}

/// Window of rows shown on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollWindow {
    start_row: usize,
    page_rows: usize,
}

impl ScrollWindow {
    pub fn new(page_rows: usize) -> Self {
        Self {
            start_row: 0,
            page_rows: page_rows.max(1),
        }
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn page_rows(&self) -> usize {
        self.page_rows
    }

    /// Move down, stopping at the last full page.
    pub fn scroll_down(&mut self, rows: usize, total_rows: usize) {
        let last_page = total_rows.saturating_sub(self.page_rows);
        self.start_row = self.start_row.saturating_add(rows).min(last_page);
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.start_row = self.start_row.saturating_sub(rows);
    }

    /// Back to the first row.
    pub fn page_up(&mut self) {
        self.start_row = 0;
    }

    /// Rows of a `total_rows` long table inside the window.
    pub fn visible(&self, total_rows: usize) -> Range<usize> {
        let start = self.start_row.min(total_rows);
        start..(start + self.page_rows).min(total_rows)
    }
}

impl Default for ScrollWindow {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Draws or dumps a [`Stats`] snapshot.
pub struct StatsRenderer<'a> {
    stats: &'a Stats,
    max_depth: u32,
    min_subcomponent_bytes: u64,
    scroll: ScrollWindow,
    show_object_count: bool,
}

impl<'a> StatsRenderer<'a> {
    /// A threshold outside `[0, 0x10000000]` (e.g. -1) selects the 32 KB default.
    pub fn new(stats: &'a Stats, max_depth: u32, min_subcomponent_bytes: i64) -> Self {
        let min_subcomponent_bytes =
            if (0..=MAX_SUBCOMPONENT_BYTES).contains(&min_subcomponent_bytes) {
                min_subcomponent_bytes as u64
            } else {
                DEFAULT_MIN_SUBCOMPONENT_BYTES
            };
        Self {
            stats,
            max_depth,
            min_subcomponent_bytes,
            scroll: ScrollWindow::default(),
            show_object_count: true,
        }
    }

    /// Depth 2, 32 KB threshold.
    pub fn with_defaults(stats: &'a Stats) -> Self {
        Self::new(stats, DEFAULT_MAX_DEPTH, -1)
    }

    pub fn with_scroll(mut self, scroll: ScrollWindow) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn with_object_count(mut self, show: bool) -> Self {
        self.show_object_count = show;
        self
    }

    pub fn min_subcomponent_bytes(&self) -> u64 {
        self.min_subcomponent_bytes
    }

    pub fn scroll(&self) -> ScrollWindow {
        self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollWindow {
        &mut self.scroll
    }

    /// Whether a component passes the depth and size filters.
    pub fn is_visible(&self, component: &Component) -> bool {
        component.total_bytes > self.min_subcomponent_bytes && component.depth <= self.max_depth
    }

    /// Components that pass the filters, in snapshot order.
    pub fn visible_rows(&self) -> Vec<&'a Component> {
        let stats = self.stats;
        stats
            .components()
            .iter()
            .filter(|c| self.is_visible(c))
            .collect()
    }

    fn name_width(&self) -> usize {
        (self.stats.max_name_length() + 1).max(MIN_NAME_WIDTH)
    }

    fn format_name(&self, component: &Component) -> String {
        let indent = ".".repeat((component.depth as usize).min(MAX_INDENT));
        format!("{:<w$}", format!("{indent}{}", component.name), w = self.name_width())
    }

    /// One table row as drawn on screen.
    pub fn format_row(&self, component: &Component, unit: SizeUnit) -> String {
        let mut row = self.format_name(component);
        row.push_str(&RowCells::of(component).format(unit));
        if self.show_object_count {
            row.push_str(&format!("{:>w$}", component.object_count, w = COUNT_WIDTH));
        }
        row
    }

    fn column_header(&self) -> String {
        let mut header = format!(
            "{:<nw$}{:>w$}{:>w$}",
            "Component",
            "Total",
            "Partial",
            nw = self.name_width(),
            w = SIZE_WIDTH
        );
        if self.show_object_count {
            header.push_str(&format!("{:>w$}", "Count", w = COUNT_WIDTH));
        }
        header
    }

    fn overhead_lines(&self) -> Vec<String> {
        let visible: Vec<String> = self
            .stats
            .timers()
            .filter(|(_, ms)| *ms > OVERHEAD_VISIBLE_MS)
            .map(|(kind, ms)| format!("  {:<16}{:>8.1} ms", kind.name(), ms))
            .collect();
        if visible.is_empty() {
            return visible;
        }
        std::iter::once("Overheads".to_string()).chain(visible).collect()
    }

    /// Draw the current page. `refresh_mark` flags a freshly built snapshot.
    ///
    /// Returns the number of text lines produced.
    pub fn render(
        &self,
        drawer: &mut dyn TextDrawer,
        mut console: Option<&mut dyn TextModeConsole>,
        refresh_mark: bool,
    ) -> usize {
        if self.stats.is_empty() {
            return 0;
        }

        let unit = SizeUnit::Megabytes;
        let mut line = 0;
        let mut emit = |color: Color, text: &str| {
            drawer.draw_text(LEFT, TOP + line as f32 * LINE_HEIGHT, TEXT_SCALE, color, text);
            if let Some(console) = console.as_deref_mut() {
                console.put_text(0, line, text);
            }
            line += 1;
        };

        emit(
            Color::HEADER,
            &format!(
                "Memory usage ({}){}  age {} frames",
                unit.label(),
                if refresh_mark { " *" } else { "" },
                self.stats.age_frames()
            ),
        );
        emit(Color::HEADER, &self.column_header());

        let rows = self.visible_rows();
        let page = self.scroll.visible(rows.len());
        let mut group = 0;
        for (index, component) in rows.iter().enumerate() {
            if component.depth == 1 && index > 0 {
                group += 1;
            }
            if !page.contains(&index) {
                continue;
            }
            let color = if component.depth == 0 {
                Color::WHITE
            } else {
                Color::subgroup(group)
            };
            emit(color, &self.format_row(component, unit));
        }

        for text in self.overhead_lines() {
            emit(Color::OVERHEAD, &text);
        }

        line
    }

    /// Write every visible row to `sink`, sizes in `unit`.
    pub fn dump(&self, sink: &mut dyn LogSink, unit: SizeUnit) {
        let rows = self.visible_rows();
        let width = self.name_width();

        sink.log_line(&format!(
            "Memory statistics ({}): {} of {} components shown, age {} frames",
            unit.label(),
            rows.len(),
            self.stats.len(),
            self.stats.age_frames()
        ));
        sink.log_line(&format!(
            "{:<width$}{:>12}{:>12}{:>9}",
            "Component", "Partial", "Total", "Objects"
        ));

        for component in rows {
            sink.log_line(&format!(
                "{}{:>12.3}{:>12.3}{:>9}",
                self.format_name(component),
                unit.convert(component.direct_bytes),
                unit.convert(component.total_bytes),
                component.object_count
            ));
        }

        for text in self.overhead_lines() {
            sink.log_line(&text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TimerKind;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingDrawer {
        lines: Vec<(f32, Color, String)>,
    }

    impl TextDrawer for RecordingDrawer {
        fn draw_text(&mut self, _x: f32, y: f32, _scale: f32, color: Color, text: &str) {
            self.lines.push((y, color, text.to_string()));
        }
    }

    fn component(name: &str, depth: u32, direct: u64, total: u64) -> Component {
        Component {
            name: name.to_string(),
            depth,
            object_count: 3,
            direct_bytes: direct,
            total_bytes: total,
        }
    }

    fn sample() -> Stats {
        Stats::from_components([
            component("TOTAL", 0, 0, 304_800),
            component("Render", 1, 40_960, 204_800),
            component("Textures", 2, 163_840, 163_840),
            component("Audio", 1, 100_000, 100_000),
        ])
    }

    #[test]
    fn test_threshold_default_and_clamp() {
        let stats = sample();
        assert_eq!(StatsRenderer::new(&stats, 2, -1).min_subcomponent_bytes(), 32 * 1024);
        assert_eq!(
            StatsRenderer::new(&stats, 2, 0x2000_0000).min_subcomponent_bytes(),
            32 * 1024
        );
        assert_eq!(StatsRenderer::new(&stats, 2, 0).min_subcomponent_bytes(), 0);
    }

    #[test]
    fn test_row_filter() {
        let stats = Stats::from_components([
            component("A", 0, 50_000, 50_000),
            component("B", 1, 200, 200),
            component("C", 1, 10, 10),
        ]);
        let renderer = StatsRenderer::new(&stats, 4, 1000);
        let names: Vec<&str> = renderer.visible_rows().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);

        let shallow = StatsRenderer::new(&sample(), 1, 0).visible_rows().len();
        assert_eq!(shallow, 3);
    }

    #[test]
    fn test_row_cells() {
        assert_eq!(
            RowCells::of(&component("Render", 1, 40, 200)),
            RowCells::Both { total: 200, partial: 40 }
        );
        assert_eq!(RowCells::of(&component("TOTAL", 0, 0, 300)), RowCells::TotalOnly(300));
        assert_eq!(RowCells::of(&component("Leaf", 2, 160, 160)), RowCells::Leaf(160));
    }

    #[test]
    fn test_indentation_truncated() {
        let stats = Stats::from_components([component("Deep", 40, 1, 1)]);
        let renderer = StatsRenderer::new(&stats, 64, 0);
        let row = renderer.format_row(&stats.components()[0], SizeUnit::Kilobytes);
        assert!(row.starts_with(&format!("{}Deep", ".".repeat(30))));
        assert!(!row.starts_with(&".".repeat(31)));
    }

    #[test]
    fn test_format_row_columns() {
        let stats = sample();
        let renderer = StatsRenderer::new(&stats, 4, 0).with_object_count(false);
        let leaf = renderer.format_row(&stats.components()[3], SizeUnit::Kilobytes);
        assert!(leaf.starts_with(".Audio"));
        assert!(leaf.trim_end().ends_with("97.656"));

        let both = renderer.format_row(&stats.components()[1], SizeUnit::Kilobytes);
        assert!(both.contains("200.000"));
        assert!(both.trim_end().ends_with("40.000"));
    }

    #[test]
    fn test_render_mirrors_console_and_colors_groups() {
        let stats = sample();
        let renderer = StatsRenderer::new(&stats, 4, 0);
        let mut drawer = RecordingDrawer::default();
        let mut grid = TextGrid::new();

        let lines = renderer.render(&mut drawer, Some(&mut grid), true);
        assert_eq!(lines, 6);
        assert_eq!(drawer.lines.len(), 6);
        assert_eq!(grid.rows().len(), 6);
        assert!(grid.rows()[0].contains('*'));
        assert_eq!(grid.rows()[2], drawer.lines[2].2);

        // Render and Textures share a group, Audio starts the next one
        assert_eq!(drawer.lines[3].1, drawer.lines[4].1);
        assert_ne!(drawer.lines[3].1, drawer.lines[5].1);
        assert!(drawer.lines[1].0 < drawer.lines[2].0);
    }

    #[test]
    fn test_render_empty_stats() {
        let stats = Stats::new();
        let mut drawer = RecordingDrawer::default();
        assert_eq!(StatsRenderer::with_defaults(&stats).render(&mut drawer, None, false), 0);
        assert!(drawer.lines.is_empty());
    }

    #[test]
    fn test_render_pages() {
        let stats = sample();
        let mut scroll = ScrollWindow::new(2);
        scroll.scroll_down(1, 4);
        let renderer = StatsRenderer::new(&stats, 4, 0).with_scroll(scroll);
        let mut drawer = RecordingDrawer::default();
        renderer.render(&mut drawer, None, false);

        // Two header lines plus the Render and Textures rows
        assert_eq!(drawer.lines.len(), 4);
        assert!(drawer.lines[2].2.starts_with(".Render"));
        assert!(drawer.lines[3].2.starts_with("..Textures"));
    }

    #[test]
    fn test_scroll_window() {
        let mut scroll = ScrollWindow::new(10);
        scroll.scroll_down(5, 12);
        assert_eq!(scroll.start_row(), 2);
        assert_eq!(scroll.visible(12), 2..12);

        scroll.scroll_down(100, 5);
        assert_eq!(scroll.start_row(), 0);

        scroll.scroll_down(3, 40);
        scroll.scroll_up(1);
        assert_eq!(scroll.start_row(), 2);
        scroll.page_up();
        assert_eq!(scroll.start_row(), 0);
        assert_eq!(scroll.visible(3), 0..3);
    }

    #[test]
    fn test_overheads_only_above_threshold() {
        let mut stats = sample();
        stats.record_timer(TimerKind::Collection, Duration::from_millis(45));
        stats.record_timer(TimerKind::Cleanup, Duration::from_millis(3));

        let mut sink: Vec<String> = Vec::new();
        StatsRenderer::new(&stats, 4, 0).dump(&mut sink, SizeUnit::Kilobytes);

        let overheads = sink.iter().position(|l| l == "Overheads").unwrap();
        assert!(sink[overheads + 1].contains("Collection"));
        assert!(!sink.iter().any(|l| l.contains("Cleanup")));

        let quiet = sample();
        let mut sink: Vec<String> = Vec::new();
        StatsRenderer::new(&quiet, 4, 0).dump(&mut sink, SizeUnit::Kilobytes);
        assert!(!sink.iter().any(|l| l == "Overheads"));
    }

    #[test]
    fn test_dump_units() {
        let stats = sample();
        let mut kb: Vec<String> = Vec::new();
        StatsRenderer::new(&stats, 4, 0).dump(&mut kb, SizeUnit::Kilobytes);
        assert!(kb[0].contains("(KB)"));
        assert_eq!(kb.len(), 2 + 4);
        assert!(kb[3].contains("40.000") && kb[3].contains("200.000"));

        let mut mb: Vec<String> = Vec::new();
        StatsRenderer::new(&stats, 4, 0).dump(&mut mb, SizeUnit::Megabytes);
        assert!(mb[0].contains("(MB)"));
        assert!(mb[2].contains("0.291"));
    }

    #[test]
    fn test_scroll_down_huge_step() {
        let mut scroll = ScrollWindow::new(4);
        scroll.scroll_down(3, 10);
        scroll.scroll_down(usize::MAX, 10);
        assert_eq!(scroll.start_row(), 6);
    }

    #[test]
    fn test_subgroup_palette() {
        let [r, g, b, a] = Color::from_hex(0x99CCFF).to_array();
        assert!((r - 0.6).abs() < 1e-6 && (g - 0.8).abs() < 1e-6 && (b - 1.0).abs() < 1e-6);
        assert_eq!(a, 1.0);
        assert_eq!(Color::subgroup(0), Color::subgroup(Color::SUBGROUPS.len()));
    }

    #[test]
    fn test_text_grid() {
        let mut grid = TextGrid::new();
        grid.put_text(2, 1, "abc");
        grid.put_text(3, 1, "X");
        assert_eq!(grid.rows(), &["".to_string(), "  aXc".to_string()]);
        assert_eq!(grid.to_string(), "\n  aXc\n");
    }
}
