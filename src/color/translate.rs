//! RGB → device color translation with memoization
//!
//! Modes and views declare colors as plain RGB; the translator finds the
//! nearest color each LED family can actually display. Results are memoized
//! per translator instance — the set of distinct colors the application ever
//! requests is small, so the cache is unbounded for the session's lifetime.

use std::collections::HashMap;

use tracing::trace;

use super::{ColorTable, DeviceColorCode, Palette, Rgb};

/// Nearest-color translation engine for one device.
///
/// Owns its memo cache; there is deliberately no process-wide shared cache.
pub struct ColorTranslator {
    grid: ColorTable,
    function: ColorTable,
    cache: HashMap<(Palette, Rgb), DeviceColorCode>,
    scans: usize,
}

impl ColorTranslator {
    pub fn new(grid: ColorTable, function: ColorTable) -> Self {
        Self {
            grid,
            function,
            cache: HashMap::new(),
            scans: 0,
        }
    }

    /// Translator over the factory palettes.
    pub fn factory() -> Self {
        Self::new(super::GRID_PALETTE.clone(), super::FUNCTION_PALETTE.clone())
    }

    fn table(&self, palette: Palette) -> &ColorTable {
        match palette {
            Palette::Grid => &self.grid,
            Palette::Function => &self.function,
        }
    }

    /// Device color code of the nearest displayable color to `target`.
    ///
    /// A repeated call with the same target hits the memo cache and does not
    /// rescan the table. Empty tables translate everything to 0 (off).
    pub fn translate(&mut self, palette: Palette, target: Rgb) -> DeviceColorCode {
        if let Some(&code) = self.cache.get(&(palette, target)) {
            return code;
        }

        self.scans += 1;
        let code = self.table(palette).nearest(target).unwrap_or(0);
        trace!(
            "palette {:?}: rgb({},{},{}) -> code {}",
            palette,
            target.r,
            target.g,
            target.b,
            code
        );
        self.cache.insert((palette, target), code);
        code
    }

    /// Number of full table scans performed (cache misses).
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Number of memoized translations.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
