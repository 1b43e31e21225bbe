//! Device color palettes
//!
//! Each PadGrid LED family can only display a fixed factory palette; the
//! tables here pair every displayable device color code with the RGB color it
//! approximates. Translation from arbitrary RGB lives in [`translate`].

pub mod translate;

pub use translate::ColorTranslator;

use once_cell::sync::Lazy;
use thiserror::Error;

/// Device-independent RGB color requested by application logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// Squared Euclidean distance in RGB space.
    pub fn distance_sq(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Integer color value meaningful to one LED family of the device.
pub type DeviceColorCode = u8;

/// Which of the device's LED families a lookup targets.
///
/// The pad grid has full RGB LEDs; the function-button row uses a smaller
/// palette with different physical LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Palette {
    Grid,
    Function,
}

/// Immutable pair of a device color code and the RGB color it approximates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTableEntry {
    pub code: DeviceColorCode,
    pub rgb: Rgb,
}

/// Palette lookup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    /// A direct lookup named a color code that was never registered.
    /// Signaled loudly: silently clamping these has masked palette
    /// configuration bugs before.
    #[error("color index {index} not registered in {palette:?} palette")]
    Unregistered { palette: Palette, index: DeviceColorCode },
}

/// Ordered list of the colors one LED family can display.
///
/// Built once at startup, never mutated. Table order matters: nearest-color
/// ties are broken by the first entry in table order.
#[derive(Debug, Clone)]
pub struct ColorTable {
    palette: Palette,
    entries: Vec<ColorTableEntry>,
}

impl ColorTable {
    pub fn new(palette: Palette, entries: Vec<ColorTableEntry>) -> Self {
        Self { palette, entries }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct lookup of a registered code's approximate RGB.
    ///
    /// Fails with [`PaletteError::Unregistered`] for codes not in the table;
    /// out-of-range indices are never clamped.
    pub fn lookup(&self, code: DeviceColorCode) -> Result<Rgb, PaletteError> {
        self.entries
            .iter()
            .find(|e| e.code == code)
            .map(|e| e.rgb)
            .ok_or(PaletteError::Unregistered {
                palette: self.palette,
                index: code,
            })
    }

    /// Nearest displayable entry for `target`, first entry winning ties.
    pub fn nearest(&self, target: Rgb) -> Option<DeviceColorCode> {
        let mut best: Option<(u32, DeviceColorCode)> = None;
        for entry in &self.entries {
            let dist = target.distance_sq(entry.rgb);
            match best {
                // Strict `<` keeps the earlier entry on equal distance.
                Some((best_dist, _)) if dist >= best_dist => {}
                _ => best = Some((dist, entry.code)),
            }
        }
        best.map(|(_, code)| code)
    }
}

macro_rules! entries {
    ($(($code:expr, $r:expr, $g:expr, $b:expr)),* $(,)?) => {
        vec![$(ColorTableEntry { code: $code, rgb: Rgb::new($r, $g, $b) }),*]
    };
}

/// Factory palette of the 4x4 RGB pad grid.
///
/// Code 0 is "off". The hardware interpolates brightness itself; the table
/// lists the saturated anchor points the firmware documents.
pub static GRID_PALETTE: Lazy<ColorTable> = Lazy::new(|| {
    ColorTable::new(
        Palette::Grid,
        entries![
            (0, 0, 0, 0),        // off
            (1, 255, 255, 255),  // white
            (2, 127, 127, 127),  // dim white
            (3, 255, 0, 0),      // red
            (4, 127, 0, 0),      // dim red
            (5, 255, 88, 0),     // orange
            (6, 255, 165, 0),    // amber
            (7, 255, 255, 0),    // yellow
            (8, 127, 127, 0),    // dim yellow
            (9, 128, 255, 0),    // lime
            (10, 0, 255, 0),     // green
            (11, 0, 127, 0),     // dim green
            (12, 0, 255, 128),   // spring
            (13, 0, 255, 255),   // cyan
            (14, 0, 127, 255),   // sky
            (15, 0, 0, 255),     // blue
            (16, 0, 0, 127),     // dim blue
            (17, 128, 0, 255),   // purple
            (18, 255, 0, 255),   // magenta
            (19, 255, 0, 128),   // pink
            (20, 255, 128, 128), // salmon
        ],
    )
});

/// Factory palette of the function-button row (bi-color LEDs plus white).
pub static FUNCTION_PALETTE: Lazy<ColorTable> = Lazy::new(|| {
    ColorTable::new(
        Palette::Function,
        entries![
            (0, 0, 0, 0),       // off
            (1, 80, 80, 80),    // dim white
            (2, 255, 255, 255), // white
            (3, 127, 0, 0),     // dim red
            (4, 255, 0, 0),     // red
            (5, 127, 80, 0),    // dim amber
            (6, 255, 165, 0),   // amber
            (7, 0, 127, 0),     // dim green
            (8, 0, 255, 0),     // green
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;

    fn two_entry_table() -> ColorTable {
        ColorTable::new(
            Palette::Grid,
            entries![(1, 0, 0, 0), (2, 255, 255, 255)],
        )
    }

    #[test]
    fn test_nearest_basic() {
        let table = two_entry_table();
        assert_eq!(table.nearest(Rgb::new(10, 10, 10)), Some(1));
        assert_eq!(table.nearest(Rgb::new(250, 250, 250)), Some(2));
    }

    #[test]
    fn test_nearest_tie_prefers_first_entry() {
        let table = ColorTable::new(
            Palette::Grid,
            entries![(7, 100, 0, 0), (8, 100, 0, 0)],
        );
        assert_eq!(table.nearest(Rgb::new(100, 0, 0)), Some(7));
    }

    #[test]
    fn test_nearest_empty_table() {
        let table = ColorTable::new(Palette::Grid, Vec::new());
        assert_eq!(table.nearest(Rgb::BLACK), None);
    }

    #[test]
    fn test_lookup_registered() {
        let table = two_entry_table();
        assert_eq!(table.lookup(2), Ok(Rgb::WHITE));
    }

    #[test]
    fn test_lookup_unregistered_fails_loudly() {
        let table = two_entry_table();
        let err = table.lookup(99).unwrap_err();
        assert_eq!(
            err,
            PaletteError::Unregistered {
                palette: Palette::Grid,
                index: 99
            }
        );
    }

    #[test]
    fn test_factory_palettes_have_off_at_zero() {
        assert_eq!(GRID_PALETTE.lookup(0), Ok(Rgb::BLACK));
        assert_eq!(FUNCTION_PALETTE.lookup(0), Ok(Rgb::BLACK));
    }

    #[test]
    fn test_factory_palette_codes_unique() {
        for table in [&*GRID_PALETTE, &*FUNCTION_PALETTE] {
            for (i, a) in table.entries.iter().enumerate() {
                for b in &table.entries[i + 1..] {
                    assert_ne!(a.code, b.code);
                }
            }
        }
    }
}
