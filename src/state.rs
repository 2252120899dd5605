//! Persisted reading state: scroll offset, font size and page padding.
//!
//! The backing store is owned by the host. Values are string-encoded,
//! last-write-wins, and read back at startup and after every load.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

pub(crate) mod keys {
    pub(crate) const SCROLL_TOP: &str = "scrollTop";
    pub(crate) const FONT_SIZE: &str = "fontSize";
    pub(crate) const PADDING: &str = "margin";
}

/// Persisted string key/value storage.
pub trait ReadingStateStore: Send + Sync {
    /// Retrieves the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);
}

/// A [`ReadingStateStore`] kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStateStore(RwLock<HashMap<String, String>>);

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadingStateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }
}

/// Typed view over the persisted reading state.
///
/// Missing or malformed values read as absent rather than failing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadingState {
    /// Scroll offset of the reading surface, in pixels.
    pub scroll_top: u32,
    /// Font size of the reading surface, in pixels.
    pub font_size_px: Option<u32>,
    /// Padding around the reading surface, in pixels.
    pub padding_px: Option<u32>,
}

impl ReadingState {
    /// Reads the current state from `store`.
    pub fn load(store: &dyn ReadingStateStore) -> Self {
        Self {
            scroll_top: store
                .get(keys::SCROLL_TOP)
                .and_then(|value| parse_scroll_top(&value))
                .unwrap_or_default(),
            font_size_px: store
                .get(keys::FONT_SIZE)
                .and_then(|value| parse_px(&value)),
            padding_px: store.get(keys::PADDING).and_then(|value| parse_px(&value)),
        }
    }

    /// Writes every present value to `store`.
    pub fn save(&self, store: &dyn ReadingStateStore) {
        store.set(keys::SCROLL_TOP, self.scroll_top.to_string());
        if let Some(font_size) = self.font_size_px {
            store.set(keys::FONT_SIZE, format_px(font_size));
        }
        if let Some(padding) = self.padding_px {
            store.set(keys::PADDING, format_px(padding));
        }
    }
}

pub(crate) fn save_scroll_top(store: &dyn ReadingStateStore, scroll_top: u32) {
    store.set(keys::SCROLL_TOP, scroll_top.to_string());
}

/// Parses a scroll offset; fractional and negative offsets are clamped.
fn parse_scroll_top(value: &str) -> Option<u32> {
    let offset = value.trim().parse::<f64>().ok()?;
    offset
        .is_finite()
        .then(|| offset.clamp(0.0, f64::from(u32::MAX)) as u32)
}

/// Parses a CSS pixel length such as `16px`; a bare number is accepted as pixels.
pub(crate) fn parse_px(value: &str) -> Option<u32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim_end();
    let pixels = number.parse::<f64>().ok()?;

    (pixels.is_finite() && pixels >= 0.0).then(|| pixels.round() as u32)
}

pub(crate) fn format_px(pixels: u32) -> String {
    format!("{pixels}px")
}
