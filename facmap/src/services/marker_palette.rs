//! Marker colors
//!
//! A group value (technician name) maps to one of the Leaflet.awesome-markers
//! colors through MD5, so the same person keeps the same color across runs
//! and machines.

use md5::{Digest, Md5};

/// awesome-markers color names with the CSS color of their sprite
pub const PALETTE: [(&str, &str); 19] = [
    ("red", "#d63e2a"),
    ("blue", "#38aadd"),
    ("green", "#72b026"),
    ("orange", "#f69730"),
    ("purple", "#d252b9"),
    ("darkred", "#a23336"),
    ("lightred", "#ff8e7f"),
    ("beige", "#ffcb92"),
    ("darkblue", "#0067a3"),
    ("darkgreen", "#728224"),
    ("cadetblue", "#436978"),
    ("darkpurple", "#5b396b"),
    ("white", "#fbfbfb"),
    ("pink", "#ff91ea"),
    ("lightblue", "#8adaff"),
    ("lightgreen", "#bbf970"),
    ("gray", "#575757"),
    ("black", "#303030"),
    ("lightgray", "#a3a3a3"),
];

/// Color of markers without a group value
pub const DEFAULT_COLOR: &str = "blue";

/// Marker color for a group value
pub fn color_for(group: &str) -> &'static str {
    let group = group.trim();
    if group.is_empty() {
        return DEFAULT_COLOR;
    }
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&Md5::digest(group.as_bytes()));
    let index = u128::from_be_bytes(digest) % PALETTE.len() as u128;
    PALETTE[index as usize].0
}

/// CSS color for a palette name (legend swatches)
pub fn css_color(name: &str) -> &'static str {
    PALETTE
        .iter()
        .find(|(color, _)| *color == name)
        .map(|(_, css)| *css)
        .unwrap_or("#38aadd")
}
