//! Map page builder
//!
//! Collects resolved facilities and renders a self-contained Leaflet page:
//! one awesome-markers pin per facility, colored by the group column, with a
//! popup listing the configured fields and a legend of group colors.
//!
//! # Example
//! ```rust,ignore
//! let mut map = MapBuilder::new(MapSettings::default())?;
//! map.add(&point, &record)?;
//! map.write_html(Path::new("index.html"))?;
//! ```

use super::marker_palette::{color_for, css_color};
use crate::error::{FacmapError, FacmapResult};
use crate::models::{columns, FacilityRecord};
use crate::types::{GeoPoint, PrecisionTier};
use facmap_common::config::MapSection;
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_TITLE: &str = "Карта объектов";
pub const DEFAULT_LEGEND_TITLE: &str = "Механики КТО";
pub const DEFAULT_ZOOM: u8 = 9;
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

const POPUP_TEMPLATE: &str = "{{#each fields}}<b>{{label}}:</b> {{value}}<br>{{/each}}";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="ru">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{title}}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css">
<link rel="stylesheet" href="https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
<style>
html, body, #map { width: 100%; height: 100%; margin: 0; padding: 0; }
.legend { position: fixed; bottom: 50px; left: 50px; z-index: 9999; background: white;
  padding: 12px 18px; border-radius: 12px; border: 1px solid #bbb; font-size: 14px; }
.legend-item { margin-bottom: 4px; }
.legend-dot { font-size: 18px; }
.build { position: fixed; bottom: 2px; right: 180px; z-index: 9999; font-size: 10px; color: #888; }
</style>
</head>
<body>
<div id="map"></div>
{{#if legend}}
<div class="legend">
<b>{{legend_title}}:</b><br>
{{#each legend}}
<div class="legend-item"><span class="legend-dot" style="color:{{css}};">&#9679;</span> {{name}}</div>
{{/each}}
</div>
{{/if}}
<div class="build">facmap {{version}} ({{git_hash}}), {{generated_at}}</div>
<script>
var map = L.map("map").setView([{{center_lat}}, {{center_lon}}], {{zoom}});
L.tileLayer({{{tile_url}}}, { maxZoom: 19, attribution: {{{tile_attribution}}} }).addTo(map);
var markers = {{{markers}}};
markers.forEach(function (m) {
  var icon = L.AwesomeMarkers.icon({ icon: "info-sign", prefix: "glyphicon", markerColor: m.color });
  L.marker([m.lat, m.lon], { icon: icon }).bindPopup(m.popup, { maxWidth: 450 }).addTo(map);
});
</script>
</body>
</html>
"#;

/// Map appearance
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub title: String,
    pub zoom: u8,
    /// Fixed `(lat, lon)` center; mean of all markers when `None`
    pub center: Option<(f64, f64)>,
    pub tile_url: String,
    pub tile_attribution: String,
    pub group_column: String,
    pub legend_title: String,
    pub popup_fields: Vec<String>,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            zoom: DEFAULT_ZOOM,
            center: None,
            tile_url: DEFAULT_TILE_URL.to_string(),
            tile_attribution: DEFAULT_TILE_ATTRIBUTION.to_string(),
            group_column: columns::DEFAULT_GROUP_COLUMN.to_string(),
            legend_title: DEFAULT_LEGEND_TITLE.to_string(),
            popup_fields: columns::DEFAULT_POPUP_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl MapSettings {
    /// Settings from the `[map]` section, defaults for anything unset
    pub fn from_section(section: &MapSection) -> Self {
        let defaults = Self::default();
        Self {
            title: section.title.clone().unwrap_or(defaults.title),
            zoom: section.zoom.unwrap_or(defaults.zoom),
            center: section.center.map(|[lat, lon]| (lat, lon)),
            tile_url: section.tile_url.clone().unwrap_or(defaults.tile_url),
            tile_attribution: section
                .tile_attribution
                .clone()
                .unwrap_or(defaults.tile_attribution),
            group_column: section.group_column.clone().unwrap_or(defaults.group_column),
            legend_title: section.legend_title.clone().unwrap_or(defaults.legend_title),
            popup_fields: section.popup_fields.clone().unwrap_or(defaults.popup_fields),
        }
    }
}

/// One pin on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub color: &'static str,
    /// Rendered popup HTML
    pub popup: String,
    #[serde(skip)]
    pub tier: PrecisionTier,
}

/// Legend line: group value and its marker color
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub name: String,
    pub color: &'static str,
    pub css: &'static str,
}

#[derive(Serialize)]
struct PopupField<'a> {
    label: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct PopupData<'a> {
    fields: Vec<PopupField<'a>>,
}

#[derive(Serialize)]
struct PageData<'a> {
    title: &'a str,
    center_lat: f64,
    center_lon: f64,
    zoom: u8,
    tile_url: String,
    tile_attribution: String,
    markers: String,
    legend_title: &'a str,
    legend: &'a [LegendEntry],
    version: &'static str,
    git_hash: &'static str,
    generated_at: String,
}

/// Accumulates markers and renders the page
pub struct MapBuilder {
    settings: MapSettings,
    handlebars: Handlebars<'static>,
    markers: Vec<Marker>,
    legend: Vec<LegendEntry>,
}

impl MapBuilder {
    pub fn new(settings: MapSettings) -> FacmapResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string("popup", POPUP_TEMPLATE)
            .map_err(|e| FacmapError::Render(e.to_string()))?;
        handlebars
            .register_template_string("page", PAGE_TEMPLATE)
            .map_err(|e| FacmapError::Render(e.to_string()))?;

        Ok(Self {
            settings,
            handlebars,
            markers: Vec::new(),
            legend: Vec::new(),
        })
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Legend entries in first-seen order
    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    /// Register the group value of a record for the legend
    ///
    /// Called for every record, resolved or not, so the legend lists every
    /// technician in the sheet.
    pub fn note_group(&mut self, record: &FacilityRecord) {
        let group = record.get(&self.settings.group_column).trim();
        if group.is_empty() || self.legend.iter().any(|entry| entry.name == group) {
            return;
        }
        let color = color_for(group);
        self.legend.push(LegendEntry {
            name: group.to_string(),
            color,
            css: css_color(color),
        });
    }

    /// Add a marker for a resolved record
    pub fn add(&mut self, point: &GeoPoint, record: &FacilityRecord) -> FacmapResult<()> {
        self.note_group(record);
        let popup = self.render_popup(record)?;
        self.markers.push(Marker {
            lat: point.lat,
            lon: point.lon,
            color: color_for(record.get(&self.settings.group_column)),
            popup,
            tier: point.tier,
        });
        debug!(row = record.row, lat = point.lat, lon = point.lon, "Marker added");
        Ok(())
    }

    /// Initial view center: the configured one, or the mean of all markers
    pub fn center(&self) -> Option<(f64, f64)> {
        if let Some(center) = self.settings.center {
            return Some(center);
        }
        if self.markers.is_empty() {
            return None;
        }
        let n = self.markers.len() as f64;
        let lat = self.markers.iter().map(|m| m.lat).sum::<f64>() / n;
        let lon = self.markers.iter().map(|m| m.lon).sum::<f64>() / n;
        Some((lat, lon))
    }

    fn render_popup(&self, record: &FacilityRecord) -> FacmapResult<String> {
        let data = PopupData {
            fields: self
                .settings
                .popup_fields
                .iter()
                .map(|field| PopupField {
                    label: field,
                    value: record.get(field),
                })
                .collect(),
        };
        self.handlebars
            .render("popup", &data)
            .map_err(|e| FacmapError::Render(e.to_string()))
    }

    /// Render the page
    ///
    /// # Errors
    /// `NothingResolved` when no marker was added.
    pub fn render(&self) -> FacmapResult<String> {
        let Some((center_lat, center_lon)) = self.center().filter(|_| !self.markers.is_empty())
        else {
            return Err(FacmapError::NothingResolved { misses: 0 });
        };

        let data = PageData {
            title: &self.settings.title,
            center_lat,
            center_lon,
            zoom: self.settings.zoom,
            tile_url: script_json(&self.settings.tile_url)?,
            tile_attribution: script_json(&self.settings.tile_attribution)?,
            markers: script_json(&self.markers)?,
            legend_title: &self.settings.legend_title,
            legend: &self.legend,
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("GIT_HASH"),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
        };

        self.handlebars
            .render("page", &data)
            .map_err(|e| FacmapError::Render(e.to_string()))
    }

    /// Render and write the page atomically
    pub fn write_html(&self, path: &Path) -> FacmapResult<()> {
        let html = self.render()?;
        facmap_common::fs::ensure_parent_dir(path)?;
        facmap_common::fs::write_atomic(path, html.as_bytes())?;
        info!(markers = self.markers.len(), "Map written to {}", path.display());
        Ok(())
    }
}

/// JSON safe to embed inside a `<script>` element
fn script_json<T: Serialize + ?Sized>(value: &T) -> FacmapResult<String> {
    let json = serde_json::to_string(value).map_err(|e| FacmapError::Render(e.to_string()))?;
    Ok(json.replace("</", "<\\/"))
}
