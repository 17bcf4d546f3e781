// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.
use serde::{Deserialize, Serialize};

/// How an external cache adapter should treat a layer's tiles. The core
/// never reads or writes a disk cache itself (open question in the design
/// notes); this is carried purely so an adapter outside this crate can honor
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    NoCache,
    ReadOnly,
    ReadWrite,
    CacheOnly,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::ReadWrite
    }
}

/// A compact-ISO-8601 (`YYYYMMDDTHHMMSSZ`) timestamp, stored as the raw UTC
/// components. No timezone arithmetic is performed; it exists only to parse
/// and format cache metadata timestamps that pass through the JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompactDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CompactDateTime {
    pub fn parse(s: &str) -> Option<CompactDateTime> {
        let s = s.strip_suffix('Z')?;
        if s.len() != 15 || s.as_bytes()[8] != b'T' {
            return None;
        }
        let (date, time) = s.split_at(8);
        let time = &time[1..];
        Some(CompactDateTime {
            year: date[0..4].parse().ok()?,
            month: date[4..6].parse().ok()?,
            day: date[6..8].parse().ok()?,
            hour: time[0..2].parse().ok()?,
            minute: time[2..4].parse().ok()?,
            second: time[4..6].parse().ok()?,
        })
    }

    pub fn format(&self) -> String {
        format!(
            "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl Serialize for CompactDateTime {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for CompactDateTime {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        CompactDateTime::parse(&s).ok_or_else(|| serde::de::Error::custom("invalid compact ISO8601 timestamp"))
    }
}

/// JSON schema for a single layer entry, matching the documented field table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LayerConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<u32>,
    #[serde(default)]
    pub cache_policy: CachePolicy,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_opacity() -> f32 {
    1.0
}

/// JSON schema for a map: an ordered list of layer configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapConfig {
    pub layers: Vec<LayerConfig>,
}

/// JSON schema for terrain rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TerrainConfig {
    pub tile_size: u32,
    pub min_tile_range_factor: f64,
    pub pixel_error: f64,
    pub max_level: u32,
    pub min_level: u32,
    pub tile_pixel_size: u32,
    pub skirt_ratio: f64,
    pub background_color: [f32; 4],
    pub concurrency: u32,
    pub wire_overlay: bool,
    pub lighting: bool,
    pub tile_cache_size: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            tile_size: 17,
            min_tile_range_factor: 7.0,
            pixel_error: 2.0,
            max_level: 19,
            min_level: 0,
            tile_pixel_size: 256,
            skirt_ratio: 0.02,
            background_color: [0.0, 0.0, 0.0, 1.0],
            concurrency: 6,
            wire_overlay: false,
            lighting: true,
            tile_cache_size: 128,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compact_date_time_round_trips() {
        let dt = CompactDateTime::parse("20240131T235901Z").unwrap();
        assert_eq!(dt.year, 2024);
        assert_eq!(dt.second, 1);
        assert_eq!(dt.format(), "20240131T235901Z");
    }

    #[test]
    fn malformed_date_time_fails_to_parse() {
        assert!(CompactDateTime::parse("not-a-date").is_none());
    }

    #[test]
    fn layer_config_round_trips_through_json() {
        let cfg = LayerConfig {
            name: "basemap".into(),
            uri: Some("https://example.test/tiles".into()),
            connection: None,
            min_level: Some(0),
            max_level: Some(18),
            cache_policy: CachePolicy::ReadOnly,
            opacity: 0.8,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"cache_policy\":\"read_only\""));
        let back: LayerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, cfg.name);
        assert_eq!(back.cache_policy, CachePolicy::ReadOnly);
    }

    #[test]
    fn terrain_config_defaults_are_sane() {
        let cfg = TerrainConfig::default();
        assert_eq!(cfg.tile_size, 17);
        assert!(cfg.concurrency > 0);
    }
}
