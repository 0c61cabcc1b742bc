//! Gallery configuration.
//!
//! [`GalleryConfig`] is the plain, deserializable option set. [`GalleryConfig::resolve`] turns it
//! into a [`ResolvedConfig`] whose values are guaranteed usable: anything out of range falls back
//! to its default and the problem is logged and kept in [`ResolvedConfig::warnings`].

use crate::error::ConfigError;
use crate::packer::GridMetrics;
use crate::pattern::DEFAULT_PATTERNS;
use crate::pattern::PatternSet;
use crate::pattern::Shape;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_UNIT: f64 = 200.0;
pub const DEFAULT_GAP: f64 = 10.0;
pub const DEFAULT_PAGE_SIZE: usize = 24;
pub const DEFAULT_BUFFER_EXTENT: f64 = 600.0;
pub const DEFAULT_NEAR_BOTTOM_THRESHOLD: f64 = 800.0;
pub const DEFAULT_SCROLL_THROTTLE_MS: u64 = 16;
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 150;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GalleryConfig {
    pub base_unit: f64,
    pub gap: f64,
    pub page_size: usize,
    pub buffer_extent: f64,
    pub near_bottom_threshold: f64,
    pub scroll_throttle_ms: u64,
    pub resize_debounce_ms: u64,
    pub patterns: Vec<Shape>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            base_unit: DEFAULT_BASE_UNIT,
            gap: DEFAULT_GAP,
            page_size: DEFAULT_PAGE_SIZE,
            buffer_extent: DEFAULT_BUFFER_EXTENT,
            near_bottom_threshold: DEFAULT_NEAR_BOTTOM_THRESHOLD,
            scroll_throttle_ms: DEFAULT_SCROLL_THROTTLE_MS,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            patterns: DEFAULT_PATTERNS.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub metrics: GridMetrics,
    pub page_size: usize,
    pub buffer_extent: f64,
    pub near_bottom_threshold: f64,
    pub scroll_throttle: Duration,
    pub resize_debounce: Duration,
    pub patterns: PatternSet,
    pub warnings: Vec<ConfigError>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        GalleryConfig::default().resolve()
    }
}

impl GalleryConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|err| ConfigError::Malformed(err.to_string()))
    }

    /// Builds a configuration from element-style attributes (`base-unit="180"`,
    /// `patterns='[{"width":2,"height":1}]'`, ...).
    ///
    /// Unparsable values keep their default and are reported; this never fails.
    pub fn from_attributes<'a>(
        attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> (Self, Vec<ConfigError>) {
        let mut config = Self::default();
        let mut errors = Vec::new();

        for (name, value) in attributes {
            let value = value.trim();
            let result = match name {
                "base-unit" => parse_into(value, "base-unit", "a number", &mut config.base_unit),
                "gap" => parse_into(value, "gap", "a number", &mut config.gap),
                "page-size" => parse_into(value, "page-size", "an integer", &mut config.page_size),
                "buffer" => parse_into(value, "buffer", "a number", &mut config.buffer_extent),
                "near-bottom" => parse_into(
                    value,
                    "near-bottom",
                    "a number",
                    &mut config.near_bottom_threshold,
                ),
                "patterns" => serde_json::from_str::<Vec<Shape>>(value)
                    .map(|patterns| config.patterns = patterns)
                    .map_err(|err| ConfigError::MalformedPatterns(err.to_string())),
                other => Err(ConfigError::UnknownAttribute(other.to_string())),
            };
            if let Err(err) = result {
                tracing::warn!(attribute = name, error = %err, "ignoring gallery attribute");
                errors.push(err);
            }
        }

        (config, errors)
    }

    pub fn resolve(&self) -> ResolvedConfig {
        let mut warnings = Vec::new();

        let base_unit = positive_or(
            self.base_unit,
            "baseUnit",
            DEFAULT_BASE_UNIT,
            &mut warnings,
        );
        let gap = if self.gap.is_finite() && self.gap >= 0.0 {
            self.gap
        } else {
            warnings.push(invalid("gap", "a non-negative number", self.gap));
            DEFAULT_GAP
        };
        let page_size = if self.page_size > 0 {
            self.page_size
        } else {
            warnings.push(invalid("pageSize", "a positive integer", self.page_size));
            DEFAULT_PAGE_SIZE
        };
        let buffer_extent = if self.buffer_extent.is_finite() && self.buffer_extent >= 0.0 {
            self.buffer_extent
        } else {
            warnings.push(invalid("bufferExtent", "a non-negative number", self.buffer_extent));
            DEFAULT_BUFFER_EXTENT
        };
        let near_bottom_threshold = if self.near_bottom_threshold.is_finite() {
            self.near_bottom_threshold.max(0.0)
        } else {
            warnings.push(invalid(
                "nearBottomThreshold",
                "a number",
                self.near_bottom_threshold,
            ));
            DEFAULT_NEAR_BOTTOM_THRESHOLD
        };
        let (patterns, pattern_error) = PatternSet::or_default(self.patterns.clone());
        warnings.extend(pattern_error);

        for warning in &warnings {
            tracing::warn!(error = %warning, "gallery configuration fell back to a default");
        }

        ResolvedConfig {
            metrics: GridMetrics { base_unit, gap },
            page_size,
            buffer_extent,
            near_bottom_threshold,
            scroll_throttle: Duration::from_millis(self.scroll_throttle_ms),
            resize_debounce: Duration::from_millis(self.resize_debounce_ms),
            patterns,
            warnings,
        }
    }
}

fn parse_into<V: std::str::FromStr>(
    value: &str,
    name: &'static str,
    expected: &'static str,
    slot: &mut V,
) -> Result<(), ConfigError> {
    match value.parse() {
        Ok(parsed) => {
            *slot = parsed;
            Ok(())
        }
        Err(_) => Err(ConfigError::InvalidValue {
            name,
            expected,
            value: value.to_string(),
        }),
    }
}

fn positive_or(
    value: f64,
    name: &'static str,
    default: f64,
    warnings: &mut Vec<ConfigError>,
) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warnings.push(invalid(name, "a positive number", value));
        default
    }
}

fn invalid(name: &'static str, expected: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        expected,
        value: value.to_string(),
    }
}
