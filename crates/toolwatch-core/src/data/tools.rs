//! Tool records
//!
//! This module provides:
//! - Tool types
//! - The persisted tool record with geometry, cutting parameters, usage counters and limits
//! - Partial updates addressed by field name
//! - Compact summaries for status snapshots

use super::wear;
use crate::error::RegistryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tool types for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    /// Twist drill
    Drill,
    /// Flat end mill
    Endmill,
    /// Ball nose end mill
    Ballnose,
    /// V-bit engraving tool
    Vbit,
    /// Laser head
    Laser,
    /// Surfacing / planer bit
    Planer,
    /// Anything else
    #[default]
    Custom,
}

impl ToolType {
    /// Get all tool types
    pub fn all() -> &'static [ToolType] {
        &[
            ToolType::Drill,
            ToolType::Endmill,
            ToolType::Ballnose,
            ToolType::Vbit,
            ToolType::Laser,
            ToolType::Planer,
            ToolType::Custom,
        ]
    }

    /// Lowercase identifier used in files and commands
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drill => "drill",
            Self::Endmill => "endmill",
            Self::Ballnose => "ballnose",
            Self::Vbit => "vbit",
            Self::Laser => "laser",
            Self::Planer => "planer",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ToolType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| RegistryError::InvalidField {
                field: "tool_type".to_string(),
                reason: format!("unknown tool type '{}'", s),
            })
    }
}

fn default_true() -> bool {
    true
}

fn default_warning_threshold() -> f64 {
    wear::DEFAULT_WARNING_THRESHOLD
}

/// A single CNC tool
///
/// Optional fields fall back to their defaults when missing from a file, so
/// databases written by older versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique tool identifier
    pub tool_id: u32,
    /// Display name
    pub name: String,
    /// Tool type
    pub tool_type: ToolType,
    /// Free-form description
    #[serde(default)]
    pub description: String,

    // Geometry
    /// Cutting diameter in mm
    pub diameter: f64,
    /// Overall length in mm
    pub length: f64,
    /// Flute (cutting) length in mm
    #[serde(default)]
    pub flute_length: f64,
    /// Tool change offset, X
    #[serde(default)]
    pub offset_x: f64,
    /// Tool change offset, Y
    #[serde(default)]
    pub offset_y: f64,
    /// Tool change offset, Z
    #[serde(default)]
    pub offset_z: f64,

    // Cutting parameters
    /// Maximum spindle speed
    #[serde(default)]
    pub max_rpm: u32,
    /// Feed rate in mm/min
    #[serde(default)]
    pub feedrate: f64,
    /// Plunge rate in mm/min
    #[serde(default)]
    pub plunge_rate: f64,
    /// V-bit or tip angle in degrees
    #[serde(default)]
    pub angle: f64,

    // Usage
    /// Accumulated cutting time in seconds
    #[serde(default)]
    pub total_runtime: f64,
    /// Accumulated travel in mm
    #[serde(default)]
    pub total_distance: f64,
    /// Number of usage records taken with the spindle running
    #[serde(default)]
    pub spindle_on_count: u32,
    /// Wear level, 0-100
    #[serde(default)]
    pub wear_level: f64,

    // Lifecycle
    /// Last time usage was recorded
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Inactive tools cannot be selected
    #[serde(default = "default_true")]
    pub is_active: bool,

    // Limits
    /// Runtime limit in seconds, 0 = unlimited
    #[serde(default)]
    pub max_runtime: f64,
    /// Distance limit in mm, 0 = unlimited
    #[serde(default)]
    pub max_distance: f64,
    /// Wear percentage at which warnings start
    #[serde(default = "default_warning_threshold")]
    pub wear_warning_threshold: f64,
}

impl Tool {
    /// Create a new tool with basic properties
    pub fn new(
        tool_id: u32,
        name: impl Into<String>,
        tool_type: ToolType,
        diameter: f64,
        length: f64,
    ) -> Self {
        Self {
            tool_id,
            name: name.into(),
            tool_type,
            description: String::new(),
            diameter,
            length,
            flute_length: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            offset_z: 0.0,
            max_rpm: 0,
            feedrate: 0.0,
            plunge_rate: 0.0,
            angle: 0.0,
            total_runtime: 0.0,
            total_distance: 0.0,
            spindle_on_count: 0,
            wear_level: 0.0,
            last_used: None,
            created_at: Utc::now(),
            is_active: true,
            max_runtime: 0.0,
            max_distance: 0.0,
            wear_warning_threshold: wear::DEFAULT_WARNING_THRESHOLD,
        }
    }

    /// Set the usage limits (0 = unlimited)
    pub fn with_limits(mut self, max_runtime: f64, max_distance: f64) -> Self {
        self.max_runtime = max_runtime;
        self.max_distance = max_distance;
        self.recalculate_wear();
        self
    }

    /// Record usage and recompute wear
    pub fn update_usage(&mut self, runtime: f64, distance: f64) {
        self.total_runtime += runtime.max(0.0);
        self.total_distance += distance.max(0.0);
        self.last_used = Some(Utc::now());
        self.recalculate_wear();
    }

    /// Recompute `wear_level` from counters and limits
    pub fn recalculate_wear(&mut self) {
        self.wear_level = wear::usage_wear(
            self.total_runtime,
            self.max_runtime,
            self.total_distance,
            self.max_distance,
        );
    }

    /// Merge a probe-derived wear estimate, keeping the higher value
    pub fn merge_probe_wear(&mut self, wear_percent: f64) {
        self.wear_level = self.wear_level.max(wear_percent.clamp(0.0, wear::WEAR_LIMIT));
    }

    /// Zero all usage counters and wear
    pub fn reset_usage(&mut self) {
        self.total_runtime = 0.0;
        self.total_distance = 0.0;
        self.spindle_on_count = 0;
        self.wear_level = 0.0;
    }

    /// Check whether the tool must be replaced
    pub fn needs_replacement(&self) -> bool {
        wear::needs_replacement(self.wear_level, self.is_active)
    }

    /// Check whether a wear warning should be raised
    pub fn needs_warning(&self) -> bool {
        wear::needs_warning(self.wear_level, self.wear_warning_threshold)
    }

    /// Get a descriptive string for the tool
    pub fn description_short(&self) -> String {
        format!(
            "T{}: {} ({}) - Ø{}mm L{}mm - Wear: {:.0}%",
            self.tool_id, self.name, self.tool_type, self.diameter, self.length, self.wear_level
        )
    }

    /// Compact summary for status snapshots
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            id: self.tool_id,
            name: self.name.clone(),
            tool_type: self.tool_type,
            diameter: self.diameter,
            length: self.length,
            wear_level: self.wear_level,
            is_active: self.is_active,
        }
    }
}

/// Compact tool view used in status snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub diameter: f64,
    pub length: f64,
    pub wear_level: f64,
    pub is_active: bool,
}

/// Partial update of a tool record
///
/// Only fields set to `Some` are applied. Identity, usage counters and
/// timestamps are not updatable through this path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolUpdate {
    pub name: Option<String>,
    pub tool_type: Option<ToolType>,
    pub description: Option<String>,
    pub diameter: Option<f64>,
    pub length: Option<f64>,
    pub flute_length: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub offset_z: Option<f64>,
    pub max_rpm: Option<u32>,
    pub feedrate: Option<f64>,
    pub plunge_rate: Option<f64>,
    pub angle: Option<f64>,
    pub max_runtime: Option<f64>,
    pub max_distance: Option<f64>,
    pub wear_warning_threshold: Option<f64>,
    pub is_active: Option<bool>,
}

fn parse_field<T: FromStr>(field: &str, value: &str) -> Result<T, RegistryError> {
    value.trim().parse::<T>().map_err(|_| RegistryError::InvalidField {
        field: field.to_string(),
        reason: format!("cannot parse '{}'", value),
    })
}

fn parse_flag(field: &str, value: &str) -> Result<bool, RegistryError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(RegistryError::InvalidField {
            field: field.to_string(),
            reason: format!("expected 0/1, got '{}'", value),
        }),
    }
}

impl ToolUpdate {
    /// Build an update from loosely typed key/value pairs.
    ///
    /// Keys are case-insensitive (`DIAMETER=6` and `diameter=6` are equal);
    /// `type` is accepted as an alias of `tool_type`. Unrecognized keys are
    /// skipped.
    pub fn from_fields<'a, I>(fields: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut update = ToolUpdate::default();
        for (key, value) in fields {
            let key = key.trim().to_lowercase();
            match key.as_str() {
                "name" => update.name = Some(value.to_string()),
                "type" | "tool_type" => update.tool_type = Some(value.parse()?),
                "description" => update.description = Some(value.to_string()),
                "diameter" => update.diameter = Some(parse_field(&key, value)?),
                "length" => update.length = Some(parse_field(&key, value)?),
                "flute_length" => update.flute_length = Some(parse_field(&key, value)?),
                "offset_x" => update.offset_x = Some(parse_field(&key, value)?),
                "offset_y" => update.offset_y = Some(parse_field(&key, value)?),
                "offset_z" => update.offset_z = Some(parse_field(&key, value)?),
                "max_rpm" => update.max_rpm = Some(parse_field(&key, value)?),
                "feedrate" => update.feedrate = Some(parse_field(&key, value)?),
                "plunge_rate" => update.plunge_rate = Some(parse_field(&key, value)?),
                "angle" => update.angle = Some(parse_field(&key, value)?),
                "max_runtime" => update.max_runtime = Some(parse_field(&key, value)?),
                "max_distance" => update.max_distance = Some(parse_field(&key, value)?),
                "wear_warning_threshold" => {
                    update.wear_warning_threshold = Some(parse_field(&key, value)?)
                }
                "is_active" => update.is_active = Some(parse_flag(&key, value)?),
                other => tracing::debug!("Ignoring unrecognized tool field '{}'", other),
            }
        }
        Ok(update)
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == ToolUpdate::default()
    }

    /// Apply the set fields to `tool`.
    ///
    /// Wear is recomputed from counters when a limit changed.
    pub fn apply_to(&self, tool: &mut Tool) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut tool.name, &self.name);
        set(&mut tool.tool_type, &self.tool_type);
        set(&mut tool.description, &self.description);
        set(&mut tool.diameter, &self.diameter);
        set(&mut tool.length, &self.length);
        set(&mut tool.flute_length, &self.flute_length);
        set(&mut tool.offset_x, &self.offset_x);
        set(&mut tool.offset_y, &self.offset_y);
        set(&mut tool.offset_z, &self.offset_z);
        set(&mut tool.max_rpm, &self.max_rpm);
        set(&mut tool.feedrate, &self.feedrate);
        set(&mut tool.plunge_rate, &self.plunge_rate);
        set(&mut tool.angle, &self.angle);
        set(&mut tool.max_runtime, &self.max_runtime);
        set(&mut tool.max_distance, &self.max_distance);
        set(&mut tool.wear_warning_threshold, &self.wear_warning_threshold);
        set(&mut tool.is_active, &self.is_active);

        if self.max_runtime.is_some() || self.max_distance.is_some() {
            tool.recalculate_wear();
        }
    }
}
