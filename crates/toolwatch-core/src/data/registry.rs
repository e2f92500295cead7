//! Tool registry
//!
//! Owns the tool records and the current selection, and writes the database
//! back to disk after every mutation.
//!
//! Validation failures return a [`RegistryError`] and leave the registry
//! untouched. A failed write is logged and flagged through
//! `unsaved_changes`; the in-memory state remains authoritative.

use super::persistence::{self, ExportFile, ToolDatabaseFile};
use super::tools::{Tool, ToolSummary, ToolType, ToolUpdate};
use crate::error::{PersistenceError, RegistryError, Result};
use crate::event_bus::{EventBus, RegistryEvent, ToolwatchEvent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Registry snapshot for status reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub tool_count: usize,
    pub current_tool: Option<ToolSummary>,
    pub tools: Vec<ToolSummary>,
    pub unsaved_changes: bool,
}

/// How to treat an unreadable database at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Move the file aside and start empty
    #[default]
    Recover,
    /// Fail with [`PersistenceError::Corrupt`]
    Strict,
}

/// The tool database
pub struct ToolRegistry {
    tools: BTreeMap<u32, Tool>,
    current_tool: Option<u32>,
    path: Option<PathBuf>,
    events: Arc<EventBus>,
    unsaved_changes: bool,
}

impl ToolRegistry {
    /// Registry that is never written to disk
    pub fn in_memory(events: Arc<EventBus>) -> Self {
        Self {
            tools: BTreeMap::new(),
            current_tool: None,
            path: None,
            events,
            unsaved_changes: false,
        }
    }

    /// Open the database at `path`.
    ///
    /// A missing file yields an empty registry. An unreadable file is handled
    /// according to `mode`.
    pub fn load(path: impl Into<PathBuf>, mode: LoadMode, events: Arc<EventBus>) -> Result<Self> {
        let path = path.into();
        let mut registry = Self {
            path: Some(path.clone()),
            ..Self::in_memory(events)
        };

        match persistence::read_database(&path) {
            Ok(Some(db)) => {
                registry.tools = db.tools.into_iter().map(|t| (t.tool_id, t)).collect();
                registry.current_tool = db.current_tool.filter(|id| {
                    let known = registry.tools.contains_key(id);
                    if !known {
                        tracing::warn!("Stored current tool {} is not in the database", id);
                    }
                    known
                });
                tracing::info!(
                    "Tool database ready: {} tools loaded from {}",
                    registry.tools.len(),
                    path.display()
                );
            }
            Ok(None) => {
                tracing::info!("No tool database at {}, starting empty", path.display());
            }
            Err(err @ PersistenceError::Corrupt { .. }) => {
                if mode == LoadMode::Strict {
                    return Err(err.into());
                }
                let moved = persistence::quarantine(&path)?;
                tracing::error!(
                    "{}; moved to {} and starting with an empty database",
                    err,
                    moved.display()
                );
            }
            Err(err) => return Err(err.into()),
        }

        Ok(registry)
    }

    /// Database file location, `None` for in-memory registries
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the last write failed
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Write the database now.
    pub fn save(&mut self) -> std::result::Result<(), PersistenceError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let db = ToolDatabaseFile::new(self.current_tool, self.tools.values().cloned().collect());
        persistence::write_json_atomic(&path, &db)?;
        self.unsaved_changes = false;
        tracing::debug!("Saved {} tools to {}", self.tools.len(), path.display());
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            tracing::error!("Error saving tool database: {}", e);
            self.unsaved_changes = true;
            self.emit(RegistryEvent::SaveFailed {
                reason: e.to_string(),
            });
        }
    }

    fn emit(&self, event: RegistryEvent) {
        self.events.emit(ToolwatchEvent::Registry(event));
    }

    fn tool_mut(&mut self, tool_id: u32) -> std::result::Result<&mut Tool, RegistryError> {
        self.tools
            .get_mut(&tool_id)
            .ok_or(RegistryError::ToolNotFound { tool_id })
    }

    /// Register a new tool
    pub fn add(&mut self, tool: Tool) -> std::result::Result<(), RegistryError> {
        let tool_id = tool.tool_id;
        if self.tools.contains_key(&tool_id) {
            return Err(RegistryError::DuplicateTool { tool_id });
        }

        let name = tool.name.clone();
        self.tools.insert(tool_id, tool);
        self.persist();
        tracing::info!("Tool {} '{}' added to database", tool_id, name);
        self.emit(RegistryEvent::ToolAdded { tool_id, name });
        Ok(())
    }

    /// Apply a partial update
    pub fn update(
        &mut self,
        tool_id: u32,
        update: &ToolUpdate,
    ) -> std::result::Result<(), RegistryError> {
        if !self.tools.contains_key(&tool_id) {
            return Err(RegistryError::ToolNotFound { tool_id });
        }
        if update.is_empty() {
            return Err(RegistryError::EmptyUpdate { tool_id });
        }

        update.apply_to(self.tool_mut(tool_id)?);
        self.persist();
        tracing::info!("Tool {} updated", tool_id);
        self.emit(RegistryEvent::ToolUpdated { tool_id });
        Ok(())
    }

    /// Remove a tool, clearing the selection if it was current
    pub fn remove(&mut self, tool_id: u32) -> std::result::Result<Tool, RegistryError> {
        let tool = self
            .tools
            .remove(&tool_id)
            .ok_or(RegistryError::ToolNotFound { tool_id })?;

        if self.current_tool == Some(tool_id) {
            self.current_tool = None;
        }
        self.persist();
        tracing::info!("Tool {} removed from database", tool_id);
        self.emit(RegistryEvent::ToolRemoved { tool_id });
        Ok(tool)
    }

    /// Make a tool current.
    ///
    /// A worn tool is still selected; exactly one warning event is published
    /// (replacement takes precedence over the wear warning).
    pub fn select(&mut self, tool_id: u32) -> std::result::Result<&Tool, RegistryError> {
        let tool = self
            .tools
            .get(&tool_id)
            .ok_or(RegistryError::ToolNotFound { tool_id })?;
        if !tool.is_active {
            return Err(RegistryError::InactiveTool { tool_id });
        }

        if tool.needs_replacement() {
            tracing::warn!("Tool {} needs replacement!", tool_id);
            self.emit(RegistryEvent::ReplacementWarning { tool_id });
        } else if tool.needs_warning() {
            let wear_level = tool.wear_level;
            tracing::warn!("Tool {} wear level at {:.1}%", tool_id, wear_level);
            self.emit(RegistryEvent::WearWarning {
                tool_id,
                wear_level,
            });
        }

        self.current_tool = Some(tool_id);
        self.persist();
        self.emit(RegistryEvent::ToolSelected { tool_id });
        let tool = self
            .tools
            .get(&tool_id)
            .ok_or(RegistryError::ToolNotFound { tool_id })?;
        tracing::info!("Selected {}", tool.description_short());
        Ok(tool)
    }

    /// Look up a tool by id
    pub fn get(&self, tool_id: u32) -> Option<&Tool> {
        self.tools.get(&tool_id)
    }

    /// Currently selected tool
    pub fn current(&self) -> Option<&Tool> {
        self.current_tool.and_then(|id| self.tools.get(&id))
    }

    /// Id of the currently selected tool
    pub fn current_id(&self) -> Option<u32> {
        self.current_tool
    }

    /// Tools sorted by id, optionally restricted to one type
    pub fn list(&self, filter: Option<ToolType>) -> Vec<&Tool> {
        self.tools
            .values()
            .filter(|t| filter.is_none_or(|ty| t.tool_type == ty))
            .collect()
    }

    /// Add usage to the current tool.
    ///
    /// Returns the updated tool, or `None` when no tool is selected.
    pub fn record_usage(
        &mut self,
        runtime: f64,
        distance: f64,
        spindle_running: bool,
    ) -> Option<&Tool> {
        let Some(tool_id) = self.current_tool else {
            tracing::debug!("No tool selected, usage not recorded");
            return None;
        };
        let tool = self.tools.get_mut(&tool_id)?;
        tool.update_usage(runtime, distance);
        if spindle_running {
            tool.spindle_on_count += 1;
        }
        tracing::debug!(
            "Tool {} usage: +{:.1}s +{:.1}mm, wear {:.1}%",
            tool_id,
            runtime,
            distance,
            tool.wear_level
        );
        self.persist();
        self.tools.get(&tool_id)
    }

    /// Zero usage counters and wear
    pub fn reset_stats(&mut self, tool_id: u32) -> std::result::Result<(), RegistryError> {
        self.tool_mut(tool_id)?.reset_usage();
        self.persist();
        tracing::info!("Tool {} statistics reset", tool_id);
        self.emit(RegistryEvent::StatsReset { tool_id });
        Ok(())
    }

    /// Take a tool out of service
    pub fn deactivate(&mut self, tool_id: u32) -> std::result::Result<(), RegistryError> {
        self.tool_mut(tool_id)?.is_active = false;
        self.persist();
        tracing::warn!("Tool {} marked inactive", tool_id);
        self.emit(RegistryEvent::ToolDeactivated { tool_id });
        Ok(())
    }

    /// Merge a probe-derived wear estimate; returns the resulting wear level
    pub fn apply_probe_wear(
        &mut self,
        tool_id: u32,
        wear_percent: f64,
    ) -> std::result::Result<f64, RegistryError> {
        let tool = self.tool_mut(tool_id)?;
        tool.merge_probe_wear(wear_percent);
        let wear_level = tool.wear_level;
        self.persist();
        Ok(wear_level)
    }

    /// Write all tools to an export file; returns the number exported
    pub fn export_to(&self, path: &Path) -> Result<usize> {
        let export = ExportFile {
            exported_at: Utc::now(),
            tools: self.tools.values().cloned().collect(),
        };
        persistence::write_json_atomic(path, &export)?;
        tracing::info!("Exported {} tools to {}", export.tools.len(), path.display());
        Ok(export.tools.len())
    }

    /// Read tools from an export file.
    ///
    /// Existing ids are skipped unless `overwrite` is set. Only the first
    /// entry for an id is used. If an overwrite makes the current tool
    /// inactive, the selection is cleared.
    pub fn import_from(&mut self, path: &Path, overwrite: bool) -> Result<ImportSummary> {
        let export = persistence::read_export(path)?;

        let mut summary = ImportSummary {
            imported: 0,
            skipped: 0,
        };
        let mut seen = BTreeSet::new();
        for tool in export.tools {
            if !seen.insert(tool.tool_id) {
                tracing::warn!(
                    "Tool {} listed twice in {}, later entry ignored",
                    tool.tool_id,
                    path.display()
                );
                summary.skipped += 1;
                continue;
            }
            if self.tools.contains_key(&tool.tool_id) && !overwrite {
                summary.skipped += 1;
                continue;
            }
            if self.current_tool == Some(tool.tool_id) && !tool.is_active {
                tracing::warn!(
                    "Imported record for current tool {} is inactive, selection cleared",
                    tool.tool_id
                );
                self.current_tool = None;
            }
            self.tools.insert(tool.tool_id, tool);
            summary.imported += 1;
        }

        self.persist();
        tracing::info!(
            "Imported {} tools, skipped {}",
            summary.imported,
            summary.skipped
        );
        self.emit(RegistryEvent::ToolsImported {
            imported: summary.imported,
            skipped: summary.skipped,
        });
        Ok(summary)
    }

    /// Snapshot for status reporting
    pub fn status(&self) -> RegistryStatus {
        RegistryStatus {
            tool_count: self.tools.len(),
            current_tool: self.current().map(Tool::summary),
            tools: self.tools.values().map(Tool::summary).collect(),
            unsaved_changes: self.unsaved_changes,
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.len())
            .field("current_tool", &self.current_tool)
            .field("path", &self.path)
            .field("unsaved_changes", &self.unsaved_changes)
            .finish()
    }
}
