use crate::latch::Latch;
use toolwatch_core::Tool;

/// What the wear check found for the current tool
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WearFindings {
    /// The warning threshold was crossed on this tick
    pub alert: bool,
    /// The tool needs replacement; reported on every tick it holds
    pub replacement_required: bool,
}

/// Watches the usage-derived wear of the current tool
#[derive(Debug, Clone, Default)]
pub struct UsageWearDetector {
    latch: Latch,
}

impl UsageWearDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, tool: &Tool) -> WearFindings {
        let alert = tool.needs_warning() && self.latch.trigger();
        if alert {
            tracing::warn!(
                "Tool {} '{}' wear level at {:.1}%",
                tool.tool_id,
                tool.name,
                tool.wear_level
            );
        }

        let replacement_required = tool.needs_replacement();
        if replacement_required {
            tracing::error!("Tool {} '{}' needs replacement!", tool.tool_id, tool.name);
        }

        WearFindings {
            alert,
            replacement_required,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.latch.is_triggered()
    }

    pub fn reset(&mut self) {
        self.latch.reset();
    }
}
