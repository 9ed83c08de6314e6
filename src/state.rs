use crate::error::ToolError;
use crate::tools::{AnnotationCapture, ToolKind};

/// Which measurement tool, if any, currently receives user gestures
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    #[default]
    Idle,
    UsingTool {
        active_tool: ToolKind,
    },
}

/// Tracks the single active annotation tool and keeps the capture library in step.
#[derive(Debug, Default)]
pub struct ToolActivationController {
    state: ToolState,
}

impl ToolActivationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `tool`, releasing whatever was active before.
    pub fn activate(&mut self, tool: ToolKind, capture: &mut dyn AnnotationCapture) {
        if let ToolState::UsingTool { active_tool } = self.state {
            if active_tool != tool {
                capture.release(active_tool);
            }
        }

        capture.route_gestures_to(tool);
        log::info!("Activated tool {}", tool);

        self.state = ToolState::UsingTool { active_tool: tool };
    }

    /// Activate a tool by its registered name; state is unchanged on failure.
    pub fn activate_named(
        &mut self,
        name: &str,
        capture: &mut dyn AnnotationCapture,
    ) -> Result<ToolKind, ToolError> {
        let tool = name.parse::<ToolKind>().inspect_err(|err| {
            log::warn!("Rejected tool activation: {}", err);
        })?;
        self.activate(tool, capture);
        Ok(tool)
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn active_tool(&self) -> Option<ToolKind> {
        match self.state {
            ToolState::UsingTool { active_tool } => Some(active_tool),
            ToolState::Idle => None,
        }
    }

    pub fn is_using_tool(&self) -> bool {
        matches!(self.state, ToolState::UsingTool { .. })
    }
}
