//! Provider used when no editor is configured.

use async_trait::async_trait;

use super::{EditorProvider, ProviderError};
use crate::scene::{NodeSummary, PropertyBag, SceneInfo, SceneNode, Transform2DUpdate};

/// Fails every operation with [`ProviderError::Unavailable`].
///
/// Lets the MCP server start, list its tools, and answer `initialize`
/// without a running editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

#[async_trait]
impl EditorProvider for OfflineProvider {
    async fn create_node(&self, _: &str, _: &str, _: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn delete_node(&self, _: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn update_node_property(&self, _: &str, _: &str, _: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn get_node_properties(&self, _: &str) -> Result<PropertyBag, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn list_nodes(&self, _: &str) -> Result<Vec<NodeSummary>, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn create_script(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn edit_script(&self, _: &str, _: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn get_script(&self, _: Option<&str>, _: Option<&str>) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn list_assets(&self, _: &str) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn list_project_files(&self, _: &[String]) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn execute_editor_script(&self, _: &str) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn get_scene_tree(&self) -> Result<SceneNode, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn get_debug_output(&self) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn get_current_scene_info(&self) -> Result<Option<SceneInfo>, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn get_selected_node(&self) -> Result<Option<NodeSummary>, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn update_2d_transform(&self, _: &Transform2DUpdate) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }
}
