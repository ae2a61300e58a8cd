//! Provider backed by a live editor link.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::decode::{decode_node_summary, decode_properties, decode_property_value, decode_scene_node, Payload};
use super::{CommandMultiplexer, EditorProvider, ProviderError};
use crate::scene::{NodeSummary, PropertyBag, SceneInfo, SceneNode, Transform2DUpdate};
use crate::transport::{Transport, WebSocketTransport};

/// Build a params map from `json!` object syntax.
fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// [`EditorProvider`] that sends each operation to the editor plugin.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    mux: CommandMultiplexer,
}

impl RemoteProvider {
    /// Provider over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            mux: CommandMultiplexer::new(transport),
        }
    }

    /// Provider over a WebSocket to the editor plugin at `url`.
    pub fn websocket(url: &str, connect_timeout: Duration) -> Self {
        Self::new(Arc::new(WebSocketTransport::new(url, connect_timeout)))
    }

    async fn call(&self, command: &str, params: Map<String, Value>) -> Result<Map<String, Value>, ProviderError> {
        self.mux.call(command, params).await
    }
}

#[async_trait]
impl EditorProvider for RemoteProvider {
    async fn create_node(
        &self,
        parent_path: &str,
        node_type: &str,
        node_name: &str,
    ) -> Result<String, ProviderError> {
        let result = self
            .call(
                "create_node",
                params(json!({
                    "parent_path": parent_path,
                    "node_type": node_type,
                    "node_name": node_name,
                })),
            )
            .await?;
        Payload::new("create_node", &result).string("node_path")
    }

    async fn delete_node(&self, node_path: &str) -> Result<String, ProviderError> {
        let result = self
            .call("delete_node", params(json!({ "node_path": node_path })))
            .await?;
        Payload::new("delete_node", &result).string("deleted_node_path")
    }

    async fn update_node_property(
        &self,
        node_path: &str,
        property: &str,
        value: &str,
    ) -> Result<String, ProviderError> {
        let result = self
            .call(
                "update_node_property",
                params(json!({
                    "node_path": node_path,
                    "property": property,
                    "value": value,
                })),
            )
            .await?;
        result
            .get("parsed_value")
            .and_then(decode_property_value)
            .map(|v| v.to_string())
            .ok_or_else(|| {
                ProviderError::Response(
                    "update_node_property: expected renderable field 'parsed_value'".to_string(),
                )
            })
    }

    async fn get_node_properties(&self, node_path: &str) -> Result<PropertyBag, ProviderError> {
        let result = self
            .call("get_node_properties", params(json!({ "node_path": node_path })))
            .await?;
        let properties = Payload::new("get_node_properties", &result).object("properties")?;
        Ok(decode_properties(properties))
    }

    async fn list_nodes(&self, node_path: &str) -> Result<Vec<NodeSummary>, ProviderError> {
        let result = self
            .call("list_nodes", params(json!({ "node_path": node_path })))
            .await?;
        Payload::new("list_nodes", &result).array_of("children", decode_node_summary)
    }

    async fn create_script(
        &self,
        script_path: &str,
        content: &str,
        node_path: Option<&str>,
    ) -> Result<(), ProviderError> {
        self.call(
            "create_script",
            params(json!({
                "script_path": script_path,
                "content": content,
                "node_path": node_path.unwrap_or_default(),
            })),
        )
        .await?;
        Ok(())
    }

    async fn edit_script(&self, script_path: &str, content: &str) -> Result<(), ProviderError> {
        self.call(
            "edit_script",
            params(json!({ "script_path": script_path, "content": content })),
        )
        .await?;
        Ok(())
    }

    async fn get_script(
        &self,
        script_path: Option<&str>,
        node_path: Option<&str>,
    ) -> Result<String, ProviderError> {
        let result = self
            .call(
                "get_script",
                params(json!({
                    "script_path": script_path.unwrap_or_default(),
                    "node_path": node_path.unwrap_or_default(),
                })),
            )
            .await?;
        Payload::new("get_script", &result).string("content")
    }

    async fn list_assets(&self, asset_type: &str) -> Result<Vec<String>, ProviderError> {
        let result = self
            .call("list_assets_by_type", params(json!({ "type": asset_type })))
            .await?;
        Payload::new("list_assets_by_type", &result).strings("files")
    }

    async fn list_project_files(&self, extensions: &[String]) -> Result<Vec<String>, ProviderError> {
        let result = self
            .call("list_project_files", params(json!({ "extensions": extensions })))
            .await?;
        Payload::new("list_project_files", &result).strings("files")
    }

    async fn execute_editor_script(&self, code: &str) -> Result<Vec<String>, ProviderError> {
        let result = self
            .call("execute_editor_script", params(json!({ "code": code })))
            .await?;
        Payload::new("execute_editor_script", &result)
            .array_of("output", |v| v.as_str().map(str::to_string))
    }

    async fn get_scene_tree(&self) -> Result<SceneNode, ProviderError> {
        let result = self.call("get_full_scene_tree", Map::new()).await?;
        decode_scene_node(&Value::Object(result)).ok_or_else(|| {
            ProviderError::Response("get_full_scene_tree: incomplete root node".to_string())
        })
    }

    async fn get_debug_output(&self) -> Result<String, ProviderError> {
        let result = self.call("get_debug_output", Map::new()).await?;
        Payload::new("get_debug_output", &result).string("output")
    }

    async fn get_current_scene_info(&self) -> Result<Option<SceneInfo>, ProviderError> {
        let result = self.call("get_current_scene_structure", Map::new()).await?;
        let payload = Payload::new("get_current_scene_structure", &result);
        let Some(root_node_name) = payload.opt_string("root_node_name")? else {
            return Ok(None);
        };
        Ok(Some(SceneInfo {
            path: payload.opt_string("path")?.filter(|p| !p.is_empty()),
            root_node_name,
            root_node_type: payload.string("root_node_type")?,
        }))
    }

    async fn get_selected_node(&self) -> Result<Option<NodeSummary>, ProviderError> {
        let result = self.call("get_selected_node", Map::new()).await?;
        let payload = Payload::new("get_selected_node", &result);
        if !payload.bool("selected")? {
            return Ok(None);
        }
        Ok(Some(NodeSummary {
            name: payload.string("name")?,
            node_type: payload.string("type")?,
            path: payload.string("path")?,
        }))
    }

    async fn update_2d_transform(&self, update: &Transform2DUpdate) -> Result<(), ProviderError> {
        self.call("update_2d_transform", update.to_params()).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.mux.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_editor, within, Reply};
    use crate::transport::MemoryTransport;
    use crate::scene::PropertyValue;

    fn provider_with(handler: impl Fn(&str, &Map<String, Value>) -> Reply + Send + 'static) -> RemoteProvider {
        let (ours, theirs) = MemoryTransport::pair();
        spawn_editor(theirs, handler);
        RemoteProvider::new(Arc::new(ours))
    }

    #[tokio::test]
    async fn test_create_node_returns_new_path() {
        let provider = provider_with(|command, params| {
            assert_eq!(command, "create_node");
            assert_eq!(params["parent_path"], "/root");
            Reply::Ok(json!({"node_path": "/root/Hi"}))
        });
        let path = within(provider.create_node("/root", "Label", "Hi")).await.unwrap();
        assert_eq!(path, "/root/Hi");
    }

    #[tokio::test]
    async fn test_missing_required_field_is_response_error() {
        let provider = provider_with(|_, _| Reply::Ok(json!({"path": "/root/Hi"})));
        let err = within(provider.create_node("/root", "Label", "Hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Response(_)));
    }

    #[tokio::test]
    async fn test_update_node_property_renders_parsed_value() {
        let provider = provider_with(|_, params| {
            assert_eq!(params["value"], "42");
            Reply::Ok(json!({"parsed_value": 42}))
        });
        let rendered = within(provider.update_node_property("/root/Label", "z_index", "42"))
            .await
            .unwrap();
        assert_eq!(rendered, "42");
    }

    #[tokio::test]
    async fn test_update_node_property_without_renderable_value_fails() {
        let provider = provider_with(|_, _| Reply::Ok(json!({"parsed_value": [1, 2]})));
        let err = within(provider.update_node_property("/root/Label", "z_index", "42"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Response(_)));
    }

    #[tokio::test]
    async fn test_get_node_properties_remote_error() {
        let provider = provider_with(|_, _| Reply::Err("No node found at '/root/Player'".into()));
        let err = within(provider.get_node_properties("/root/Player")).await.unwrap_err();
        assert_eq!(err, ProviderError::Remote("No node found at '/root/Player'".into()));
    }

    #[tokio::test]
    async fn test_get_node_properties_decodes_bag() {
        let provider = provider_with(|_, _| {
            Reply::Ok(json!({"properties": {"visible": true, "groups": [], "text": "Hi"}}))
        });
        let bag = within(provider.get_node_properties("/root/Label")).await.unwrap();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag["text"], PropertyValue::Text("Hi".into()));
    }

    #[tokio::test]
    async fn test_list_nodes_empty_and_incomplete_children() {
        let provider = provider_with(|_, params| match params["node_path"].as_str() {
            Some("/root/Empty") => Reply::Ok(json!({"children": []})),
            Some("/root/Broken") => Reply::Ok(json!({})),
            _ => Reply::Ok(json!({"children": [
                {"name": "A", "type": "Node", "path": "/root/A"},
                {"name": "B", "type": "Node"}
            ]})),
        });
        assert!(within(provider.list_nodes("/root/Empty")).await.unwrap().is_empty());
        assert!(matches!(
            within(provider.list_nodes("/root/Broken")).await,
            Err(ProviderError::Response(_))
        ));
        let children = within(provider.list_nodes("/root")).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path, "/root/A");
    }

    #[tokio::test]
    async fn test_create_script_sends_empty_node_path_when_unattached() {
        let provider = provider_with(|command, params| {
            assert_eq!(command, "create_script");
            assert_eq!(params["node_path"], "");
            Reply::Ok(json!({}))
        });
        within(provider.create_script("res://player.gd", "extends Node", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_execute_editor_script_skips_non_string_rows() {
        let provider = provider_with(|_, _| Reply::Ok(json!({"output": ["1", 2, "3"]})));
        let rows = within(provider.execute_editor_script("print(1)")).await.unwrap();
        assert_eq!(rows, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_current_scene_info_none_when_no_scene_open() {
        let provider = provider_with(|_, _| Reply::Ok(json!({"root_node_name": null})));
        assert_eq!(within(provider.get_current_scene_info()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_current_scene_info_decodes() {
        let provider = provider_with(|_, _| {
            Reply::Ok(json!({"path": "res://main.tscn", "root_node_name": "Main", "root_node_type": "Node2D"}))
        });
        let info = within(provider.get_current_scene_info()).await.unwrap().unwrap();
        assert_eq!(info.path.as_deref(), Some("res://main.tscn"));
        assert_eq!(info.root_node_type, "Node2D");
    }

    #[tokio::test]
    async fn test_selected_node_flag() {
        let provider = provider_with(|_, _| Reply::Ok(json!({"selected": false})));
        assert_eq!(within(provider.get_selected_node()).await.unwrap(), None);

        let provider = provider_with(|_, _| {
            Reply::Ok(json!({"selected": true, "name": "Player", "type": "Node2D", "path": "/root/Player"}))
        });
        let node = within(provider.get_selected_node()).await.unwrap().unwrap();
        assert_eq!(node.name, "Player");
    }

    #[tokio::test]
    async fn test_scene_tree_with_incomplete_root_fails() {
        let provider = provider_with(|_, _| Reply::Ok(json!({"name": "Main", "type": "Node2D"})));
        assert!(matches!(
            within(provider.get_scene_tree()).await,
            Err(ProviderError::Response(_))
        ));
    }

    #[tokio::test]
    async fn test_debug_output_requires_output_field() {
        let provider = provider_with(|_, _| Reply::Ok(json!({})));
        assert!(within(provider.get_debug_output()).await.is_err());
    }

    #[tokio::test]
    async fn test_update_2d_transform_params() {
        let provider = provider_with(|command, params| {
            assert_eq!(command, "update_2d_transform");
            assert_eq!(params["position"], json!([1.0, 2.0]));
            assert!(params.get("scale").is_none());
            Reply::Ok(json!({}))
        });
        let mut update = Transform2DUpdate::new("/root/Player");
        update.position = Some((1.0, 2.0));
        within(provider.update_2d_transform(&update)).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_the_link() {
        let provider = provider_with(|_, _| Reply::Ok(json!({"output": ""})));
        within(provider.get_debug_output()).await.unwrap();
        provider.shutdown().await;
        assert_eq!(
            within(provider.get_debug_output()).await,
            Err(ProviderError::ConnectionLost)
        );
    }
}
