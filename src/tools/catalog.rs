//! The Godot tool catalog.
//!
//! Each tool is a plain `async fn(Arguments, Arc<dyn EditorProvider>)`;
//! [`all`] pairs it with its schema and annotations. Arguments are
//! validated up front, so a missing field never reaches the editor.

use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};

use super::{canonical_json, Arguments, ToolAnnotations, ToolDescriptor, ToolError, ToolFuture};
use crate::provider::EditorProvider;
use crate::scene::Transform2DUpdate;

type ToolOutcome = Result<String, ToolError>;

fn tool<F, Fut>(
    name: &'static str,
    description: &'static str,
    input_schema: Value,
    annotations: ToolAnnotations,
    f: F,
) -> ToolDescriptor
where
    F: Fn(Arguments, Arc<dyn EditorProvider>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolOutcome> + Send + 'static,
{
    ToolDescriptor {
        name,
        description,
        input_schema,
        annotations,
        handler: Arc::new(
            move |args: Arguments, provider: Arc<dyn EditorProvider>| -> ToolFuture {
                Box::pin(f(args, provider))
            },
        ),
    }
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn string_arg(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn vector_arg(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "number" },
        "minItems": 2,
        "maxItems": 2,
        "description": description,
    })
}

fn hints(title: &str, read_only: bool, destructive: bool, idempotent: bool) -> ToolAnnotations {
    ToolAnnotations {
        title: title.to_string(),
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: true,
    }
}

/// Every tool, in listing order.
pub fn all() -> Vec<ToolDescriptor> {
    vec![
        tool(
            "create_node",
            "Creates a new node in the current Godot scene",
            schema(
                json!({
                    "parent_path": string_arg("Path to the parent node where the new node will be created (e.g. '/root', '/root/MainScene')"),
                    "node_type": string_arg("Type of node to create (e.g. 'Node2D', 'Sprite2D', 'Label')"),
                    "node_name": string_arg("Name of the new node"),
                }),
                &["parent_path", "node_type", "node_name"],
            ),
            hints("Create node", false, true, false),
            create_node,
        ),
        tool(
            "delete_node",
            "Deletes a node in the current Godot scene",
            schema(
                json!({ "node_path": string_arg("Path to the node to delete (e.g. '/root/MainScene/Player')") }),
                &["node_path"],
            ),
            hints("Delete node", false, true, false),
            delete_node,
        ),
        tool(
            "update_node_property",
            "Updates a property of a node in the Godot scene tree",
            schema(
                json!({
                    "node_path": string_arg("Path of the node to update (e.g. '/root', '/root/MainScene/Player')"),
                    "property": string_arg("Name of the property to update (e.g. 'position', 'scale', 'text', 'modulate')"),
                    "value": { "description": "New value for the property" },
                }),
                &["node_path", "property", "value"],
            ),
            hints("Update node property", false, true, false),
            update_node_property,
        ),
        tool(
            "get_node_properties",
            "Gets all properties of a node in the Godot scene tree",
            schema(
                json!({ "node_path": string_arg("Path to the node to inspect (e.g. '/root/MainScene/Player')") }),
                &["node_path"],
            ),
            hints("Get node properties", true, false, true),
            get_node_properties,
        ),
        tool(
            "list_nodes",
            "Lists all child nodes under a parent node in the Godot scene tree",
            schema(
                json!({ "parent_path": string_arg("Path to the parent node (e.g. '/root', '/root/MainScene')") }),
                &["parent_path"],
            ),
            hints("List child nodes", true, false, true),
            list_nodes,
        ),
        tool(
            "create_script",
            "Creates a GDScript file, optionally attaching it to a node",
            schema(
                json!({
                    "script_path": string_arg("Resource path of the new script (e.g. 'res://scripts/player.gd')"),
                    "content": string_arg("Full source of the script"),
                    "node_path": string_arg("Node to attach the script to"),
                }),
                &["script_path", "content"],
            ),
            hints("Create script", false, true, false),
            create_script,
        ),
        tool(
            "edit_script",
            "Replaces the content of an existing GDScript file",
            schema(
                json!({
                    "script_path": string_arg("Resource path of the script to edit"),
                    "content": string_arg("New full source of the script"),
                }),
                &["script_path", "content"],
            ),
            hints("Edit script", false, true, true),
            edit_script,
        ),
        tool(
            "get_script",
            "Gets the source of a script by path or by the node it is attached to",
            schema(
                json!({
                    "script_path": string_arg("Resource path of the script"),
                    "node_path": string_arg("Node whose attached script to read"),
                }),
                &[],
            ),
            hints("Get script", true, false, true),
            get_script,
        ),
        tool(
            "list_assets_by_type",
            "Lists project assets of a given type (e.g. 'images', 'audio', 'scenes', 'scripts')",
            schema(
                json!({ "type": string_arg("Asset type to list") }),
                &["type"],
            ),
            hints("List assets by type", true, false, true),
            list_assets_by_type,
        ),
        tool(
            "list_project_files",
            "Lists project files, optionally filtered by extension",
            schema(
                json!({
                    "extensions": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "File extensions to include, without the dot (e.g. ['gd', 'tscn'])",
                    },
                }),
                &[],
            ),
            hints("List project files", true, false, true),
            list_project_files,
        ),
        tool(
            "execute_editor_script",
            "Executes GDScript code in the editor and returns its printed output",
            schema(
                json!({ "code": string_arg("GDScript code to execute") }),
                &["code"],
            ),
            hints("Execute editor script", false, true, false),
            execute_editor_script,
        ),
        tool(
            "get_full_scene_tree",
            "Gets the full node tree of the scene being edited",
            schema(json!({}), &[]),
            hints("Get full scene tree", true, false, true),
            get_full_scene_tree,
        ),
        tool(
            "get_debug_output",
            "Gets the editor's debug output log",
            schema(json!({}), &[]),
            hints("Get debug output", true, false, true),
            get_debug_output,
        ),
        tool(
            "get_current_scene_structure",
            "Gets the path and root node of the scene currently open in the editor",
            schema(json!({}), &[]),
            hints("Get current scene", true, false, true),
            get_current_scene_structure,
        ),
        tool(
            "update_2dnode_transform",
            "Updates position, rotation, and/or scale of a 2D node",
            schema(
                json!({
                    "node_path": string_arg("Path of the Node2D to update"),
                    "position": vector_arg("New position as [x, y]"),
                    "rotation": { "type": "number", "description": "New rotation in radians" },
                    "scale": vector_arg("New scale as [x, y]"),
                }),
                &["node_path"],
            ),
            hints("Update 2D transform", false, true, true),
            update_2dnode_transform,
        ),
    ]
}

async fn create_node(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let parent_path = args.required_str("parent_path")?;
    let node_type = args.required_str("node_type")?;
    let node_name = args.required_str("node_name")?;
    let path = provider
        .create_node(&parent_path, &node_type, &node_name)
        .await?;
    Ok(format!("Created {node_type} named {node_name} at {path}"))
}

async fn delete_node(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let node_path = args.required_str("node_path")?;
    let deleted = provider.delete_node(&node_path).await?;
    Ok(format!("Deleted node at '{deleted}'"))
}

async fn update_node_property(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let node_path = args.required_str("node_path")?;
    let property = args.required_str("property")?;
    let value = args.required_value_text("value")?;
    let parsed = provider
        .update_node_property(&node_path, &property, &value)
        .await?;
    Ok(format!(
        "Updated property '{property}' of node '{node_path}' to '{parsed}'"
    ))
}

async fn get_node_properties(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let node_path = args.required_str("node_path")?;
    let properties = provider.get_node_properties(&node_path).await?;
    if properties.is_empty() {
        return Ok(format!("The node at '{node_path}' has no readable properties."));
    }
    let lines: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    Ok(format!(
        "Properties of node at '{node_path}':\n\n{}",
        lines.join("\n")
    ))
}

async fn list_nodes(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let parent_path = args.required_str("parent_path")?;
    let children = provider.list_nodes(&parent_path).await?;
    if children.is_empty() {
        return Ok(format!(
            "The node at '{parent_path}' does not have any children nodes."
        ));
    }
    let lines: Vec<String> = children.iter().map(ToString::to_string).collect();
    Ok(format!(
        "Children nodes of node at '{parent_path}':\n\n{}",
        lines.join("\n")
    ))
}

async fn create_script(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let script_path = args.required_str("script_path")?;
    let content = args.required_str("content")?;
    let node_path = args.optional_str("node_path")?;
    provider
        .create_script(&script_path, &content, node_path.as_deref())
        .await?;
    Ok(match node_path {
        Some(node) => format!("Created script at '{script_path}' and attached it to '{node}'"),
        None => format!("Created script at '{script_path}'"),
    })
}

async fn edit_script(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let script_path = args.required_str("script_path")?;
    let content = args.required_str("content")?;
    provider.edit_script(&script_path, &content).await?;
    Ok(format!("Updated script at '{script_path}'"))
}

async fn get_script(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let script_path = args.optional_str("script_path")?;
    let node_path = args.optional_str("node_path")?;
    if script_path.is_none() && node_path.is_none() {
        return Err(ToolError::InvalidParams(
            "Either 'script_path' or 'node_path' is required".to_string(),
        ));
    }
    Ok(provider
        .get_script(script_path.as_deref(), node_path.as_deref())
        .await?)
}

async fn list_assets_by_type(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let asset_type = args.required_str("type")?;
    let files = provider.list_assets(&asset_type).await?;
    canonical_json(&json!({ "type": asset_type, "files": files }))
}

async fn list_project_files(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let extensions = args.optional_string_list("extensions")?.unwrap_or_default();
    let files = provider.list_project_files(&extensions).await?;
    canonical_json(&json!({ "extensions": extensions, "files": files }))
}

async fn execute_editor_script(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let code = args.required_str("code")?;
    let output = provider.execute_editor_script(&code).await?;
    canonical_json(&json!({ "output": output }))
}

async fn get_full_scene_tree(_args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let tree = provider.get_scene_tree().await?;
    canonical_json(&tree)
}

async fn get_debug_output(_args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    Ok(provider.get_debug_output().await?)
}

async fn get_current_scene_structure(
    _args: Arguments,
    provider: Arc<dyn EditorProvider>,
) -> ToolOutcome {
    match provider.get_current_scene_info().await? {
        Some(info) => canonical_json(&info),
        None => Ok("No scene is currently open in the editor.".to_string()),
    }
}

async fn update_2dnode_transform(args: Arguments, provider: Arc<dyn EditorProvider>) -> ToolOutcome {
    let mut update = Transform2DUpdate::new(args.required_str("node_path")?);
    update.position = args.optional_vector2("position")?;
    update.rotation = args.optional_number("rotation")?;
    update.scale = args.optional_vector2("scale")?;
    if update.is_empty() {
        return Err(ToolError::InvalidParams(
            "At least one of 'position', 'rotation' or 'scale' is required".to_string(),
        ));
    }
    provider.update_2d_transform(&update).await?;
    Ok(format!("Updated transform of node '{}'", update.node_path))
}
