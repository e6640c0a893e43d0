use iosans_workflow::{NodeKind, Workflow, is_resource_handle};

use crate::schema::{ToolSchema, schema_for};

/// A tool available to an agent: the node behind it plus its advertised
/// schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
  /// Invocation name the model uses in `Action:` lines.
  pub name: String,
  /// The workflow node executed when this tool is called.
  pub node_id: String,
  pub kind: NodeKind,
  pub schema: ToolSchema,
}

/// The invocation name for a tool node: `<type>_<id>` with dashes replaced
/// by underscores so the model can emit it as a single token.
pub fn tool_name(kind: NodeKind, node_id: &str) -> String {
  format!("{}_{}", kind, node_id.replace('-', "_"))
}

/// Discover the tools wired to an agent node.
///
/// A tool edge targets the agent on a resource-slot handle; its source node
/// is the tool. Edge order is preserved so prompts are stable.
pub fn discover_tools(workflow: &Workflow, agent_id: &str) -> Vec<Tool> {
  let mut tools = Vec::new();

  for edge in &workflow.edges {
    if edge.target != agent_id {
      continue;
    }
    let is_resource = edge
      .target_handle
      .as_deref()
      .is_some_and(is_resource_handle);
    if !is_resource {
      continue;
    }
    let Some(node) = workflow.get_node(&edge.source) else {
      continue;
    };
    if tools.iter().any(|t: &Tool| t.node_id == node.id) {
      continue;
    }

    let name = tool_name(node.kind, &node.id);
    tools.push(Tool {
      schema: schema_for(node.kind, &name),
      name,
      node_id: node.id.clone(),
      kind: node.kind,
    });
  }

  tools
}
