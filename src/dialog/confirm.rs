use crate::dialog::escape;
use crate::editor::effects::Request;
use crate::model::{Node, NodeId};

/// "Really delete?" gate in front of node deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteConfirmation {
    pub node: NodeId,
    pub name: String,
    pub disabled: bool,
    pub error: Option<String>,
}

impl DeleteConfirmation {
    pub fn new(node: &Node) -> Self {
        Self {
            node: node.id,
            name: node.name.clone(),
            disabled: false,
            error: None,
        }
    }

    pub fn confirm(&mut self) -> Option<Request> {
        if self.disabled {
            return None;
        }
        self.disabled = true;
        self.error = None;
        Some(Request::DeleteNode { node: self.node })
    }

    pub fn render_html(&self) -> String {
        let error = self
            .error
            .as_deref()
            .map(|e| format!("<p class=\"error\">{}</p>", escape(e)))
            .unwrap_or_default();
        format!(
            "<div class=\"confirm\"><p>Delete node \"{}\"?</p>{}<button{}>Delete</button><button>Cancel</button></div>",
            escape(&self.name),
            error,
            if self.disabled { " disabled" } else { "" }
        )
    }
}
