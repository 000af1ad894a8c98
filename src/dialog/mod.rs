pub mod confirm;
pub mod node_form;
pub mod settings_form;

use thiserror::Error;

pub use confirm::DeleteConfirmation;
pub use node_form::{FormField, FormMode, InputKind, NodeForm};
pub use settings_form::SettingsForm;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("form is waiting for the server")]
    Disabled,
    #[error("no field named `{0}`")]
    UnknownField(String),
    #[error("`{0}` is not one of the choices")]
    UnknownChoice(String),
    #[error("some fields are invalid")]
    Invalid,
}

/// The dialog currently shown over the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    Node(NodeForm),
    Settings(SettingsForm),
    ConfirmDelete(DeleteConfirmation),
}

impl Dialog {
    pub fn render_html(&self) -> String {
        match self {
            Dialog::Node(form) => form.render_html(),
            Dialog::Settings(form) => form.render_html(),
            Dialog::ConfirmDelete(confirm) => confirm.render_html(),
        }
    }
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
