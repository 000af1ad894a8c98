pub mod effects;
pub mod session;

use thiserror::Error;
use tracing::{info, warn};
use crate::canvas::geometry::{CurveStyle, Point};
use crate::canvas::scene::Scene;
use crate::canvas::svg::render_svg;
use crate::dialog::{DeleteConfirmation, Dialog, FormError, NodeForm, SettingsForm};
use crate::interaction::{Button, Controller, Effect};
use crate::model::schema::StaticData;
use crate::model::settings::Settings;
use crate::model::{Connection, Node, NodeId, SlotKind};
use crate::state::{GraphState, MergeReport};
use self::effects::{Completion, Request};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("no node with id {0}")]
    UnknownNode(NodeId),
    #[error("unknown logic class `{0}`")]
    UnknownLogicClass(String),
    #[error("no dialog is open")]
    NoDialog,
    #[error(transparent)]
    Form(#[from] FormError),
}

/// All UI state of one editor page: reference data, the graph snapshots,
/// the pointer gesture, the drawn scene and the open dialog.
#[derive(Debug)]
pub struct Editor {
    static_data: StaticData,
    graph: GraphState,
    controller: Controller,
    scene: Scene,
    dialog: Option<Dialog>,
    settings: Settings,
    alert: Option<String>,
    renders: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(CurveStyle::default())
    }
}

impl Editor {
    pub fn new(style: CurveStyle) -> Self {
        Self {
            static_data: StaticData::default(),
            graph: GraphState::new(),
            controller: Controller::new(),
            scene: Scene::new(style),
            dialog: None,
            settings: Settings::default(),
            alert: None,
            renders: 0,
        }
    }

    pub fn install_static(&mut self, data: StaticData) {
        self.static_data = data;
    }

    pub fn static_data(&self) -> &StaticData {
        &self.static_data
    }

    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn set_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Rebuild the whole scene from the local snapshot and the current gesture.
    pub fn render(&mut self) {
        let pose = self.controller.pose();
        self.scene.rebuild(self.graph.local(), pose.as_ref());
        self.renders += 1;
    }

    pub fn render_svg(&self, width: f64, height: f64) -> String {
        render_svg(&self.scene, width, height)
    }

    /// Merge a fresh server snapshot, then redraw.
    pub fn apply_snapshot(&mut self, nodes: Vec<Node>, connections: Vec<Connection>) -> MergeReport {
        let report = self.graph.merge(nodes, connections);
        self.render();
        report
    }

    pub fn pointer_down(&mut self, point: Point, button: Button) -> Vec<Request> {
        let effects = self.controller.pointer_down(&mut self.graph, point, button);
        self.apply_effects(effects)
    }

    pub fn press_node(&mut self, node: NodeId, point: Point, button: Button) -> Vec<Request> {
        let effects = self.controller.press_node(&mut self.graph, node, point, button);
        self.apply_effects(effects)
    }

    pub fn press_anchor(&mut self, node: NodeId, kind: SlotKind, slot: &str, point: Point, button: Button) -> Vec<Request> {
        let effects = self.controller.press_anchor(&mut self.graph, node, kind, slot, point, button);
        self.apply_effects(effects)
    }

    pub fn pointer_move(&mut self, point: Point) -> Vec<Request> {
        let effects = self.controller.pointer_move(&mut self.graph, point);
        self.apply_effects(effects)
    }

    pub fn pointer_up(&mut self, point: Point, button: Button) -> Vec<Request> {
        let effects = self.controller.pointer_up(&mut self.graph, point, button);
        self.apply_effects(effects)
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> Vec<Request> {
        let mut redraw = false;
        let mut requests = Vec::new();
        for effect in effects {
            match effect {
                Effect::Redraw => redraw = true,
                Effect::OpenEditor(node) => {
                    if let Err(e) = self.open_edit_dialog(node) {
                        warn!(node_id = node, error = %e, "Cannot open node editor");
                    }
                }
                Effect::Request(request) => requests.push(request),
            }
        }
        if redraw {
            self.render();
        }
        requests
    }

    pub fn open_edit_dialog(&mut self, node: NodeId) -> Result<(), EditorError> {
        let node = self
            .graph
            .local()
            .nodes
            .get(&node)
            .ok_or(EditorError::UnknownNode(node))?;
        let logic = self
            .static_data
            .logics
            .get(&node.logic_class)
            .ok_or_else(|| EditorError::UnknownLogicClass(node.logic_class.clone()))?;
        self.dialog = Some(Dialog::Node(NodeForm::edit(node, logic)));
        Ok(())
    }

    pub fn open_create_dialog(&mut self, logic_class: &str, at: Point) -> Result<(), EditorError> {
        let logic = self
            .static_data
            .logics
            .get(logic_class)
            .ok_or_else(|| EditorError::UnknownLogicClass(logic_class.to_string()))?;
        self.dialog = Some(Dialog::Node(NodeForm::create(logic_class, logic, at)));
        Ok(())
    }

    pub fn open_settings_dialog(&mut self) {
        self.dialog = Some(Dialog::Settings(SettingsForm::new(&self.static_data, &self.settings)));
    }

    pub fn request_delete(&mut self, node: NodeId) -> Result<(), EditorError> {
        let node = self
            .graph
            .local()
            .nodes
            .get(&node)
            .ok_or(EditorError::UnknownNode(node))?;
        self.dialog = Some(Dialog::ConfirmDelete(DeleteConfirmation::new(node)));
        Ok(())
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    /// Type into the open dialog. For the settings dialog the keys are
    /// `countrycode` and `timezone`.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), EditorError> {
        match self.dialog.as_mut().ok_or(EditorError::NoDialog)? {
            Dialog::Node(form) => form.set_value(key, value)?,
            Dialog::Settings(form) => match key {
                "countrycode" => form.select_country(&self.static_data, value)?,
                "timezone" => form.select_timezone(value)?,
                other => return Err(FormError::UnknownField(other.to_string()).into()),
            },
            Dialog::ConfirmDelete(_) => return Err(FormError::UnknownField(key.to_string()).into()),
        }
        Ok(())
    }

    pub fn submit_dialog(&mut self) -> Result<Request, EditorError> {
        let request = match self.dialog.as_mut().ok_or(EditorError::NoDialog)? {
            Dialog::Node(form) => form.begin_submit()?,
            Dialog::Settings(form) => form.begin_submit()?,
            Dialog::ConfirmDelete(confirm) => confirm.confirm().ok_or(FormError::Disabled)?,
        };
        if let Request::UpdateNode { node, .. } = &request {
            self.graph.pin_node(*node);
        }
        Ok(request)
    }

    pub fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::NodeMoved { node, result } => {
                self.graph.release_node(node);
                if let Err(e) = result {
                    warn!(node_id = node, error = %e, "Saving node position failed");
                    self.graph.revert_node(node);
                }
            }
            Completion::NodeCreated { result } => match result {
                Ok(node) => {
                    info!(node_id = node.id, name = %node.name, "Node created");
                    self.graph.upsert_node(node);
                    self.close_node_form();
                }
                Err(e) => self.fail_node_form(&e),
            },
            Completion::NodeUpdated { node, result } => {
                self.graph.release_node(node);
                match result {
                    Ok(updated) => {
                        self.graph.upsert_node(updated);
                        self.close_node_form();
                    }
                    Err(e) => self.fail_node_form(&e),
                }
            }
            Completion::NodeDeleted { node, result } => match result {
                Ok(()) => {
                    info!(node_id = node, "Node deleted");
                    self.graph.remove_node(node);
                    if matches!(&self.dialog, Some(Dialog::ConfirmDelete(c)) if c.node == node) {
                        self.dialog = None;
                    }
                }
                Err(e) => {
                    warn!(node_id = node, error = %e, "Deleting node failed");
                    if let Some(Dialog::ConfirmDelete(c)) = &mut self.dialog {
                        c.disabled = false;
                        c.error = Some(e.to_string());
                    }
                }
            },
            Completion::ConnectionCreated { ticket, result } => {
                let effects = self.controller.connection_created(&mut self.graph, ticket, result);
                self.apply_effects(effects);
                return;
            }
            Completion::ConnectionReattached { connection, result } => {
                self.graph.release_connection(connection);
                match result {
                    Ok(c) => self.graph.upsert_connection(c),
                    Err(e) => warn!(connection_id = connection, error = %e, "Reattaching connection failed"),
                }
            }
            Completion::ConnectionDeleted { connection, result } => {
                self.graph.release_connection(connection);
                if let Err(e) = result {
                    warn!(connection_id = connection, error = %e, "Deleting connection failed");
                }
            }
            Completion::SettingsSaved { settings, result } => match result {
                Ok(()) => {
                    info!(?settings, "Settings saved");
                    self.settings = settings;
                    if matches!(self.dialog, Some(Dialog::Settings(_))) {
                        self.dialog = None;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Saving settings failed");
                    if let Some(Dialog::Settings(form)) = &mut self.dialog {
                        form.fail(&e);
                    }
                }
            },
        }
        self.render();
    }

    fn close_node_form(&mut self) {
        if matches!(self.dialog, Some(Dialog::Node(_))) {
            self.dialog = None;
        }
    }

    fn fail_node_form(&mut self, error: &crate::api::ApiError) {
        warn!(error = %error, "Saving node failed");
        if let Some(Dialog::Node(form)) = &mut self.dialog {
            form.fail(error);
        }
    }
}
