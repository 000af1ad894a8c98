use tracing::debug;
use uuid::Uuid;
use crate::api::ApiResult;
use crate::model::settings::Settings;
use crate::model::{
    Connection, ConnectionId, ConnectionPatch, NewConnection, NewNode, Node, NodeId, NodePatch,
};
use crate::sync::SyncClient;

/// A backend call the editor wants made.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    MoveNode { node: NodeId, x: f64, y: f64 },
    CreateNode(NewNode),
    UpdateNode { node: NodeId, patch: NodePatch },
    DeleteNode { node: NodeId },
    CreateConnection { ticket: Uuid, connection: NewConnection },
    ReattachConnection { connection: ConnectionId, patch: ConnectionPatch },
    DeleteConnection { connection: ConnectionId },
    SaveSettings(Settings),
}

/// The outcome of a [`Request`], fed back into the editor.
#[derive(Debug)]
pub enum Completion {
    NodeMoved { node: NodeId, result: ApiResult<Node> },
    NodeCreated { result: ApiResult<Node> },
    NodeUpdated { node: NodeId, result: ApiResult<Node> },
    NodeDeleted { node: NodeId, result: ApiResult<()> },
    ConnectionCreated { ticket: Uuid, result: ApiResult<Connection> },
    ConnectionReattached { connection: ConnectionId, result: ApiResult<Connection> },
    ConnectionDeleted { connection: ConnectionId, result: ApiResult<()> },
    SettingsSaved { settings: Settings, result: ApiResult<()> },
}

pub async fn perform(sync: &SyncClient, request: Request) -> Completion {
    debug!(?request, "Performing request");
    let api = sync.api();
    match request {
        Request::MoveNode { node, x, y } => Completion::NodeMoved {
            node,
            result: api.update_node(node, &NodePatch::position(x, y)).await,
        },
        Request::CreateNode(new_node) => Completion::NodeCreated {
            result: api.create_node(&new_node).await,
        },
        Request::UpdateNode { node, patch } => Completion::NodeUpdated {
            node,
            result: api.update_node(node, &patch).await,
        },
        Request::DeleteNode { node } => Completion::NodeDeleted {
            node,
            result: api.delete_node(node).await,
        },
        Request::CreateConnection { ticket, connection } => Completion::ConnectionCreated {
            ticket,
            result: api.create_connection(&connection).await,
        },
        Request::ReattachConnection { connection, patch } => Completion::ConnectionReattached {
            connection,
            result: api.update_connection(connection, &patch).await,
        },
        Request::DeleteConnection { connection } => Completion::ConnectionDeleted {
            connection,
            result: api.delete_connection(connection).await,
        },
        Request::SaveSettings(settings) => {
            let result = sync.save_settings(&settings).await;
            Completion::SettingsSaved { settings, result }
        }
    }
}
