use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use crate::api::ApiError;
use crate::canvas::geometry::{CurveStyle, Point};
use crate::editor::effects::{perform, Completion, Request};
use crate::editor::{Editor, EditorError};
use crate::interaction::Button;
use crate::model::NodeId;
use crate::sync::SyncClient;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not load reference data: {0}")]
    StaticData(#[source] ApiError),
    #[error("could not load the node graph: {0}")]
    Graph(#[source] ApiError),
}

/// Input from the hosting page.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    PointerDown { point: Point, button: Button },
    PointerMove { point: Point },
    PointerUp { point: Point, button: Button },
    OpenCreateDialog { logic_class: String, at: Point },
    OpenEditDialog { node: NodeId },
    OpenSettings,
    RequestDelete { node: NodeId },
    SetField { key: String, value: String },
    SubmitDialog,
    CloseDialog,
}

/// An editor wired to a backend: startup sequencing, polling and the event loop.
pub struct Session {
    editor: Editor,
    sync: SyncClient,
    poll_interval: Duration,
}

impl Session {
    pub fn new(sync: SyncClient, style: CurveStyle) -> Self {
        Self {
            editor: Editor::new(style),
            sync,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn sync(&self) -> &SyncClient {
        &self.sync
    }

    /// Reference data, then the graph, then settings.
    ///
    /// Failing to load reference data aborts startup and leaves the reason
    /// in the alert. A failed graph fetch raises the alert too, but settings
    /// are still read and `StartupError::Graph` is returned only at the end:
    /// the session is usable and polling can fill the graph later. A settings
    /// read failure only raises the alert.
    pub async fn start(&mut self) -> Result<(), StartupError> {
        let data = match self.sync.fetch_static().await {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "Loading reference data failed");
                self.editor.set_alert(format!("Could not load reference data: {}", e));
                return Err(StartupError::StaticData(e));
            }
        };
        self.editor.install_static(data);

        let graph_error = match self.sync.fetch_graph().await {
            Ok((nodes, connections)) => {
                let report = self.editor.apply_snapshot(nodes, connections);
                info!(nodes = self.editor.graph().local().nodes.len(), inserted = report.inserted, "Initial graph loaded");
                None
            }
            Err(e) => {
                error!(error = %e, "Initial graph fetch failed");
                self.editor.set_alert(format!("Could not load the node graph: {}", e));
                Some(e)
            }
        };

        match self.sync.fetch_settings().await {
            Ok(settings) => self.editor.set_settings(settings),
            Err(e) => {
                warn!(error = %e, "Reading settings failed");
                if graph_error.is_none() {
                    self.editor.set_alert(format!("Could not load settings: {}", e));
                }
            }
        }

        match graph_error {
            Some(e) => Err(StartupError::Graph(e)),
            None => Ok(()),
        }
    }

    /// One poll cycle. Failures are logged and otherwise ignored.
    pub async fn poll_once(&mut self) -> bool {
        match self.sync.fetch_graph().await {
            Ok((nodes, connections)) => {
                let report = self.editor.apply_snapshot(nodes, connections);
                if !report.is_empty() {
                    debug!(?report, "Poll applied server changes");
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "Poll failed, retrying on next tick");
                false
            }
        }
    }

    /// Feed one UI event to the editor and return the requests it produced.
    pub fn handle_event(&mut self, event: UiEvent) -> Vec<Request> {
        let result: Result<Vec<Request>, EditorError> = match event {
            UiEvent::PointerDown { point, button } => Ok(self.editor.pointer_down(point, button)),
            UiEvent::PointerMove { point } => Ok(self.editor.pointer_move(point)),
            UiEvent::PointerUp { point, button } => Ok(self.editor.pointer_up(point, button)),
            UiEvent::OpenCreateDialog { logic_class, at } => {
                self.editor.open_create_dialog(&logic_class, at).map(|_| Vec::new())
            }
            UiEvent::OpenEditDialog { node } => self.editor.open_edit_dialog(node).map(|_| Vec::new()),
            UiEvent::OpenSettings => {
                self.editor.open_settings_dialog();
                Ok(Vec::new())
            }
            UiEvent::RequestDelete { node } => self.editor.request_delete(node).map(|_| Vec::new()),
            UiEvent::SetField { key, value } => self.editor.set_field(&key, &value).map(|_| Vec::new()),
            UiEvent::SubmitDialog => self.editor.submit_dialog().map(|r| vec![r]),
            UiEvent::CloseDialog => {
                self.editor.close_dialog();
                Ok(Vec::new())
            }
        };
        result.unwrap_or_else(|e| {
            warn!(error = %e, "UI event rejected");
            Vec::new()
        })
    }

    /// Run requests one after another and apply each result before the next.
    pub async fn perform_now(&mut self, requests: Vec<Request>) {
        for request in requests {
            let completion = perform(&self.sync, request).await;
            self.editor.complete(completion);
        }
    }

    fn spawn_request(&self, request: Request, done: mpsc::Sender<Completion>) {
        let sync = self.sync.clone();
        tokio::spawn(async move {
            let completion = perform(&sync, request).await;
            if done.send(completion).await.is_err() {
                debug!("Session ended before request completed");
            }
        });
    }

    /// Event loop: poll ticks, UI events and request completions, one at a
    /// time. `on_render` runs after every redraw. Returns when the event
    /// channel closes.
    pub async fn run<F>(mut self, mut events: mpsc::Receiver<UiEvent>, mut on_render: F) -> Editor
    where
        F: FnMut(&Editor),
    {
        let (done_tx, mut done_rx) = mpsc::channel::<Completion>(64);
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut drawn = self.editor.render_count();
        on_render(&self.editor);

        info!(interval = ?self.poll_interval, "Polling started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        for request in self.handle_event(event) {
                            self.spawn_request(request, done_tx.clone());
                        }
                    }
                    None => break,
                },
                Some(completion) = done_rx.recv() => {
                    self.editor.complete(completion);
                }
            }
            if self.editor.render_count() != drawn {
                drawn = self.editor.render_count();
                on_render(&self.editor);
            }
        }
        info!("Session closed");
        self.editor
    }
}
