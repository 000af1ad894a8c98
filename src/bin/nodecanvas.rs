use clap::{Parser, Subcommand};
use nodecanvas::canvas::geometry::{anchor_position, Point};
use nodecanvas::config::{load_config_from_yaml, EditorConfig};
use nodecanvas::editor::effects::Request;
use nodecanvas::editor::session::{Session, StartupError, UiEvent};
use nodecanvas::interaction::Button;
use nodecanvas::model::settings::Settings;
use nodecanvas::model::{End, NodeId, SlotKind};
use nodecanvas::sync::SyncClient;
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber;
use std::fs;

#[derive(Parser)]
#[command(author, version, about = "Headless client for the node graph editor", long_about = None)]
struct Cli {
    /// Path to an editor config YAML file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// CSRF token sent on writes
    #[arg(long, global = true)]
    csrf_token: Option<String>,

    /// Raw Cookie header carrying the session
    #[arg(long, global = true)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the graph once and render it as SVG
    Snapshot {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Keep polling and rewrite the SVG after every redraw until Ctrl-C
    Watch {
        #[arg(long, short)]
        out: PathBuf,
    },

    /// List the available logic classes and their settings fields
    Logics,

    /// Show or change the country/timezone settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Drag a node to a new position
    Move {
        #[arg(long)]
        node: NodeId,

        /// Target position as x,y
        #[arg(long, value_parser = parse_point)]
        to: Point,
    },

    /// Connect an output slot to an input slot
    Connect {
        /// Source as node:slot
        #[arg(long, value_parser = parse_slot)]
        from: (NodeId, String),

        /// Destination as node:slot
        #[arg(long, value_parser = parse_slot)]
        to: (NodeId, String),
    },

    /// Create a node through the node dialog
    CreateNode {
        #[arg(long)]
        logic: String,

        #[arg(long)]
        name: String,

        #[arg(long, value_parser = parse_point, default_value = "0,0")]
        at: Point,

        /// Settings fields (key=value)
        #[arg(long = "setting", short = 'S', value_parser = parse_key_val)]
        settings: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        country: String,

        #[arg(long)]
        timezone: Option<String>,
    },
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("invalid x,y: no `,` found in `{}`", s))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("invalid x in `{}`", s))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("invalid y in `{}`", s))?;
    Ok(Point::new(x, y))
}

fn parse_slot(s: &str) -> Result<(NodeId, String), String> {
    let (node, slot) = s.split_once(':').ok_or_else(|| format!("invalid node:slot: no `:` found in `{}`", s))?;
    let node: NodeId = node.parse().map_err(|_| format!("invalid node id in `{}`", s))?;
    Ok((node, slot.to_string()))
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn resolve_config(cli: &Cli) -> Result<EditorConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_yaml(path)?,
        None => EditorConfig::default(),
    };
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(token) = &cli.csrf_token {
        config.csrf_token = Some(token.clone());
    }
    if let Some(cookie) = &cli.cookie {
        config.session_cookie = Some(cookie.clone());
    }
    Ok(config)
}

fn write_svg(out: Option<&PathBuf>, svg: &str) -> Result<()> {
    match out {
        Some(path) => fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", svg);
            Ok(())
        }
    }
}

/// Perform the requests and fail if the editor was left with an error to show.
async fn submit(session: &mut Session, requests: Vec<Request>) -> Result<()> {
    if requests.is_empty() {
        bail!("nothing to send");
    }
    session.perform_now(requests).await;
    if let Some(html) = session.editor().dialog().map(|d| d.render_html()) {
        bail!("server rejected the change: {}", html);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let api = Arc::new(config.build_api()?);
    let sync = SyncClient::new(api);
    let mut session = Session::new(sync, config.canvas.curve).with_poll_interval(config.poll_interval());
    match session.start().await {
        Ok(()) => {}
        // Watching keeps polling, so a later tick can still load the graph.
        Err(StartupError::Graph(e)) if matches!(cli.command, Commands::Watch { .. }) => {
            warn!(error = %e, "Initial graph fetch failed, polling continues");
        }
        Err(e) => return Err(e.into()),
    }
    if let Some(alert) = session.editor().alert() {
        warn!(alert, "Editor started with an alert");
    }
    let (width, height) = (config.canvas.width, config.canvas.height);

    match cli.command {
        Commands::Snapshot { out } => {
            write_svg(out.as_ref(), &session.editor().render_svg(width, height))?;
        }
        Commands::Watch { out } => {
            let (tx, rx) = mpsc::channel::<UiEvent>(16);
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Cannot listen for Ctrl-C");
                }
                drop(tx);
            });
            info!(path = %out.display(), "Watching graph");
            session
                .run(rx, |editor| {
                    if let Err(e) = fs::write(&out, editor.render_svg(width, height)) {
                        warn!(error = %e, "Failed to write SVG");
                    }
                })
                .await;
        }
        Commands::Logics => {
            for (key, logic) in &session.editor().static_data().logics {
                println!("{}  {}", key, logic.name);
                for (field, descriptor) in &logic.settings_fields {
                    println!("    {}: {} ({:?})", field, descriptor.label, descriptor.kind);
                }
            }
        }
        Commands::Settings { action: SettingsAction::Show } => {
            let settings = session.editor().settings();
            println!("country:  {}", settings.country_code.as_deref().unwrap_or("-"));
            println!("timezone: {}", settings.timezone.as_deref().unwrap_or("-"));
        }
        Commands::Settings { action: SettingsAction::Set { country, timezone } } => {
            let mut requests = session.handle_event(UiEvent::OpenSettings);
            requests.extend(session.handle_event(UiEvent::SetField { key: "countrycode".into(), value: country }));
            if let Some(tz) = timezone {
                requests.extend(session.handle_event(UiEvent::SetField { key: "timezone".into(), value: tz }));
            }
            requests.extend(session.handle_event(UiEvent::SubmitDialog));
            submit(&mut session, requests).await?;
            let Settings { country_code, timezone } = session.editor().settings();
            info!(?country_code, ?timezone, "Settings saved");
        }
        Commands::Move { node, to } => {
            let current = session
                .editor()
                .graph()
                .local()
                .nodes
                .get(&node)
                .map(|n| Point::new(n.pos_x, n.pos_y))
                .ok_or_else(|| anyhow!("no node with id {}", node))?;
            let grab = current.offset(100.0, 8.0);
            let drop = to.offset(100.0, 8.0);
            let mut requests = session.editor_mut().press_node(node, grab, Button::Left);
            requests.extend(session.handle_event(UiEvent::PointerMove { point: drop }));
            requests.extend(session.handle_event(UiEvent::PointerUp { point: drop, button: Button::Left }));
            submit(&mut session, requests).await?;
            info!(node_id = node, x = to.x, y = to.y, "Node moved");
        }
        Commands::Connect { from, to } => {
            let graph = session.editor().graph().local();
            if graph.connection_at(End::Dest, to.0, &to.1).is_some() {
                bail!("input `{}` of node {} is already connected", to.1, to.0);
            }
            // Drag from the free input back to the output so an existing
            // connection on the output is not picked up.
            let start = anchor_position(graph, to.0, SlotKind::Input, &to.1)
                .ok_or_else(|| anyhow!("node {} has no input `{}`", to.0, to.1))?;
            let end = anchor_position(graph, from.0, SlotKind::Output, &from.1)
                .ok_or_else(|| anyhow!("node {} has no output `{}`", from.0, from.1))?;
            let mut requests = session.editor_mut().press_anchor(to.0, SlotKind::Input, &to.1, start, Button::Left);
            requests.extend(session.handle_event(UiEvent::PointerMove { point: end }));
            requests.extend(session.handle_event(UiEvent::PointerUp { point: end, button: Button::Left }));
            submit(&mut session, requests).await?;
            if session.editor().controller().is_waiting() {
                bail!("connection was not confirmed");
            }
        }
        Commands::CreateNode { logic, name, at, settings } => {
            let mut requests = session.handle_event(UiEvent::OpenCreateDialog { logic_class: logic.clone(), at });
            if session.editor().dialog().is_none() {
                bail!("unknown logic class `{}`", logic);
            }
            requests.extend(session.handle_event(UiEvent::SetField { key: "name".into(), value: name }));
            for (key, value) in settings {
                requests.extend(session.handle_event(UiEvent::SetField { key, value }));
            }
            requests.extend(session.handle_event(UiEvent::SubmitDialog));
            submit(&mut session, requests).await?;
        }
    }

    Ok(())
}
