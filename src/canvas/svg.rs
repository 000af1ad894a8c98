use ::svg::Document;
use ::svg::node::element::{Circle, Group, Path, Rectangle, Style, Text};
use crate::canvas::geometry::{
    NAME_BASELINE, NODE_CORNER_RADIUS, NODE_HEIGHT, NODE_WIDTH, SLOT_DOT_RADIUS,
    SLOT_LABEL_BASELINE, SLOT_LABEL_INSET,
};
use crate::canvas::scene::{NodeGroup, Scene};

const STYLESHEET: &str = "\
.node_name { font: bold 16px arial; cursor: grab; pointer-events: none; }
.input_output_name { font: bold 12px arial; pointer-events: none; }
.node_rectangle { fill: #eee; stroke: #333; stroke-width: 2; cursor: grab; }
.input_output_dot { fill: #fff; stroke: #333; stroke-width: 2; }
";

/// Serialize a scene as a standalone SVG document.
pub fn render_svg(scene: &Scene, width: f64, height: f64) -> String {
    let mut document = Document::new()
        .set("id", "nodes_svg")
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0.0, 0.0, width, height))
        .add(Style::new(STYLESHEET));

    // Curves first so node boxes paint over their ends.
    for curve in &scene.paths {
        let mut path = Path::new()
            .set("d", curve.data.clone())
            .set("stroke", "#333")
            .set("stroke-width", 2)
            .set("fill", "transparent");
        if let Some(id) = curve.connection {
            path = path.set("data-connection", id.to_string());
        }
        document = document.add(path);
    }

    for group in &scene.groups {
        document = document.add(node_group(group));
    }

    document.to_string()
}

fn node_group(group: &NodeGroup) -> Group {
    let mut g = Group::new()
        .set("data-node", group.node.to_string())
        .set("transform", format!("translate({} {})", group.origin.x, group.origin.y))
        .add(
            Rectangle::new()
                .set("width", NODE_WIDTH)
                .set("height", NODE_HEIGHT)
                .set("rx", NODE_CORNER_RADIUS)
                .set("ry", NODE_CORNER_RADIUS)
                .set("class", "node_rectangle"),
        )
        .add(
            Text::new(group.name.clone())
                .set("x", NODE_WIDTH / 2.0)
                .set("y", NAME_BASELINE)
                .set("class", "node_name")
                .set("text-anchor", "middle"),
        );

    for input in &group.inputs {
        g = g
            .add(dot(input.center.x, input.center.y))
            .add(
                Text::new(input.name.clone())
                    .set("x", input.center.x + SLOT_LABEL_INSET)
                    .set("y", input.center.y + SLOT_LABEL_BASELINE)
                    .set("class", "input_output_name"),
            );
    }
    for output in &group.outputs {
        g = g
            .add(dot(output.center.x, output.center.y))
            .add(
                Text::new(output.name.clone())
                    .set("x", output.center.x - SLOT_LABEL_INSET)
                    .set("y", output.center.y + SLOT_LABEL_BASELINE)
                    .set("class", "input_output_name")
                    .set("text-anchor", "end"),
            );
    }
    g
}

fn dot(cx: f64, cy: f64) -> Circle {
    Circle::new()
        .set("cx", cx)
        .set("cy", cy)
        .set("r", SLOT_DOT_RADIUS)
        .set("class", "input_output_dot")
}
