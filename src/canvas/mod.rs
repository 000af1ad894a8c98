pub mod geometry;
pub mod scene;
pub mod svg;

pub use geometry::{anchors, hit_test, Anchor, CurveStyle, Point, Target};
pub use scene::{Pose, Scene};
pub use self::svg::render_svg;
