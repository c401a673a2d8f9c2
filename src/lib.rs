//! Interactive graph exploration: normalize a loosely-shaped node/edge
//! dataset, filter it down to a displayed subgraph, lay it out with a
//! force-directed simulation, and turn pointer input into selection, drag and
//! pan/zoom.

pub mod config;
pub mod error;
pub mod filter;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod render;
pub mod util;
pub mod view;

pub use config::{ColorMode, GraphViewConfig, SimulationConfig};
pub use error::{GraphError, Result};
pub use filter::{DisplayedGraph, TypeFilter, ViewFilter, apply_filter};
pub use interaction::{Intent, InteractionState, ViewTransform, Viewport};
pub use layout::Simulation;
pub use model::{GraphModel, Node, NormalizeOptions, Normalized, normalize};
pub use render::Frame;
pub use view::{GraphView, GroupChoice, ViewStatus};
