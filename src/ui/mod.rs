//! Terminal display of the particle world: a canvas widget that draws a
//! [`Scene`](crate::env::Scene) and a viewer that owns the terminal.

mod scene_view;
mod viewer;

pub use scene_view::render_scene;
pub use viewer::TerminalViewer;

use std::io;

use crate::env::Scene;

/// Something that can show one scene per step.
pub trait Viewer {
    fn show(&mut self, scene: &Scene) -> io::Result<()>;
}
