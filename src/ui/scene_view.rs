use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Circle},
        Block, Borders,
    },
    Frame,
};

use crate::env::{EntityKind, Scene};

const AGENT_LABEL: Color = Color::Blue;
const LANDMARK_LABEL: Color = Color::Red;

/// Draw `scene` into `area`, world bounds [-1, 1] on both axes.
pub fn render_scene(frame: &mut Frame, scene: &Scene, area: Rect) {
    let title = format!(
        " {} agents, {} landmarks ",
        scene.agents().count(),
        scene.landmarks().count()
    );
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(Marker::Braille)
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(|ctx| {
            for entity in &scene.entities {
                let [r, g, b] = entity.color;
                ctx.draw(&Circle {
                    x: entity.position[0],
                    y: entity.position[1],
                    radius: entity.size,
                    color: Color::Rgb(r, g, b),
                });
            }
            ctx.layer();
            for entity in &scene.entities {
                let color = match entity.kind {
                    EntityKind::Agent => AGENT_LABEL,
                    EntityKind::Landmark => LANDMARK_LABEL,
                };
                ctx.print(
                    entity.position[0],
                    entity.position[1],
                    Span::styled(
                        entity.label(),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                );
            }
        });
    frame.render_widget(canvas, area);
}
