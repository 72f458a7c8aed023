use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;

use super::{render_scene, Viewer};
use crate::env::Scene;

/// Draws every scene to a ratatui terminal.
pub struct TerminalViewer<B: Backend> {
    terminal: Terminal<B>,
    alternate_screen: bool,
    frames: usize,
}

impl TerminalViewer<CrosstermBackend<Stdout>> {
    /// Take over stdout on the alternate screen. The previous screen comes
    /// back when the viewer is dropped.
    pub fn stdout() -> io::Result<Self> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(TerminalViewer {
            terminal,
            alternate_screen: true,
            frames: 0,
        })
    }
}

impl<B: Backend> TerminalViewer<B> {
    pub fn with_backend(backend: B) -> io::Result<Self> {
        Ok(TerminalViewer {
            terminal: Terminal::new(backend)?,
            alternate_screen: false,
            frames: 0,
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend> Viewer for TerminalViewer<B> {
    fn show(&mut self, scene: &Scene) -> io::Result<()> {
        self.terminal
            .draw(|f| render_scene(f, scene, f.area()))?;
        self.frames += 1;
        Ok(())
    }
}

impl<B: Backend> Drop for TerminalViewer<B> {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            let _ = self.terminal.show_cursor();
        }
    }
}
