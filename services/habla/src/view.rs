//! Terminal rendering of the controller state and parsing of user input.

use habla_core::{ConnectionStatus, ControllerState};

pub const BUSY_TEXT: &str = "Ya hay una conexión en curso, espera un momento.";
pub const HELP_TEXT: &str = "Enter o 't' para activar/desactivar el micrófono, 'q' para salir.";

/// A user action read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "" | "t" | "toggle" => Some(Command::Toggle),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

pub fn status_text(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Idle => "Presiona el botón para comenzar",
        ConnectionStatus::Connecting => "Conectando...",
        ConnectionStatus::Connected => "Escuchando...",
        ConnectionStatus::Error => "Error de conexión",
    }
}

/// Lines printed for a state snapshot: a status line, then the error if any.
pub fn render(state: &ControllerState) -> Vec<String> {
    let marker = if state.listening { "[●]" } else { "[ ]" };
    let mut lines = vec![format!("{} {}", marker, status_text(state.status))];
    if let Some(error) = &state.error {
        lines.push(format!("    {}", error));
    }
    lines
}
