use std::sync::{Mutex, PoisonError};

use engine::{DisplaySurface, IDLE_VALUE};
use shared::domain::{CurrentSettings, SlotId};
use storage::Notifier;

struct Cell {
    slot_id: SlotId,
    label: String,
    value: String,
}

#[derive(Default)]
struct Board {
    location: String,
    cells: Vec<Cell>,
}

/// Line-oriented rendering of the rotator board.
#[derive(Default)]
pub struct TerminalSurface {
    board: Mutex<Board>,
}

impl TerminalSurface {
    pub fn render(&self) -> String {
        let board = self.board.lock().unwrap_or_else(PoisonError::into_inner);
        let cells: Vec<String> = board
            .cells
            .iter()
            .map(|cell| format!("{} {}", cell.label, cell.value))
            .collect();
        if board.location.is_empty() {
            cells.join(" | ")
        } else {
            format!("{}: {}", board.location, cells.join(" | "))
        }
    }
}

impl DisplaySurface for TerminalSurface {
    fn has_slot(&self, slot_id: SlotId) -> bool {
        self.board
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cells
            .iter()
            .any(|cell| cell.slot_id == slot_id)
    }

    fn show(&self, slot_id: SlotId, value: &str) {
        let mut board = self.board.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = board.cells.iter_mut().find(|cell| cell.slot_id == slot_id) {
            cell.value = value.to_string();
        }
    }

    fn populate(&self, settings: &CurrentSettings) {
        let mut board = self.board.lock().unwrap_or_else(PoisonError::into_inner);
        board.location = settings.config.location_text.clone();
        board.cells = settings
            .config
            .rotators
            .iter()
            .map(|slot| Cell {
                slot_id: slot.id,
                label: slot.label.clone(),
                value: IDLE_VALUE.to_string(),
            })
            .collect();
    }
}

/// Prints notifications for the person at the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, is_error: bool) {
        if is_error {
            eprintln!("error: {message}");
        } else {
            println!("{message}");
        }
    }
}
