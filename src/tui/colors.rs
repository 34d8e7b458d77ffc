//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Status;

/// Used for tasks that have not been started
pub const SLATE: Color = Color::Rgb(150, 150, 160);
/// Used for tasks in progress
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for done tasks
pub const DARK_GREEN: Color = Color::Rgb(0, 140, 0);

pub fn status_color(status: Status) -> Color {
    match status {
        Status::NotStarted => SLATE,
        Status::InProgress => GOLD,
        Status::Done => DARK_GREEN,
    }
}
