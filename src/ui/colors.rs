use ratatui::style::Color;

// Matrix Palette
pub const MATRIX_GREEN: Color = Color::Rgb(0, 255, 65); // Classic Matrix Neon
pub const DARK_GREEN: Color = Color::Rgb(0, 100, 0); // Deep Terminal Green
pub const BRIGHT_GREEN: Color = Color::Rgb(150, 255, 150); // Lighter Neon highlight
pub const FOCUS_BG: Color = Color::Rgb(0, 60, 0);

// Drag feedback
pub const DRAG_YELLOW: Color = Color::Rgb(255, 255, 0);
pub const TARGET_CYAN: Color = Color::Rgb(0, 255, 255);

// Status
pub const ALERT_RED: Color = Color::Rgb(255, 70, 70);
pub const MUTED_GRAY: Color = Color::Rgb(140, 140, 140);
