use dialoguer::console::style;

pub enum CommandStatus {
    Success,
    Paused,
    Error,
    Warning,
}

/// One operator-facing line on stderr with a colored indicator.
pub fn print_command_status(status: CommandStatus, message: &str) {
    let indicator = match status {
        CommandStatus::Success => style("✓").green(),
        CommandStatus::Paused => style("‖").yellow(),
        CommandStatus::Error => style("✗").red(),
        CommandStatus::Warning => style("!").dim(),
    };
    eprintln!("{indicator} {message}");
}

/// Indented follow-up line, e.g. how to resume.
pub fn print_hint(message: &str) {
    eprintln!("  {}", style(message).dim());
}
