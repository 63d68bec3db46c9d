use std::io::IsTerminal;

mod limit_prompt;
mod progress;
mod status;

pub use limit_prompt::InteractiveLimitPrompt;
pub use progress::PullProgress;
pub use status::{print_command_status, print_hint, CommandStatus};

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}
