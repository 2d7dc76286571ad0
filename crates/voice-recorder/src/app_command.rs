use crate::NavigationSignal;

/// Commands sent to the main application loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// A navigation hotkey was pressed.
    Navigate(NavigationSignal),
    /// Request application shutdown.
    Shutdown,
}
