use crate::model::menu::Action;

/// Application interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Menu is accepting a selection.
    #[default]
    Menu,
    /// An action is running on a worker; the menu is locked.
    Running(Action),
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Menu => "MENU",
            Mode::Running(action) => action.label(),
        }
    }
}
