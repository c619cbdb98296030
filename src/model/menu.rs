/// Entries of the main menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Install,
    Launch,
    Update,
    CliVersion,
    AppVersion,
    Exit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 6] = [
        MenuItem::Install,
        MenuItem::Launch,
        MenuItem::Update,
        MenuItem::CliVersion,
        MenuItem::AppVersion,
        MenuItem::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Install => "Download & Install DOA",
            MenuItem::Launch => "Launch DOA",
            MenuItem::Update => "Update DOA",
            MenuItem::CliVersion => "Check CLI version",
            MenuItem::AppVersion => "Check DOA version",
            MenuItem::Exit => "Exit",
        }
    }

    /// Menu entries that run external tools on a worker.
    pub fn action(&self) -> Option<Action> {
        match self {
            MenuItem::Install => Some(Action::Install),
            MenuItem::Launch => Some(Action::Launch),
            MenuItem::Update => Some(Action::Update),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Launch,
    Update,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Install => "INSTALL",
            Action::Launch => "LAUNCH",
            Action::Update => "UPDATE",
        }
    }
}
