use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

/// Custom IDs for the player buttons
pub mod button_ids {
    pub const PAUSE: &str = "player_pause";
    pub const RESUME: &str = "player_resume";
    pub const SKIP: &str = "player_skip";
    pub const RESTART: &str = "player_restart";
    pub const STOP: &str = "player_stop";
}

/// Control actions attached to a now-playing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Pause,
    Resume,
    Skip,
    Restart,
    Stop,
}

impl PlayerAction {
    pub fn from_custom_id(id: &str) -> Option<Self> {
        match id {
            button_ids::PAUSE => Some(Self::Pause),
            button_ids::RESUME => Some(Self::Resume),
            button_ids::SKIP => Some(Self::Skip),
            button_ids::RESTART => Some(Self::Restart),
            button_ids::STOP => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn custom_id(self) -> &'static str {
        match self {
            Self::Pause => button_ids::PAUSE,
            Self::Resume => button_ids::RESUME,
            Self::Skip => button_ids::SKIP,
            Self::Restart => button_ids::RESTART,
            Self::Stop => button_ids::STOP,
        }
    }

    /// Ephemeral reply when the action did something.
    pub fn done_message(self) -> &'static str {
        match self {
            Self::Pause => "⏸️ Paused",
            Self::Resume => "▶️ Resumed",
            Self::Skip => "⏭️ Skipped",
            Self::Restart => "🔁 Restarting",
            Self::Stop => "⏹️ Stopped and left voice",
        }
    }

    /// Ephemeral reply when the action was a no-op in the current state.
    pub fn noop_message(self) -> &'static str {
        match self {
            Self::Pause => "Nothing is playing",
            Self::Resume => "Nothing is paused",
            Self::Skip | Self::Restart => "Nothing to skip or restart",
            Self::Stop => "Nothing to stop",
        }
    }

    fn button(self) -> CreateButton {
        let (label, style) = match self {
            Self::Pause => ("⏸️ Pause", ButtonStyle::Primary),
            Self::Resume => ("▶️ Resume", ButtonStyle::Success),
            Self::Skip => ("⏭️ Skip", ButtonStyle::Secondary),
            Self::Restart => ("🔁 Restart", ButtonStyle::Secondary),
            Self::Stop => ("⏹️ Stop", ButtonStyle::Danger),
        };
        CreateButton::new(self.custom_id()).label(label).style(style)
    }
}

const ALL_ACTIONS: [PlayerAction; 5] = [
    PlayerAction::Pause,
    PlayerAction::Resume,
    PlayerAction::Skip,
    PlayerAction::Restart,
    PlayerAction::Stop,
];

/// The row of controls shown under every now-playing card.
pub fn create_player_buttons() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(
        ALL_ACTIONS.iter().map(|action| action.button()).collect(),
    )]
}
