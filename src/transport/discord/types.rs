//! Discord wire constants the gallery bot relies on.

pub const API_BASE: &str = "https://discord.com/api/v10";

/// Query appended to the gateway URL returned by `GET /gateway/bot`.
pub const GATEWAY_QUERY: &str = "v=10&encoding=json";

/// Page size for channel history requests (Discord maximum).
pub const MESSAGE_PAGE_LIMIT: usize = 100;

pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
}

/// Guild metadata, guild messages, and their content.
pub const DEFAULT_INTENTS: u64 = intents::GUILDS | intents::GUILD_MESSAGES | intents::MESSAGE_CONTENT;

/// Gateway opcodes the bot sends or reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Dispatch,
    Heartbeat,
    Identify,
    Reconnect,
    InvalidSession,
    Hello,
    HeartbeatAck,
}

impl Opcode {
    pub const fn code(self) -> u8 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::Reconnect => 7,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        [
            Self::Dispatch,
            Self::Heartbeat,
            Self::Identify,
            Self::Reconnect,
            Self::InvalidSession,
            Self::Hello,
            Self::HeartbeatAck,
        ]
        .into_iter()
        .find(|op| u64::from(op.code()) == code)
    }
}

pub const INTERACTION_APPLICATION_COMMAND: u64 = 2;
pub const CALLBACK_DEFERRED_MESSAGE: u8 = 5;
pub const COMMAND_CHAT_INPUT: u8 = 1;
pub const OPTION_SUB_COMMAND: u8 = 1;
pub const OPTION_CHANNEL: u8 = 7;

/// Text, announcement, and the three thread types.
pub const GALLERY_PICKER_CHANNEL_TYPES: [u8; 5] = [0, 5, 10, 11, 12];

/// Categories (4), directories (14), forums (15) and media channels (16)
/// only contain other channels. Unknown types count as containers too.
const HISTORY_CHANNEL_TYPES: [u64; 9] = [0, 1, 2, 3, 5, 10, 11, 12, 13];

/// Whether a channel of this type has its own message history.
pub fn has_message_history(channel_type: u64) -> bool {
    HISTORY_CHANNEL_TYPES.contains(&channel_type)
}
