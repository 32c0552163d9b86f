pub mod clipboard;
pub mod config;
pub mod conversation;
pub mod copy_state;
pub mod fragment;
pub mod service;
pub mod viewport;

// Re-export main types for convenience
pub use clipboard::{Clipboard, SystemClipboard};
pub use config::{Config, ConfigError};
pub use conversation::{ConversationStore, ExchangeOutcome, ExchangeRequest, Message, Sender};
pub use copy_state::{CopyCategory, CopyKey, CopyStateTracker, ScheduledClear};
pub use fragment::{parse, Fragment, FragmentKind};
pub use service::{ChatError, ChatService, HttpChatClient, NetworkBridge};
pub use viewport::ViewportController;
