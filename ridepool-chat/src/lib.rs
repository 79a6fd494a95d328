pub mod ledger;
pub mod service;

pub use ledger::ConversationLedger;
pub use service::ChatService;
