mod likes;
mod messages;
mod profiles;
mod receipts;

pub use likes::{LikeSummary, Likes, ToggleResult};

pub use messages::Messages;

pub use profiles::Profiles;

pub use receipts::ReadReceipts;
