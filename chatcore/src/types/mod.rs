pub mod message;
pub mod object;

pub use message::{ImageAttachment, Like, Note, Profile, Read};
pub use object::{ActorId, ObjectId, Published, RawObject, is_truthy};
