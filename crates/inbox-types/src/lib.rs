pub mod codec;
pub mod models;

pub use codec::{CodecError, decode_message, encode_message};
pub use models::{Message, MessageKey, MessageKind, Remark, ResourceRef, StoredMessage};
