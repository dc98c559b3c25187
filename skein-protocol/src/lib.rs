//! Kafka wire protocol definitions shared by the broker and its test client.

pub mod api_keys;
pub mod codec;
pub mod error_codes;
pub mod messages;
pub mod primitives;


pub use api_keys::*;
pub use codec::*;
pub use error_codes::*;
pub use messages::*;
pub use primitives::{
    CompactArray, CompactNullableBytes, CompactNullableString, CompactString, KafkaBool,
    NullableString, TaggedFields,
};
