//! Domain layer types for the newsletter digest.
//!
//! Everything here is created and dropped within a single run; nothing in this
//! module performs I/O.

mod date_range;
mod digest;
mod email;
mod types;

pub use date_range::DateRange;
pub use digest::{Digest, UrlCollection, ENTRY_SEPARATOR};
pub use email::Address;
pub use types::{MessageId, Sender};
