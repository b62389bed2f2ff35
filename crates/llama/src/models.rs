//! These models represent the objects exchanged with the chat service
//!
//! The same structs are used on the wire and internally: a `Message` is appended to a
//! conversation exactly as it will be sent back on the next request, so there is no
//! separate conversion step between the two.
pub mod message;
pub mod role;
pub mod tool;
