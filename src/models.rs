//! These models represent the objects that make up a conversation transcript.
//!
//! The wire format mirrors what the assistant backend and the presentation
//! layer exchange: role-tagged messages, and for tool messages an ordered
//! map of typed parameter values (text, coin amounts, transaction hashes,
//! block references) so result panels never need free-form formatting.
pub mod message;
pub mod params;
