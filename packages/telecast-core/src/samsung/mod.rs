//! Samsung TV remote control.
//!
//! # Module Structure
//!
//! - `codec` - Legacy protocol envelope framing (base64 fields, length bytes)
//! - `client` - `RemoteClient`, WebSocket-first with legacy TCP fallback
//! - `keys` - Key names understood by the TV
//! - `traits` - Trait abstractions used by the reconciliation loop

pub mod client;
pub mod codec;
pub mod keys;
pub mod traits;

pub use client::{RemoteClient, SamsungRemoteFactory, SessionMode};
pub use keys::RemoteKey;
pub use traits::{RemoteControl, RemoteFactory};
