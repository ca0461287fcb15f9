//! Domain types and the wire protocol shared by the engine client and
//! the desktop console.

pub mod domain;
pub mod error;
pub mod protocol;
