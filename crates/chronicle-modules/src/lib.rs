//! Chronicle — module lifecycle bounded context.
//!
//! A module moves through `pending → installed → {enabled ⇄ disabled} →
//! uninstalled`. Its state is derived entirely from its event stream.

pub mod application;
pub mod domain;
