//! Chronicle — page publishing bounded context.
//!
//! A page is created as a draft, may be published and unpublished any
//! number of times, and can be deleted while it is a draft.

pub mod application;
pub mod domain;
