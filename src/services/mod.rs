//! Data-source services behind the quick-search surface.

pub mod apps;
pub mod contacts;
pub mod shortcuts;
