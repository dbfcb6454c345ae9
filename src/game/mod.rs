pub mod achievements;
pub mod session;
pub mod stats;
pub mod toast;
