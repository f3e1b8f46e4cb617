pub mod common;
pub mod ping;
pub mod post;
pub mod preview;
pub mod status;
