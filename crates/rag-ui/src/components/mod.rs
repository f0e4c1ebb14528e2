pub mod nav;
pub mod notice;
pub mod session;
pub mod toast;
