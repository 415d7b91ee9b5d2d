pub mod cli;
pub mod core;
pub mod credentials;
pub mod gateway;
pub mod render;
pub mod scroll;
pub mod session;
pub mod turn;
