pub mod history;
pub mod init;
pub mod pacing;
pub mod play;
