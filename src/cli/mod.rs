pub mod classify;
pub mod init;
pub mod report;
pub mod score;
