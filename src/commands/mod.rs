pub mod init;
pub mod process;
