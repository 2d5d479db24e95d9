pub mod environ;
pub mod init;
pub mod serve;
