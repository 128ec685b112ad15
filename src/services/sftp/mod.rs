// SFTP 服务

mod backend;
mod service;

pub use backend::RusshSftp;
pub use service::Sftp;
