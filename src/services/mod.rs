// 服务层：SFTP 传输

pub mod sftp;
