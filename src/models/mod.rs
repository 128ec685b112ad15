// 数据模型模块

pub mod command;
pub mod remote;
pub mod server;

pub use command::{decode_output, CommandOutput, DEFAULT_ENCODING};
pub use remote::{join_path, FileType, RemoteAttrs, RemoteEntry};
pub use server::ServerData;
