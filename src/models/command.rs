// 命令执行结果

use encoding_rs::Encoding;

use crate::ssh::SshError;

/// 默认输出编码
pub const DEFAULT_ENCODING: &str = "utf-8";

/// 一次命令执行的输出（已解码、去除首尾空白）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// 标准输出
    pub stdout: String,
    /// 标准错误
    pub stderr: String,
    /// 退出码，远程未报告时为 -1
    pub exit_code: i32,
}

impl CommandOutput {
    /// 检查命令是否成功
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// 按编码标签解码远程输出
///
/// 标签遵循 WHATWG 编码名称（`utf-8`、`gbk`、`latin1` 等），
/// 非法字节序列以替换字符输出。
pub fn decode_output(bytes: &[u8], encoding: &str) -> Result<String, SshError> {
    let encoding = Encoding::for_label(encoding.trim().as_bytes())
        .ok_or_else(|| SshError::Encoding(encoding.to_string()))?;
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}
