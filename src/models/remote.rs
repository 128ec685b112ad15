// 远程文件属性与路径工具

/// 文件类型位掩码
const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// 文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// 普通文件
    #[default]
    File,
    /// 目录
    Directory,
    /// 符号链接
    Symlink,
    /// 其他类型
    Other,
}

/// 远程路径的 lstat 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteAttrs {
    /// st_mode（含文件类型位）
    pub mode: u32,
    /// 文件大小（字节）
    pub size: u64,
}

impl RemoteAttrs {
    pub fn new(mode: u32, size: u64) -> Self {
        Self { mode, size }
    }

    /// 根据文件类型位判断
    pub fn file_type(&self) -> FileType {
        match self.mode & S_IFMT {
            S_IFDIR => FileType::Directory,
            S_IFREG => FileType::File,
            S_IFLNK => FileType::Symlink,
            _ => FileType::Other,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }
}

/// 远程目录中的一个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// 文件名
    pub name: String,
    /// 属性
    pub attrs: RemoteAttrs,
}

impl RemoteEntry {
    pub fn new(name: impl Into<String>, attrs: RemoteAttrs) -> Self {
        Self {
            name: name.into(),
            attrs,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.attrs.is_dir()
    }
}

/// 连接远程路径（POSIX 风格）
pub fn join_path(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}
