// 测试替身：连接器、会话、Shell、内存 SFTP、记录型输出

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{RemoteAttrs, RemoteEntry, ServerData};
use crate::output::{LogEntry, OutputSink, StatusIndicator};
use crate::ssh::transport::{Connector, ExecOutput, RemoteSession, SftpBackend, ShellStream};
use crate::ssh::SshError;

type ErrorFactory = Box<dyn Fn() -> SshError + Send + Sync>;
type ExecResponder = Box<dyn FnMut(&str) -> ExecOutput + Send>;

pub(crate) fn exec_output(stdout: &str, stderr: &str, exit_status: Option<u32>) -> ExecOutput {
    ExecOutput {
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
        exit_status,
    }
}

// ============================================================================
// 连接器
// ============================================================================

pub(crate) struct FakeConnector {
    fail_first: usize,
    make_error: ErrorFactory,
    session: Option<Arc<FakeSession>>,
    attempts: AtomicUsize,
}

impl FakeConnector {
    pub fn succeeding(session: Arc<FakeSession>) -> Self {
        Self::failing_then(0, || SshError::Protocol("unused".into()), session)
    }

    pub fn failing_then(
        fail_first: usize,
        make_error: impl Fn() -> SshError + Send + Sync + 'static,
        session: Arc<FakeSession>,
    ) -> Self {
        Self {
            fail_first,
            make_error: Box::new(make_error),
            session: Some(session),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn always_failing(make_error: impl Fn() -> SshError + Send + Sync + 'static) -> Self {
        Self {
            fail_first: usize::MAX,
            make_error: Box::new(make_error),
            session: None,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        _server: &ServerData,
        _budget: Duration,
    ) -> Result<Box<dyn RemoteSession>, SshError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.session {
            Some(session) if attempt > self.fail_first => {
                Ok(Box::new(SessionRef(session.clone())))
            }
            _ => Err((self.make_error)()),
        }
    }
}

// ============================================================================
// 会话
// ============================================================================

pub(crate) struct FakeSession {
    responder: Mutex<ExecResponder>,
    commands: Mutex<Vec<String>>,
    closes: AtomicUsize,
    shells_opened: AtomicUsize,
    shells_closed: Arc<AtomicUsize>,
    shell_log: Arc<Mutex<Vec<String>>>,
    shell_replies: Arc<Mutex<VecDeque<Vec<u8>>>>,
    shell_delay_polls: AtomicUsize,
    sftp: Arc<FakeSftp>,
    sftp_opens: AtomicUsize,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            responder: Mutex::new(Box::new(|_| exec_output("", "", Some(0)))),
            commands: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            shells_opened: AtomicUsize::new(0),
            shells_closed: Arc::new(AtomicUsize::new(0)),
            shell_log: Arc::new(Mutex::new(Vec::new())),
            shell_replies: Arc::new(Mutex::new(VecDeque::new())),
            shell_delay_polls: AtomicUsize::new(0),
            sftp: Arc::new(FakeSftp::new()),
            sftp_opens: AtomicUsize::new(0),
        }
    }

    /// 设置命令应答
    pub fn on_exec(&self, responder: impl FnMut(&str) -> ExecOutput + Send + 'static) {
        *self.responder.lock().unwrap() = Box::new(responder);
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Shell 收到下一条命令后可读的数据
    pub fn push_shell_reply(&self, reply: Vec<u8>) {
        self.shell_replies.lock().unwrap().push_back(reply);
    }

    /// 每条命令后前 n 次 recv_ready 返回 false
    pub fn set_shell_delay_polls(&self, polls: usize) {
        self.shell_delay_polls.store(polls, Ordering::SeqCst);
    }

    pub fn shells_opened(&self) -> usize {
        self.shells_opened.load(Ordering::SeqCst)
    }

    pub fn shells_closed(&self) -> usize {
        self.shells_closed.load(Ordering::SeqCst)
    }

    pub fn shell_log(&self) -> Vec<String> {
        self.shell_log.lock().unwrap().clone()
    }

    pub fn sftp(&self) -> &Arc<FakeSftp> {
        &self.sftp
    }

    pub fn sftp_opens(&self) -> usize {
        self.sftp_opens.load(Ordering::SeqCst)
    }
}

struct SessionRef(Arc<FakeSession>);

#[async_trait]
impl RemoteSession for SessionRef {
    async fn exec(&self, command: &str) -> Result<ExecOutput, SshError> {
        self.0.commands.lock().unwrap().push(command.to_string());
        let mut responder = self.0.responder.lock().unwrap();
        Ok((*responder)(command))
    }

    async fn open_shell(&self) -> Result<Box<dyn ShellStream>, SshError> {
        self.0.shells_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeShell {
            log: self.0.shell_log.clone(),
            replies: self.0.shell_replies.clone(),
            closed: self.0.shells_closed.clone(),
            delay_polls: self.0.shell_delay_polls.load(Ordering::SeqCst),
            pending: Vec::new(),
        }))
    }

    async fn open_sftp(&self) -> Result<Box<dyn SftpBackend>, SshError> {
        self.0.sftp_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SftpRef(self.0.sftp.clone())))
    }

    async fn close(&self) -> Result<(), SshError> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Shell
// ============================================================================

struct FakeShell {
    log: Arc<Mutex<Vec<String>>>,
    replies: Arc<Mutex<VecDeque<Vec<u8>>>>,
    closed: Arc<AtomicUsize>,
    delay_polls: usize,
    pending: Vec<u8>,
}

#[async_trait]
impl ShellStream for FakeShell {
    async fn send(&mut self, data: &[u8]) -> Result<(), SshError> {
        self.log
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(data).to_string());
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            self.pending.extend_from_slice(&reply);
        }
        Ok(())
    }

    async fn recv_ready(&mut self) -> Result<bool, SshError> {
        if self.delay_polls > 0 {
            self.delay_polls -= 1;
            return Ok(false);
        }
        if self.pending.is_empty() {
            return Err(SshError::Channel("no scripted reply".into()));
        }
        Ok(true)
    }

    async fn recv(&mut self, max_bytes: usize) -> Result<Vec<u8>, SshError> {
        let n = max_bytes.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    async fn close(&mut self) -> Result<(), SshError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// 内存 SFTP
// ============================================================================

enum Node {
    Dir,
    File(Vec<u8>),
}

pub(crate) struct FakeSftp {
    tree: Mutex<BTreeMap<String, Node>>,
    calls: Mutex<Vec<String>>,
    short_writes: AtomicBool,
    closes: AtomicUsize,
}

impl FakeSftp {
    fn new() -> Self {
        let mut tree = BTreeMap::new();
        tree.insert("/".to_string(), Node::Dir);
        Self {
            tree: Mutex::new(tree),
            calls: Mutex::new(Vec::new()),
            short_writes: AtomicBool::new(false),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn add_dir(&self, path: &str) {
        self.tree.lock().unwrap().insert(path.to_string(), Node::Dir);
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.tree
            .lock()
            .unwrap()
            .insert(path.to_string(), Node::File(content.to_vec()));
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.tree.lock().unwrap().get(path) {
            Some(Node::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// 上传时只保存一半内容
    pub fn set_short_writes(&self, enabled: bool) {
        self.short_writes.store(enabled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((parent, _)) => parent,
        None => "",
    }
}

struct SftpRef(Arc<FakeSftp>);

#[async_trait]
impl SftpBackend for SftpRef {
    async fn put(&self, local: &Path, remote: &str) -> Result<u64, SshError> {
        self.0.record(format!("put:{}", remote));
        let mut content = tokio::fs::read(local).await?;
        if self.0.short_writes.load(Ordering::SeqCst) {
            content.truncate(content.len() / 2);
        }
        let written = content.len() as u64;
        self.0
            .tree
            .lock()
            .unwrap()
            .insert(remote.to_string(), Node::File(content));
        Ok(written)
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<u64, SshError> {
        self.0.record(format!("get:{}", remote));
        let content = self
            .0
            .file(remote)
            .ok_or_else(|| SshError::Sftp(format!("No such file: {}", remote)))?;
        tokio::fs::write(local, &content).await?;
        Ok(content.len() as u64)
    }

    async fn lstat(&self, remote: &str) -> Result<RemoteAttrs, SshError> {
        self.0.record(format!("lstat:{}", remote));
        match self.0.tree.lock().unwrap().get(remote) {
            Some(Node::Dir) => Ok(RemoteAttrs::new(0o040755, 4096)),
            Some(Node::File(content)) => Ok(RemoteAttrs::new(0o100644, content.len() as u64)),
            None => Err(SshError::Sftp(format!("No such file: {}", remote))),
        }
    }

    async fn read_dir(&self, remote: &str) -> Result<Vec<RemoteEntry>, SshError> {
        self.0.record(format!("read_dir:{}", remote));
        let tree = self.0.tree.lock().unwrap();
        let entries = tree
            .iter()
            .filter(|(path, _)| path.as_str() != "/" && parent_of(path) == remote)
            .map(|(path, node)| {
                let name = path.rsplit('/').next().unwrap_or(path);
                let attrs = match node {
                    Node::Dir => RemoteAttrs::new(0o040755, 4096),
                    Node::File(content) => RemoteAttrs::new(0o100644, content.len() as u64),
                };
                RemoteEntry::new(name, attrs)
            })
            .collect();
        Ok(entries)
    }

    async fn close(&self) -> Result<(), SshError> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// 输出
// ============================================================================

pub(crate) struct RecordingSink {
    messages: Mutex<Vec<String>>,
    echoes: Mutex<Vec<String>>,
    status_events: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            echoes: Mutex::new(Vec::new()),
            status_events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 已格式化的日志行
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn echoes(&self) -> Vec<String> {
        self.echoes.lock().unwrap().clone()
    }

    pub fn status_events(&self) -> Vec<String> {
        self.status_events.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingSink {
    fn log(&self, server: &ServerData, entry: LogEntry) {
        self.messages.lock().unwrap().push(entry.format_for(server));
    }

    fn echo(&self, _server: &ServerData, text: &str) {
        self.echoes.lock().unwrap().push(text.to_string());
    }

    fn status(&self, _server: &ServerData) -> Box<dyn StatusIndicator> {
        Box::new(RecordingStatus {
            events: self.status_events.clone(),
        })
    }
}

struct RecordingStatus {
    events: Arc<Mutex<Vec<String>>>,
}

impl StatusIndicator for RecordingStatus {
    fn start(&mut self, message: &str) {
        self.events.lock().unwrap().push(format!("start:{}", message));
    }

    fn update(&mut self, message: &str) {
        self.events.lock().unwrap().push(format!("update:{}", message));
    }

    fn stop(&mut self) {
        self.events.lock().unwrap().push("stop".to_string());
    }
}

// ============================================================================
// 组装
// ============================================================================

/// 连接到给定假会话的 Ssh（connection_timeout = 5s）
pub(crate) fn ssh_with(session: Arc<FakeSession>) -> (crate::ssh::Ssh, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let connection = connection_with(session, sink.clone());
    (crate::ssh::Ssh::with_connection(connection), sink)
}

pub(crate) fn connection_with(
    session: Arc<FakeSession>,
    sink: Arc<RecordingSink>,
) -> crate::ssh::Connection {
    let server = ServerData::new("192.168.1.20", "deploy")
        .with_custom_name("worker")
        .with_connection_timeout(5);
    crate::ssh::Connection::with_parts(
        Arc::new(server),
        Arc::new(FakeConnector::succeeding(session)),
        sink,
    )
}
