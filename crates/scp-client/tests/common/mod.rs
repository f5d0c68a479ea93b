//! In-memory SCP peer for integration tests
//!
//! [`MemorySession`] hands out invocations whose `run` plays the remote side
//! of `scp -f`, `scp -t`, `echo` and `exit` over `tokio::io::duplex` pipes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use scp_core::{CommandInvocation, SessionError, SessionProvider};

const PIPE_CAPACITY: usize = 64 * 1024;

/// How the fake remote `scp` behaves
#[derive(Debug, Clone, Default)]
pub struct PeerBehavior {
    /// Speak the three-way status protocol instead of the streaming one
    pub checked: bool,
    /// Size announced by the source instead of the real length
    pub declared_size: Option<u64>,
    /// Name announced by the source instead of the file's own
    pub announced_name: Option<String>,
    /// Mode announced by the source
    pub mode: Option<String>,
    /// Fatal message the sink answers a control line with
    pub reject_upload: Option<String>,
    /// Never finish the command
    pub stall: bool,
}

#[derive(Debug, Default)]
struct RemoteState {
    files: HashMap<String, Vec<u8>>,
    commands: Vec<String>,
    /// Everything the last `scp -t` read from its stdin
    sink_wire: Vec<u8>,
    /// Everything the last `scp -f` read from its stdin
    source_wire: Vec<u8>,
}

/// Fake remote host with a flat file store
#[derive(Clone, Default)]
pub struct MemorySession {
    behavior: PeerBehavior,
    state: Arc<Mutex<RemoteState>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: PeerBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn put_remote(&self, path: &str, content: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(normalize(path), content.to_vec());
    }

    pub fn remote_file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(&normalize(path)).cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn sink_wire(&self) -> Vec<u8> {
        self.state.lock().unwrap().sink_wire.clone()
    }

    pub fn source_wire(&self) -> Vec<u8> {
        self.state.lock().unwrap().source_wire.clone()
    }
}

fn normalize(path: &str) -> String {
    path.strip_prefix("./").unwrap_or(path).to_string()
}

#[async_trait]
impl SessionProvider for MemorySession {
    type Invocation = MemoryInvocation;

    async fn open_invocation(&self) -> Result<MemoryInvocation, SessionError> {
        Ok(MemoryInvocation::new(self.behavior.clone(), self.state.clone()))
    }
}

pub struct MemoryInvocation {
    behavior: PeerBehavior,
    state: Arc<Mutex<RemoteState>>,
    stdin: Option<DuplexStream>,
    stdout: Option<DuplexStream>,
    remote: Option<(DuplexStream, DuplexStream)>,
}

impl MemoryInvocation {
    fn new(behavior: PeerBehavior, state: Arc<Mutex<RemoteState>>) -> Self {
        let (stdin, remote_in) = tokio::io::duplex(PIPE_CAPACITY);
        let (stdout, remote_out) = tokio::io::duplex(PIPE_CAPACITY);
        Self {
            behavior,
            state,
            stdin: Some(stdin),
            stdout: Some(stdout),
            remote: Some((remote_in, remote_out)),
        }
    }
}

#[async_trait]
impl CommandInvocation for MemoryInvocation {
    type Stdin = DuplexStream;
    type Stdout = DuplexStream;

    fn stdin_pipe(&mut self) -> Result<DuplexStream, SessionError> {
        self.stdin.take().ok_or(SessionError::PipeTaken("stdin"))
    }

    fn stdout_pipe(&mut self) -> Result<DuplexStream, SessionError> {
        self.stdout.take().ok_or(SessionError::PipeTaken("stdout"))
    }

    async fn run(&mut self, command: &str) -> Result<Option<u32>, SessionError> {
        self.state.lock().unwrap().commands.push(command.to_string());
        let (mut input, mut output) = self
            .remote
            .take()
            .ok_or_else(|| SessionError::Exec("already run".to_string()))?;

        if self.behavior.stall {
            std::future::pending::<()>().await;
        }

        let words: Vec<&str> = command.splitn(3, ' ').collect();
        let status = match words.as_slice() {
            [_, "-f", path] => self.source(path, &mut input, &mut output).await,
            [_, "-t", "./"] => self.sink(&mut input, &mut output).await,
            ["echo", rest @ ..] => {
                let line = format!("{}\n", rest.join(" "));
                output.write_all(line.as_bytes()).await.map(|_| 0)
            }
            ["exit", code] => Ok(code.parse().unwrap_or(1)),
            _ => Ok(127),
        };

        // Remote process exits: both pipes close
        drop(input);
        drop(output);
        Ok(Some(status.unwrap_or(1)))
    }
}

impl MemoryInvocation {
    /// Remote `scp -f <path>`
    async fn source(
        &self,
        path: &str,
        input: &mut DuplexStream,
        output: &mut DuplexStream,
    ) -> io::Result<u32> {
        let mut wire = Vec::new();
        let result = self.source_steps(path, input, output, &mut wire).await;
        self.state.lock().unwrap().source_wire = wire;
        result
    }

    async fn source_steps(
        &self,
        path: &str,
        input: &mut DuplexStream,
        output: &mut DuplexStream,
        wire: &mut Vec<u8>,
    ) -> io::Result<u32> {
        let content = self.state.lock().unwrap().files.get(&normalize(path)).cloned();

        expect_ack(input, wire).await?;
        let Some(content) = content else {
            let message = format!("\x01scp: {}: No such file or directory\n", path);
            output.write_all(message.as_bytes()).await?;
            return Ok(1);
        };

        let name = self
            .behavior
            .announced_name
            .clone()
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path).to_string());
        let mode = self.behavior.mode.clone().unwrap_or_else(|| "0644".to_string());
        let size = self.behavior.declared_size.unwrap_or(content.len() as u64);
        let line = format!("C{} {} {}\n", mode, size, name);
        output.write_all(line.as_bytes()).await?;

        expect_ack(input, wire).await?;
        output.write_all(&content).await?;

        if self.behavior.checked && size != content.len() as u64 {
            // Source died mid-file
            output.shutdown().await?;
            return Ok(1);
        } else if self.behavior.checked {
            output.write_all(&[0]).await?;
            expect_ack(input, wire).await?;
        } else {
            // Like OpenSSH: status byte, one ack, exit. Further per-chunk
            // acks are never read back.
            output.write_all(&[0]).await?;
            expect_ack(input, wire).await?;
            output.shutdown().await?;
            let mut rest = Vec::new();
            input.read_to_end(&mut rest).await?;
            wire.extend_from_slice(&rest);
        }
        Ok(0)
    }

    /// Remote `scp -t ./`
    async fn sink(&self, input: &mut DuplexStream, output: &mut DuplexStream) -> io::Result<u32> {
        let mut wire = Vec::new();
        let result = self.sink_steps(input, output, &mut wire).await;
        self.state.lock().unwrap().sink_wire = wire;
        result
    }

    async fn sink_steps(
        &self,
        input: &mut DuplexStream,
        output: &mut DuplexStream,
        wire: &mut Vec<u8>,
    ) -> io::Result<u32> {
        let checked = self.behavior.checked;
        if checked {
            output.write_all(&[0]).await?;
        }

        let line = read_line(input, wire).await?;
        let fields: Vec<&str> = line.trim_end_matches('\n').splitn(3, ' ').collect();
        let [_, size, name] = fields.as_slice() else {
            return Ok(1);
        };
        let size: usize = size.parse().unwrap_or(0);
        let name = name.to_string();

        if checked {
            if let Some(message) = &self.behavior.reject_upload {
                output
                    .write_all(format!("\x02{}\n", message).as_bytes())
                    .await?;
                return Ok(1);
            }
            output.write_all(&[0]).await?;

            let mut content = vec![0u8; size];
            input.read_exact(&mut content).await?;
            wire.extend_from_slice(&content);
            let mut status = [0u8; 1];
            input.read_exact(&mut status).await?;
            wire.extend_from_slice(&status);
            output.write_all(&[0]).await?;

            self.state.lock().unwrap().files.insert(name, content);
        } else {
            let mut rest = Vec::new();
            input.read_to_end(&mut rest).await?;
            wire.extend_from_slice(&rest);
            let content = rest.strip_suffix(b"\0\n").unwrap_or(&rest).to_vec();
            self.state.lock().unwrap().files.insert(name, content);
        }
        Ok(0)
    }
}

async fn expect_ack(input: &mut DuplexStream, wire: &mut Vec<u8>) -> io::Result<()> {
    let byte = input.read_u8().await?;
    wire.push(byte);
    if byte != 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "expected ack"));
    }
    Ok(())
}

async fn read_line(input: &mut DuplexStream, wire: &mut Vec<u8>) -> io::Result<String> {
    let mut line = Vec::new();
    loop {
        let byte = input.read_u8().await?;
        wire.push(byte);
        line.push(byte);
        if byte == b'\n' {
            return Ok(String::from_utf8_lossy(&line).into_owned());
        }
    }
}
