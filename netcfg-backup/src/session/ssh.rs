//! Interactive SSH sessions to IOS and NX-OS devices over `ssh2`.
//!
//! Network operating systems expose a CLI rather than an exec channel, so the
//! session drives a PTY shell and frames every command by waiting for the
//! prompt to come back.

use super::{DeviceSession, SessionClient};
use crate::groups::{Dialect, ENABLE_COMMAND};
use crate::inventory::DeviceRecord;
use crate::net::socket_target;
use crate::utils::SessionError;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::debug;

/// libssh2's `LIBSSH2_ERROR_TIMEOUT`.
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

/// Bytes of trailing output inspected when looking for a prompt.
const PROMPT_WINDOW: usize = 512;

/// Silence after which pending device output is considered complete.
const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Opens password-authenticated SSH sessions.
#[derive(Debug, Clone)]
pub struct SshClient {
    pub port: u16,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl SshClient {
    pub fn new(port: u16, connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            port,
            connect_timeout,
            command_timeout,
        }
    }
}

impl SessionClient for SshClient {
    fn connect(
        &self,
        dialect: Dialect,
        device: &DeviceRecord,
    ) -> Result<Box<dyn DeviceSession>, SessionError> {
        let session = SshSession::<SshChannel>::open(self, dialect, device)?;
        Ok(Box::new(session))
    }
}

/// Byte stream of an interactive device shell.
pub trait ShellChannel: Read + Write {
    /// Whether the device has closed its side of the stream.
    fn is_eof(&self) -> bool;

    /// Read whatever arrives within `wait`; `Ok(0)` when nothing did.
    fn read_within(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<usize>;

    fn close(&mut self) {}
}

/// PTY shell channel of an authenticated `ssh2` session.
pub struct SshChannel {
    session: ssh2::Session,
    channel: ssh2::Channel,
    read_timeout_ms: u32,
}

impl Read for SshChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }
}

impl Write for SshChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel.flush()
    }
}

impl ShellChannel for SshChannel {
    fn is_eof(&self) -> bool {
        self.channel.eof()
    }

    fn read_within(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<usize> {
        self.session.set_timeout(millis(wait));
        let read = self.channel.read(buf);
        self.session.set_timeout(self.read_timeout_ms);

        match read {
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => Ok(0),
            other => other,
        }
    }

    fn close(&mut self) {
        let _ = self.channel.close();
        let _ = self.session.disconnect(None, "backup complete", None);
    }
}

/// Prompt-framed CLI session over a [`ShellChannel`].
pub struct SshSession<C: ShellChannel = SshChannel> {
    channel: C,
    dialect: Dialect,
    enable_secret: String,
    /// Prompt without the trailing privilege marker.
    base_prompt: String,
    command_timeout: Duration,
}

impl SshSession<SshChannel> {
    fn open(
        client: &SshClient,
        dialect: Dialect,
        device: &DeviceRecord,
    ) -> Result<Self, SessionError> {
        let target = socket_target(&device.address, client.port);
        let addr = target
            .to_socket_addrs()
            .map_err(|e| SessionError::Connection(format!("{}: {}", target, e)))?
            .next()
            .ok_or_else(|| SessionError::Connection(format!("{}: no address", target)))?;

        let tcp = TcpStream::connect_timeout(&addr, client.connect_timeout).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                SessionError::Timeout(format!("connect to {}", target))
            } else {
                SessionError::Connection(format!("{}: {}", target, e))
            }
        })?;

        let read_timeout_ms = millis(client.command_timeout);
        let mut session = ssh2::Session::new().map_err(classify)?;
        session.set_tcp_stream(tcp);
        session.set_timeout(read_timeout_ms);
        session.handshake().map_err(classify)?;

        session
            .userauth_password(&device.username, &device.password)
            .map_err(|e| SessionError::Authentication(format!("{}: {}", device.address, e)))?;
        if !session.authenticated() {
            return Err(SessionError::Authentication(device.address.clone()));
        }

        let mut channel = session.channel_session().map_err(classify)?;
        channel
            .request_pty("vt100", None, Some((511, 24, 0, 0)))
            .map_err(classify)?;
        channel.shell().map_err(classify)?;

        let shell = SshChannel {
            session,
            channel,
            read_timeout_ms,
        };
        let this = Self::start(shell, dialect, &device.enable_secret, client.command_timeout)?;
        debug!(address = %device.address, prompt = %this.base_prompt, "Session established");
        Ok(this)
    }
}

impl<C: ShellChannel> SshSession<C> {
    /// Wait for the login banner to settle, adopt the prompt and run the
    /// dialect's terminal setup.
    fn start(
        channel: C,
        dialect: Dialect,
        enable_secret: &str,
        command_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let mut this = Self {
            channel,
            dialect,
            enable_secret: enable_secret.to_string(),
            base_prompt: String::new(),
            command_timeout,
        };

        let mut banner = this.read_until(|tail| trailing_prompt(tail).is_some())?;
        banner.push_str(&this.drain()?);
        this.adopt_prompt(&banner)?;

        for command in dialect.setup_commands() {
            this.send(command)?;
        }
        Ok(this)
    }

    fn adopt_prompt(&mut self, output: &str) -> Result<String, SessionError> {
        let prompt = trailing_prompt(output)
            .ok_or_else(|| SessionError::Protocol("no prompt in device output".into()))?
            .to_string();
        self.base_prompt = prompt[..prompt.len() - 1].to_string();
        Ok(prompt)
    }

    /// Discard output that arrived since the last prompt, then write `line`.
    fn command(&mut self, line: &str) -> Result<(), SessionError> {
        let stale = self.drain()?;
        if !stale.trim().is_empty() {
            debug!(stale = %stale.trim(), "Discarded unread device output");
        }
        self.write_line(line)
    }

    fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.channel
            .write_all(format!("{}\n", line).as_bytes())
            .and_then(|_| self.channel.flush())
            .map_err(io_error)
    }

    /// Read until the device stays quiet for [`QUIET_PERIOD`].
    fn drain(&mut self) -> Result<String, SessionError> {
        let deadline = Instant::now() + self.command_timeout;
        let mut output: Vec<u8> = Vec::new();
        let mut buf = [0u8; 4096];

        while Instant::now() < deadline {
            let n = self
                .channel
                .read_within(&mut buf, QUIET_PERIOD)
                .map_err(io_error)?;
            if n == 0 {
                break;
            }
            output.extend_from_slice(&buf[..n]);
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Read until `done` accepts the tail of the accumulated output.
    fn read_until<F>(&mut self, done: F) -> Result<String, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + self.command_timeout;
        let mut output: Vec<u8> = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout("waiting for device prompt".into()));
            }

            let n = self.channel.read(&mut buf).map_err(io_error)?;
            if n == 0 {
                if self.channel.is_eof() {
                    return Err(SessionError::Protocol("device closed the channel".into()));
                }
                continue;
            }
            output.extend_from_slice(&buf[..n]);

            let start = output.len().saturating_sub(PROMPT_WINDOW);
            if done(&String::from_utf8_lossy(&output[start..])) {
                return Ok(String::from_utf8_lossy(&output).into_owned());
            }
        }
    }

    fn read_to_prompt(&mut self) -> Result<String, SessionError> {
        let base = self.base_prompt.clone();
        self.read_until(|tail| trailing_prompt(tail).is_some_and(|p| p.starts_with(&base)))
    }
}

impl<C: ShellChannel> DeviceSession for SshSession<C> {
    fn elevate(&mut self) -> Result<(), SessionError> {
        if self.prompt()?.ends_with('#') {
            return Ok(());
        }

        self.command(ENABLE_COMMAND)?;
        let reply = self.read_until(|tail| {
            tail.trim_end().ends_with("assword:") || trailing_prompt(tail).is_some()
        })?;
        let reply = if reply.trim_end().ends_with("assword:") {
            let secret = self.enable_secret.clone();
            self.write_line(&secret)?;
            self.read_until(|tail| trailing_prompt(tail).is_some())?
        } else {
            reply
        };

        let prompt = self.adopt_prompt(&reply)?;
        if !prompt.ends_with('#') {
            return Err(SessionError::Authentication("enable secret rejected".into()));
        }
        debug!(dialect = ?self.dialect, prompt = %prompt, "Privileged mode entered");
        Ok(())
    }

    fn send(&mut self, command: &str) -> Result<String, SessionError> {
        self.command(command)?;
        let raw = self.read_to_prompt()?;
        Ok(strip_echo_and_prompt(&raw, command))
    }

    fn prompt(&mut self) -> Result<String, SessionError> {
        self.command("")?;
        let raw = self.read_to_prompt()?;
        self.adopt_prompt(&raw)
    }
}

impl<C: ShellChannel> Drop for SshSession<C> {
    fn drop(&mut self) {
        let _ = self.write_line("exit");
        self.channel.close();
    }
}

/// The prompt on the last line of `output`, if the device is waiting for input.
pub fn trailing_prompt(output: &str) -> Option<&str> {
    let last = output.rsplit('\n').next()?.trim_matches(|c: char| c == '\r' || c.is_whitespace());
    let is_prompt = last.len() > 1
        && last.starts_with(|c: char| c.is_ascii_alphanumeric())
        && (last.ends_with('#') || last.ends_with('>'))
        && !last.contains(char::is_whitespace);
    is_prompt.then_some(last)
}

/// Drop the echoed command line and the trailing prompt from raw shell output.
pub fn strip_echo_and_prompt(raw: &str, command: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "");
    let mut lines: Vec<&str> = normalized.split('\n').collect();

    if lines.last().is_some_and(|l| trailing_prompt(l).is_some()) {
        lines.pop();
    }
    if !command.is_empty() && lines.first().is_some_and(|l| l.contains(command)) {
        lines.remove(0);
    }

    let mut text = lines.join("\n");
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn classify(e: ssh2::Error) -> SessionError {
    match e.code() {
        ssh2::ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) => SessionError::Timeout(e.to_string()),
        _ => SessionError::Protocol(e.to_string()),
    }
}

fn io_error(e: io::Error) -> SessionError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            SessionError::Timeout(e.to_string())
        }
        _ => SessionError::Protocol(e.to_string()),
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
