use std::fmt;

use pipemux_socket::SocketError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn socket_error(context: &str, err: SocketError) -> CliError {
    let code = match err {
        SocketError::WouldBlock => TIMEOUT,
        SocketError::Unsupported(_) => USAGE,
        SocketError::ProtocolViolation(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}
