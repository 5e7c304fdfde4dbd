use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Unauthorized,
    Unavailable { status: u16 },
    NotConnected,
    InvalidSystem(usize),
    InvalidZone(usize),
    NoStatus,
    Json(serde_json::Error),
    InvalidCode { field: &'static str, code: u8 },
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Unauthorized => write!(f, "username or password incorrect"),
            Error::Unavailable { status } => {
                write!(f, "myicomfort cloud service not responding (status {status})")
            }
            Error::NotConnected => write!(f, "not connected"),
            Error::InvalidSystem(idx) => write!(f, "no system at index {idx}"),
            Error::InvalidZone(idx) => write!(f, "no zone at index {idx}"),
            Error::NoStatus => write!(f, "no thermostat status pulled yet"),
            Error::Json(e) => write!(f, "malformed response: {e}"),
            Error::InvalidCode { field, code } => write!(f, "invalid {field} code: {code}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
