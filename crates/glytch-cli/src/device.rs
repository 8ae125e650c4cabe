//! Opening the wristband byte stream.
//!
//! The wristband itself speaks Bluetooth SPP; on the host it shows up either
//! as a serial device node (`/dev/rfcomm0`), through a serial-to-TCP bridge,
//! or piped into the process.

use std::path::PathBuf;

use glytch_types::GlytchError;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;

/// Name the wristband advertises when paired.
pub const DEVICE_NAME: &str = "GLYTCH_Wristband";

pub type DeviceStream = Box<dyn AsyncRead + Unpin + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// `tcp://host:port`
    Tcp(String),
    /// `stdin` or `-`
    Stdin,
    /// Anything else is treated as a filesystem path.
    Path(PathBuf),
}

impl DeviceTarget {
    pub fn parse(raw: &str) -> Result<Self, GlytchError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GlytchError::Connect {
                target: String::new(),
                reason: "no device configured".to_string(),
            });
        }
        if raw == "stdin" || raw == "-" {
            return Ok(DeviceTarget::Stdin);
        }
        if let Some(addr) = raw.strip_prefix("tcp://") {
            if addr.is_empty() || !addr.contains(':') {
                return Err(GlytchError::Connect {
                    target: raw.to_string(),
                    reason: "expected tcp://host:port".to_string(),
                });
            }
            return Ok(DeviceTarget::Tcp(addr.to_string()));
        }
        Ok(DeviceTarget::Path(PathBuf::from(raw)))
    }

    /// Open a fresh connection.
    ///
    /// # Errors
    ///
    /// [`GlytchError::Connect`] when the socket or file cannot be opened.
    pub async fn open(&self) -> Result<DeviceStream, GlytchError> {
        let connect_err = |e: std::io::Error| GlytchError::Connect {
            target: self.to_string(),
            reason: e.to_string(),
        };
        match self {
            DeviceTarget::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await.map_err(connect_err)?;
                Ok(Box::new(stream))
            }
            DeviceTarget::Stdin => Ok(Box::new(tokio::io::stdin())),
            DeviceTarget::Path(path) => {
                let file = tokio::fs::File::open(path).await.map_err(connect_err)?;
                Ok(Box::new(file))
            }
        }
    }
}

impl std::fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceTarget::Tcp(addr) => write!(f, "tcp://{addr}"),
            DeviceTarget::Stdin => write!(f, "stdin"),
            DeviceTarget::Path(path) => write!(f, "{}", path.display()),
        }
    }
}
