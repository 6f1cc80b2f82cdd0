use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::msg::{decode_reply, ControlRequest, MsgType, Reply, WireError, MSG_SIZE};

/// Where the daemon publishes one control socket per device.
pub const RUN_DIR: &str = "/run/pathctl";

/// An unresponsive daemon fails the receive instead of blocking forever.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CtlError {
    #[error("{0}")]
    Argument(String),
    #[error("no device found in {}", .0.display())]
    NoDevice(PathBuf),
    #[error("several devices found in {}, choose one with --dev", .0.display())]
    ManyDevices(PathBuf),
    #[error("couldn't connect to {}", .dev.display())]
    Connect {
        dev: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed exchange: {0}")]
    Protocol(#[from] WireError),
    #[error("daemon reported error code {0}")]
    Server(u32),
    #[error("control channel i/o failed")]
    Io(#[from] io::Error),
}

/// One control channel: send a request, receive one reply envelope. The
/// receive side enforces that the reply's type matches the request's.
/// No retries anywhere; every failure surfaces to the caller as-is.
pub trait Channel {
    fn send(&mut self, req: &ControlRequest) -> Result<(), CtlError>;
    fn recv(&mut self, sent: MsgType) -> Result<Reply, CtlError>;
}

impl Channel for UnixStream {
    fn send(&mut self, req: &ControlRequest) -> Result<(), CtlError> {
        self.write_all(&req.encode())?;
        Ok(())
    }

    fn recv(&mut self, sent: MsgType) -> Result<Reply, CtlError> {
        let mut buf = [0u8; MSG_SIZE];
        self.read_exact(&mut buf)?;
        Ok(decode_reply(&buf, sent)?)
    }
}

/// Connect to the control socket for `dev`, or to the only device present
/// when none was named. Zero candidates and ambiguous candidates are
/// distinct failures so the caller can tell the user what to do.
pub fn connect(dev: Option<&str>, rundir: &Path) -> Result<UnixStream, CtlError> {
    let sock = match dev {
        Some(name) => rundir.join(name),
        None => only_device(rundir)?,
    };
    let chan = UnixStream::connect(&sock)
        .map_err(|source| CtlError::Connect { dev: sock.clone(), source })?;
    chan.set_read_timeout(Some(RECV_TIMEOUT))
        .map_err(|source| CtlError::Connect { dev: sock, source })?;
    Ok(chan)
}

fn only_device(rundir: &Path) -> Result<PathBuf, CtlError> {
    let mut found = Vec::new();
    let entries = fs::read_dir(rundir).map_err(|source| CtlError::Connect {
        dev: rundir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_socket() {
            found.push(entry.path());
        }
    }
    match found.len() {
        0 => Err(CtlError::NoDevice(rundir.to_path_buf())),
        1 => Ok(found.remove(0)),
        _ => Err(CtlError::ManyDevices(rundir.to_path_buf())),
    }
}
