use std::{borrow::Cow, io};

use crate::{
    Deserialize, Serialize,
    specs::worker::{InvocationSpec, WorkerResponse},
};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Invoke(InvocationSpec),
    Respond(WorkerResponse),
}

/// The application layer message spoken between the launcher and worker nodes.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind_byte<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&(0 as Header).to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                let start = buf.len();
                buf.extend_from_slice(&(1 as Header).to_be_bytes());

                if let Err(e) = serde_json::to_writer(&mut *buf, cmd) {
                    // Only reachable if a `Command` field fails to serialize, report it in-band.
                    buf.truncate(start);
                    buf.extend_from_slice(&(0 as Header).to_be_bytes());
                    buf.extend_from_slice(e.to_string().as_bytes());
                }

                None
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        let Some((kind_buf, rest)) = buf.split_first_chunk::<HEADER_SIZE>() else {
            return Self::buf_is_too_small(buf.len());
        };

        match Header::from_be_bytes(*kind_buf) {
            0 => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            1 => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            kind => Self::invalid_kind_byte(kind),
        }
    }
}
