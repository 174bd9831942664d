use std::{borrow::Cow, io};

use crate::{
    Deserialize, Serialize,
    protocol::{CONTROL, ERR, HEADER_SIZE, HeaderType, PARTIAL},
};

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug, PartialEq, Eq)]
pub enum Payload<'a> {
    /// A packed partial sum, opaque to the transport.
    Partial(&'a [u8]),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Sent by every non root rank before its partial sum.
    ///
    /// `run` describes how the partial sum was computed, the root refuses a
    /// rank whose description differs from its own.
    Hello {
        rank: usize,
        world: usize,
        packet_size: usize,
        run: String,
    },
    /// Sent by the root once a rank's contribution has been folded.
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug, PartialEq, Eq)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// Returns a short name of the message, without its payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::Hello { .. }) => "hello",
            Msg::Control(Command::Disconnect) => "disconnect",
            Msg::Data(Payload::Partial(_)) => "partial",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("the given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: HeaderType) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("received an invalid kind header {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR);
                Ok(Some(e.as_bytes()))
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL);
                serde_json::to_writer(buf, cmd)?;
                Ok(None)
            }
            Msg::Data(Payload::Partial(packet)) => {
                buf.extend_from_slice(&PARTIAL);
                Ok(Some(packet))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        let Some((header, rest)) = buf.split_first_chunk::<HEADER_SIZE>() else {
            return Self::buf_is_too_small(buf.len());
        };

        match *header {
            ERR => {
                let string = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            PARTIAL => Ok(Self::Data(Payload::Partial(rest))),
            other => Self::invalid_kind(HeaderType::from_be_bytes(other)),
        }
    }
}
