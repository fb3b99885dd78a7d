use std::fmt;
use std::io::ErrorKind;
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::node::address::{AddressError, NodeAddr};
use crate::utils::constants::REQUEST_TIMEOUT_MILLIS;
use crate::utils::crypto::Key;

/// Acknowledgment for state changes and for anything unparseable.
pub static ACK: &str = "Done";

/// Liveness token answered to `Alive` probes.
pub static ALIVE: &str = "Alive";

/// One request line of the peer protocol. Fields are joined by `:`;
/// the whole exchange is one line out, one line back, one TCP
/// connection per request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    YourSuccessor,
    YourPredecessor,
    FindSuccessor(Key),
    FindPredecessor(Key),
    ChangeSuccessor(NodeAddr),
    ChangePredecessor(NodeAddr),
    UpdateIthFinger(usize, NodeAddr),
    TransferKeys(Key, Key),
    Notify(NodeAddr),
    Alive,
}

#[derive(Debug, Error)]
pub enum ParseRequestError {
    #[error("empty request line")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("missing argument for {0}")]
    MissingArgument(&'static str),
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("invalid finger index {0:?}")]
    InvalidIndex(String),
    #[error(transparent)]
    MalformedAddress(#[from] AddressError),
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::YourSuccessor => write!(f, "YourSuccessor"),
            Request::YourPredecessor => write!(f, "YourPredecessor"),
            Request::FindSuccessor(id) => write!(f, "FindSuccessor:{}", id),
            Request::FindPredecessor(id) => write!(f, "FindPredecessor:{}", id),
            Request::ChangeSuccessor(addr) => write!(f, "ChangeSuccessor:{}", addr),
            Request::ChangePredecessor(addr) => write!(f, "ChangePredecessor:{}", addr),
            Request::UpdateIthFinger(i, addr) => write!(f, "UpdateithFinger:{}:{}", i, addr),
            Request::TransferKeys(first, second) => write!(f, "TransferKeys:{}:{}", first, second),
            Request::Notify(addr) => write!(f, "Notify:{}", addr),
            Request::Alive => write!(f, "Alive"),
        }
    }
}

impl FromStr for Request {
    type Err = ParseRequestError;

    fn from_str(line: &str) -> Result<Request, ParseRequestError> {
        let (command, rest) = match line.split_once(':') {
            Some((command, rest)) => (command, Some(rest)),
            None => (line, None),
        };
        match command {
            "" => Err(ParseRequestError::Empty),
            "YourSuccessor" => Ok(Request::YourSuccessor),
            "YourPredecessor" => Ok(Request::YourPredecessor),
            "FindSuccessor" => {
                let id = parse_key(rest.ok_or(ParseRequestError::MissingArgument("FindSuccessor"))?)?;
                Ok(Request::FindSuccessor(id))
            }
            "FindPredecessor" => {
                let id = parse_key(rest.ok_or(ParseRequestError::MissingArgument("FindPredecessor"))?)?;
                Ok(Request::FindPredecessor(id))
            }
            "ChangeSuccessor" => {
                let addr = rest.ok_or(ParseRequestError::MissingArgument("ChangeSuccessor"))?;
                Ok(Request::ChangeSuccessor(addr.parse()?))
            }
            "ChangePredecessor" => {
                let addr = rest.ok_or(ParseRequestError::MissingArgument("ChangePredecessor"))?;
                Ok(Request::ChangePredecessor(addr.parse()?))
            }
            "UpdateithFinger" => {
                let rest = rest.ok_or(ParseRequestError::MissingArgument("UpdateithFinger"))?;
                let (index, addr) = rest
                    .split_once(':')
                    .ok_or(ParseRequestError::MissingArgument("UpdateithFinger"))?;
                let index = index
                    .parse::<usize>()
                    .map_err(|_| ParseRequestError::InvalidIndex(index.to_string()))?;
                Ok(Request::UpdateIthFinger(index, addr.parse()?))
            }
            "TransferKeys" => {
                let rest = rest.ok_or(ParseRequestError::MissingArgument("TransferKeys"))?;
                let (first, second) = rest
                    .split_once(':')
                    .ok_or(ParseRequestError::MissingArgument("TransferKeys"))?;
                Ok(Request::TransferKeys(parse_key(first)?, parse_key(second)?))
            }
            "Notify" => {
                let addr = rest.ok_or(ParseRequestError::MissingArgument("Notify"))?;
                Ok(Request::Notify(addr.parse()?))
            }
            "Alive" => Ok(Request::Alive),
            other => Err(ParseRequestError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_key(s: &str) -> Result<Key, ParseRequestError> {
    s.parse::<Key>()
        .map_err(|_| ParseRequestError::InvalidKey(s.to_string()))
}

/// Sends one request line to `addr` and waits for the response line.
/// Any socket, I/O, or timeout failure yields `None`; the caller
/// reads that as the peer being unreachable. The transport itself
/// never retries.
pub async fn send_request(addr: &NodeAddr, request: &Request) -> Option<String> {
    let deadline = Duration::from_millis(REQUEST_TIMEOUT_MILLIS);
    match timeout(deadline, exchange(addr, request)).await {
        Ok(Ok(response)) => Some(response),
        Ok(Err(err)) => {
            debug!("Request {} to {} failed: {}", request, addr, err);
            None
        }
        Err(_) => {
            debug!("Request {} to {} timed out", request, addr);
            None
        }
    }
}

async fn exchange(addr: &NodeAddr, request: &Request) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr.socket_addr()).await?;
    stream.write_all(format!("{}\n", request).as_bytes()).await?;

    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    if reader.read_line(&mut response).await? == 0 {
        return Err(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            "peer closed the connection before responding",
        ));
    }
    Ok(response.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> NodeAddr {
        NodeAddr::new("localhost", port).unwrap()
    }

    #[test]
    fn wire_form_matches_the_grammar() {
        assert_eq!(Request::YourSuccessor.to_string(), "YourSuccessor");
        assert_eq!(Request::FindSuccessor(12).to_string(), "FindSuccessor:12");
        assert_eq!(
            Request::Notify(addr(9000)).to_string(),
            "Notify:localhost/127.0.0.1:9000"
        );
        assert_eq!(
            Request::UpdateIthFinger(3, addr(9001)).to_string(),
            "UpdateithFinger:3:localhost/127.0.0.1:9001"
        );
        assert_eq!(Request::TransferKeys(12, 5).to_string(), "TransferKeys:12:5");
    }

    #[test]
    fn requests_round_trip() {
        let requests = [
            Request::YourSuccessor,
            Request::YourPredecessor,
            Request::FindSuccessor(0),
            Request::FindPredecessor(31),
            Request::ChangeSuccessor(addr(9002)),
            Request::ChangePredecessor(addr(9003)),
            Request::UpdateIthFinger(0, addr(9004)),
            Request::TransferKeys(7, 30),
            Request::Notify(addr(9005)),
            Request::Alive,
        ];
        for request in requests {
            let parsed: Request = request.to_string().parse().unwrap();
            assert_eq!(parsed, request);
        }
    }

    #[test]
    fn address_arguments_keep_their_inner_colons() {
        let parsed: Request = "Notify:localhost/127.0.0.1:9000".parse().unwrap();
        assert_eq!(parsed, Request::Notify(addr(9000)));
        let parsed: Request = "UpdateithFinger:4:localhost/127.0.0.1:9001".parse().unwrap();
        assert_eq!(parsed, Request::UpdateIthFinger(4, addr(9001)));
    }

    #[test]
    fn unknown_commands_are_reported() {
        match "NoSuchCommand:1".parse::<Request>() {
            Err(ParseRequestError::UnknownCommand(command)) => assert_eq!(command, "NoSuchCommand"),
            other => panic!("unexpected parse result {:?}", other),
        }
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert!("FindSuccessor".parse::<Request>().is_err());
        assert!("FindSuccessor:xyz".parse::<Request>().is_err());
        assert!("UpdateithFinger:one:localhost/127.0.0.1:9000".parse::<Request>().is_err());
        assert!("TransferKeys:5".parse::<Request>().is_err());
        assert!("Notify:nonsense".parse::<Request>().is_err());
        assert!("".parse::<Request>().is_err());
    }
}
