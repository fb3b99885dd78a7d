use std::sync::Arc;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::node::Node;
use crate::protocol::{Request, ACK, ALIVE};

/// Accepts peer connections for the node until `stop` is signalled.
/// Every connection is served by its own task so a slow handler
/// never blocks the acceptor.
pub async fn serve(node: Arc<Node>, listener: TcpListener) {
    info!("Listening for peer requests on {}", node.addr());

    // One pinned future for the whole loop; a fresh notified() per
    // iteration could miss a signal sent between registrations.
    let shutdown = node.shutdown_signal().notified();
    tokio::pin!(shutdown);

    while node.is_active() {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let node = node.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(node, stream).await {
                                debug!("Connection error: {}", err);
                            }
                        });
                    }
                    Err(err) => warn!("Failed to accept connection: {}", err),
                }
            }
        }
    }
    info!("Request handler on {} has stopped", node.addr());
}

/// One request line in, one response line out, then the connection
/// closes. Errors here end this request only.
async fn handle_connection(node: Arc<Node>, stream: TcpStream) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }

    let response = process(&node, line.trim_end()).await;

    let mut stream = reader.into_inner();
    stream.write_all(format!("{}\n", response).as_bytes()).await?;
    Ok(())
}

async fn process(node: &Arc<Node>, line: &str) -> String {
    let request = match line.parse::<Request>() {
        Ok(request) => request,
        Err(err) => {
            // The benign ack keeps a confused caller from reading
            // this node as dead.
            warn!("Answering malformed request {:?} with ack: {}", line, err);
            return ACK.to_string();
        }
    };
    debug!("Serving request {}", request);

    match request {
        Request::YourSuccessor => node.successor().to_string(),
        Request::YourPredecessor => node.predecessor().to_string(),
        Request::FindSuccessor(id) => node.find_successor(id).await.to_string(),
        Request::FindPredecessor(id) => node.find_predecessor(id).await.to_string(),
        Request::ChangeSuccessor(addr) => {
            node.change_successor(addr);
            ACK.to_string()
        }
        Request::ChangePredecessor(addr) => {
            node.change_predecessor(addr);
            ACK.to_string()
        }
        Request::UpdateIthFinger(i, addr) => {
            node.update_ith_finger(i, addr).await;
            ACK.to_string()
        }
        Request::TransferKeys(first, second) => node.transfer_keys(first, second),
        Request::Notify(addr) => {
            node.notify(addr).await;
            ACK.to_string()
        }
        Request::Alive => ALIVE.to_string(),
    }
}
