use std::{io, net::SocketAddr};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
    specs::worker::{InvocationSpec, WorkerResponse},
};
use log::debug;
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use super::Invoker;
use crate::{LauncherErr, Result};

type NetRx = OnoReceiver<OwnedReadHalf>;
type NetTx = OnoSender<OwnedWriteHalf>;

/// Sends invocations to worker nodes over the framed channel, slot `i` goes to
/// `addrs[i % addrs.len()]`.
#[derive(Debug, Clone)]
pub struct TcpInvoker {
    addrs: Vec<SocketAddr>,
}

impl TcpInvoker {
    /// Creates a new `TcpInvoker`.
    ///
    /// # Arguments
    /// * `addrs` - The network addresses of the worker nodes, must not be empty.
    pub fn new(addrs: Vec<SocketAddr>) -> Result<Self> {
        if addrs.is_empty() {
            return Err(LauncherErr::InvalidConfig(
                "at least one worker node address is required".into(),
            ));
        }

        Ok(Self { addrs })
    }

    /// The node serving `slot`.
    pub fn addr_for(&self, slot: usize) -> SocketAddr {
        self.addrs[slot % self.addrs.len()]
    }

    /// Opens a new channel with the node at `addr`.
    async fn open_channel(addr: SocketAddr) -> io::Result<(NetRx, NetTx)> {
        let stream = TcpStream::connect(addr).await?;
        let (rx, tx) = stream.into_split();
        Ok(comms::channel(rx, tx))
    }

    async fn round_trip(addr: SocketAddr, spec: InvocationSpec) -> io::Result<WorkerResponse> {
        let (mut rx, mut tx) = Self::open_channel(addr).await?;

        let msg = Msg::Control(Command::Invoke(spec));
        tx.send(&msg).await?;

        let mut rx_buf = Vec::new();
        match rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::Respond(response)) => Ok(response),
            Msg::Err(e) => Err(io::Error::other(format!("worker node rejected the invocation: {e}"))),
            msg => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("received an invalid msg kind: {msg:?}"),
            )),
        }
    }
}

impl Invoker for TcpInvoker {
    async fn invoke(&self, spec: InvocationSpec) -> Result<WorkerResponse> {
        let slot = spec.slot;
        let addr = self.addr_for(slot);
        debug!(slot = slot, resume_epoch = spec.resume_epoch; "invoking worker node at {addr}");

        Self::round_trip(addr, spec)
            .await
            .map_err(|source| LauncherErr::Invoke { slot, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_spread_over_the_nodes() {
        let addrs: Vec<SocketAddr> = vec![
            "127.0.0.1:9000".parse().unwrap(),
            "127.0.0.1:9001".parse().unwrap(),
        ];
        let invoker = TcpInvoker::new(addrs.clone()).unwrap();

        assert_eq!(invoker.addr_for(0), addrs[0]);
        assert_eq!(invoker.addr_for(1), addrs[1]);
        assert_eq!(invoker.addr_for(2), addrs[0]);
    }

    #[test]
    fn empty_node_list_is_rejected() {
        assert!(matches!(
            TcpInvoker::new(Vec::new()),
            Err(LauncherErr::InvalidConfig(_))
        ));
    }
}
