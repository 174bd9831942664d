//! Collective sum of the packed partial sums of every rank at the root.

use std::{borrow::Cow, collections::HashSet};

use comms::{
    HEADER_SIZE, MsgReceiver, MsgSender,
    msg::{Command, Msg, Payload},
};
use engine::float::Combine;
use futures::{StreamExt, stream::FuturesUnordered};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{NodeErr, Result};

/// Both ends of the connection with another rank.
pub type Link<R, W> = (MsgReceiver<R>, MsgSender<W>);

/// The largest control or error frame a rank reads.
const MAX_CONTROL_LEN: usize = 4096;

/// Reduces the packed partial sums of a world of ranks with a combine operator.
pub struct Reducer<C: Combine> {
    rank: usize,
    world: usize,
    run: String,
    combine: C,
}

impl<C: Combine> Reducer<C> {
    /// Creates a new `Reducer`.
    ///
    /// # Arguments
    /// * `rank` - The rank of this process, `0` is the root.
    /// * `world` - The amount of ranks of the run.
    /// * `run` - The fingerprint of the run, every rank must share it.
    /// * `combine` - The operator that folds two packets.
    ///
    /// # Returns
    /// The reducer or `NodeErr::RankOutOfWorld` if `rank` isn't below `world`.
    pub fn new(rank: usize, world: usize, run: String, combine: C) -> Result<Self> {
        if rank >= world {
            return Err(NodeErr::RankOutOfWorld { rank, world });
        }

        Ok(Self {
            rank,
            world,
            run,
            combine,
        })
    }

    pub fn is_root(&self) -> bool {
        self.rank == 0
    }

    fn check_packet(&self, rank: usize, packet: &[u8]) -> Result<()> {
        let expected = self.combine.packet_size();
        if packet.len() != expected {
            return Err(NodeErr::PacketSizeMismatch {
                rank,
                got: packet.len(),
                expected,
            });
        }

        Ok(())
    }

    /// Folds the packets of every other rank into the root's own.
    ///
    /// Packets are combined in arrival order and each peer gets a `Disconnect`
    /// as soon as its packet has been folded.
    ///
    /// # Arguments
    /// * `local` - The root's packed partial sum.
    /// * `peers` - One link per non root rank, in any order.
    ///
    /// # Returns
    /// The packed total or the first error found, the offending peer is sent
    /// an `Err` message before returning.
    pub async fn gather<R, W>(&self, local: Vec<u8>, peers: Vec<Link<R, W>>) -> Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.check_packet(self.rank, &local)?;

        let expected_peers = self.world - 1;
        if peers.len() != expected_peers {
            return Err(NodeErr::WorldMismatch {
                rank: self.rank,
                got: peers.len() + 1,
                expected: self.world,
            });
        }

        let mut pending: FuturesUnordered<_> = peers
            .into_iter()
            .map(|(rx, tx)| self.receive_partial(rx, tx))
            .collect();

        let mut seen = HashSet::from([self.rank]);
        let mut total = local;

        while let Some(arrival) = pending.next().await {
            let (rank, packet, mut tx) = arrival?;

            if !seen.insert(rank) {
                let err = NodeErr::DuplicateRank(rank);
                reject(&mut tx, &err).await;
                return Err(err);
            }

            total = self.combine.combine(&total, &packet)?;
            debug!(rank = rank, remaining = expected_peers + 1 - seen.len(); "folded partial sum");

            tx.send(&Msg::Control(Command::Disconnect)).await?;
        }

        info!(world = self.world; "reduction finished");
        Ok(total)
    }

    /// Reads the contribution of a single peer, rejecting it on failure.
    async fn receive_partial<R, W>(
        &self,
        mut rx: MsgReceiver<R>,
        mut tx: MsgSender<W>,
    ) -> Result<(usize, Vec<u8>, MsgSender<W>)>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match self.read_partial(&mut rx).await {
            Ok((rank, packet)) => Ok((rank, packet, tx)),
            Err(err) => {
                reject(&mut tx, &err).await;
                Err(err)
            }
        }
    }

    /// Reads the `Hello` and the packet of a single peer.
    async fn read_partial<R>(&self, rx: &mut MsgReceiver<R>) -> Result<(usize, Vec<u8>)>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        let rank = match rx.recv_into_bounded(&mut buf, MAX_CONTROL_LEN).await? {
            Msg::Control(Command::Hello {
                rank,
                world,
                packet_size,
                run,
            }) => {
                self.check_hello(rank, world, packet_size, run)?;
                rank
            }
            msg => return Err(unexpected("hello", &msg)),
        };

        let max_len = MAX_CONTROL_LEN.max(self.combine.packet_size() + HEADER_SIZE);
        let packet = match rx.recv_into_bounded(&mut buf, max_len).await? {
            Msg::Data(Payload::Partial(packet)) => packet.to_vec(),
            msg => return Err(unexpected("partial", &msg)),
        };
        self.check_packet(rank, &packet)?;

        Ok((rank, packet))
    }

    fn check_hello(
        &self,
        rank: usize,
        world: usize,
        packet_size: usize,
        run: String,
    ) -> Result<()> {
        if world != self.world {
            return Err(NodeErr::WorldMismatch {
                rank,
                got: world,
                expected: self.world,
            });
        }

        if rank == self.rank || rank >= self.world {
            return Err(NodeErr::RankOutOfWorld { rank, world });
        }

        let expected = self.combine.packet_size();
        if packet_size != expected {
            return Err(NodeErr::PacketSizeMismatch {
                rank,
                got: packet_size,
                expected,
            });
        }

        if run != self.run {
            return Err(NodeErr::RunMismatch {
                rank,
                got: run,
                expected: self.run.clone(),
            });
        }

        Ok(())
    }

    /// Sends this rank's packed partial sum to the root and waits to be released.
    ///
    /// # Arguments
    /// * `packet` - This rank's packed partial sum.
    /// * `link` - The connection with the root.
    pub async fn contribute<R, W>(&self, packet: &[u8], link: Link<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.check_packet(self.rank, packet)?;
        let (mut rx, mut tx) = link;

        let hello = Command::Hello {
            rank: self.rank,
            world: self.world,
            packet_size: packet.len(),
            run: self.run.clone(),
        };
        tx.send(&Msg::Control(hello)).await?;
        tx.send(&Msg::Data(Payload::Partial(packet))).await?;
        debug!(rank = self.rank; "partial sum sent to the root");

        let mut buf = Vec::new();
        match rx.recv_into_bounded(&mut buf, MAX_CONTROL_LEN).await? {
            Msg::Control(Command::Disconnect) => Ok(()),
            Msg::Err(reason) => Err(NodeErr::Rejected(reason.into_owned())),
            msg => Err(unexpected("disconnect", &msg)),
        }
    }
}

fn unexpected(expected: &'static str, got: &Msg) -> NodeErr {
    NodeErr::UnexpectedMessage {
        expected,
        got: got.kind(),
    }
}

/// Tells a peer why its contribution was refused, the peer may already be gone.
async fn reject<W: AsyncWrite + Unpin>(tx: &mut MsgSender<W>, err: &NodeErr) {
    let reason = err.to_string();
    warn!("rejecting peer: {reason}");

    if let Err(e) = tx.send(&Msg::Err(Cow::Borrowed(reason.as_str()))).await {
        debug!("couldn't notify the peer: {e}");
    }
}
