use std::sync::Arc;

use comms::{MsgReceiver, MsgSender};
use engine::{
    Engine, RunConfig,
    float::{BigFloat, PackedSum, Precision, pack, unpack},
    partition::TeamLayout,
    series::FormulaKind,
};
use node::{NodeErr, Reducer, compute_packet};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tokio::io::{self, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

type DuplexLink = (
    MsgReceiver<ReadHalf<DuplexStream>>,
    MsgSender<WriteHalf<DuplexStream>>,
);

const BUF_SIZE: usize = 4096;
const RUN: &str = "test run";

/// Returns the root's end and the leaf's end of an in-memory connection.
fn link() -> (DuplexLink, DuplexLink) {
    let (root, leaf) = io::duplex(BUF_SIZE);
    let (rx, tx) = io::split(root);
    let root = comms::channel(rx, tx);
    let (rx, tx) = io::split(leaf);
    let leaf = comms::channel(rx, tx);
    (root, leaf)
}

fn engine(formula: FormulaKind, processes: usize) -> Arc<Engine> {
    let config = RunConfig::for_digits(formula, 150)
        .unwrap()
        .with_layout(TeamLayout::new(processes, 2).unwrap());

    Arc::new(Engine::new(config).unwrap())
}

/// Returns a reducer for `rank` that runs with `engine`'s configuration.
fn reducer(engine: &Engine, rank: usize) -> Reducer<PackedSum> {
    let config = engine.config();
    Reducer::new(
        rank,
        config.layout.processes(),
        config.fingerprint(),
        PackedSum::new(config.precision),
    )
    .unwrap()
}

#[tokio::test]
async fn three_ranks_match_single_process() {
    const WORLD: usize = 3;

    for formula in [FormulaKind::Bbp, FormulaKind::Bellard] {
        let engine = engine(formula, WORLD);
        let precision = engine.config().precision;

        let mut root_ends = Vec::new();
        let mut leaves = Vec::new();
        for rank in 1..WORLD {
            let (root_end, leaf_end) = link();
            root_ends.push(root_end);

            let engine = engine.clone();
            leaves.push(tokio::spawn(async move {
                let reducer = reducer(&engine, rank);
                let packet = compute_packet(engine, rank).await.unwrap();
                reducer.contribute(&packet, leaf_end).await
            }));
        }

        // Arrival order must not matter.
        root_ends.shuffle(&mut StdRng::seed_from_u64(7));

        let root = reducer(&engine, 0);
        let local = compute_packet(engine.clone(), 0).await.unwrap();
        let total = root.gather(local, root_ends).await.unwrap();

        for leaf in leaves {
            leaf.await.unwrap().unwrap();
        }

        let reduced = engine.assemble(&unpack(&total, precision).unwrap());
        let single = engine.compute().unwrap();

        assert!(
            reduced.agrees_with(&single, 8),
            "{formula:?}: {reduced:?} vs {single:?}"
        );
    }
}

#[tokio::test]
async fn single_rank_reduces_to_its_own_packet() {
    let engine = engine(FormulaKind::Bellard, 1);

    let root = reducer(&engine, 0);
    let local = compute_packet(engine.clone(), 0).await.unwrap();

    let total = root
        .gather(local.clone(), Vec::<DuplexLink>::new())
        .await
        .unwrap();
    assert_eq!(total, local);
}

#[tokio::test]
async fn mismatched_packet_size_is_rejected() {
    let precision = Precision::new(256).unwrap();
    let other = Precision::new(512).unwrap();

    let (root_end, leaf_end) = link();

    let leaf = tokio::spawn(async move {
        let reducer = Reducer::new(1, 2, RUN.to_string(), PackedSum::new(other)).unwrap();
        let packet = pack(&BigFloat::from_u64(1, other));
        reducer.contribute(&packet, leaf_end).await
    });

    let root = Reducer::new(0, 2, RUN.to_string(), PackedSum::new(precision)).unwrap();
    let local = pack(&BigFloat::from_u64(1, precision));
    let err = root.gather(local, vec![root_end]).await.unwrap_err();
    assert!(matches!(err, NodeErr::PacketSizeMismatch { rank: 1, .. }));

    let err = leaf.await.unwrap().unwrap_err();
    assert!(matches!(err, NodeErr::Rejected(_)));
}

#[tokio::test]
async fn duplicate_rank_is_rejected() {
    let precision = Precision::new(128).unwrap();
    let packet = pack(&BigFloat::from_u64(3, precision));

    let (first_root, first_leaf) = link();
    let (second_root, second_leaf) = link();

    let mut leaves = Vec::new();
    for leaf_end in [first_leaf, second_leaf] {
        let packet = packet.clone();
        leaves.push(tokio::spawn(async move {
            let reducer =
                Reducer::new(1, 3, RUN.to_string(), PackedSum::new(precision)).unwrap();
            reducer.contribute(&packet, leaf_end).await
        }));
    }

    let root = Reducer::new(0, 3, RUN.to_string(), PackedSum::new(precision)).unwrap();
    let err = root
        .gather(packet.clone(), vec![first_root, second_root])
        .await
        .unwrap_err();
    assert!(matches!(err, NodeErr::DuplicateRank(1)));

    let mut rejected = 0;
    for leaf in leaves {
        if matches!(leaf.await.unwrap(), Err(NodeErr::Rejected(_))) {
            rejected += 1;
        }
    }
    assert_eq!(rejected, 1);
}

#[tokio::test]
async fn rank_of_another_run_is_rejected() {
    let root_engine = engine(FormulaKind::Bbp, 2);
    let leaf_engine = engine(FormulaKind::Bellard, 2);
    assert_eq!(
        root_engine.config().precision,
        leaf_engine.config().precision
    );

    let (root_end, leaf_end) = link();

    let leaf = tokio::spawn(async move {
        let reducer = reducer(&leaf_engine, 1);
        let packet = compute_packet(leaf_engine, 1).await.unwrap();
        reducer.contribute(&packet, leaf_end).await
    });

    let root = reducer(&root_engine, 0);
    let local = compute_packet(root_engine, 0).await.unwrap();
    let err = root.gather(local, vec![root_end]).await.unwrap_err();
    assert!(matches!(err, NodeErr::RunMismatch { rank: 1, .. }));

    let err = leaf.await.unwrap().unwrap_err();
    assert!(matches!(err, NodeErr::Rejected(_)));
}

#[tokio::test]
async fn oversized_frame_is_refused() {
    let precision = Precision::new(128).unwrap();

    let (root, mut peer) = io::duplex(BUF_SIZE);
    let (rx, tx) = io::split(root);
    let root_end = comms::channel(rx, tx);

    peer.write_all(&(1u64 << 63).to_be_bytes()).await.unwrap();

    let reducer = Reducer::new(0, 2, RUN.to_string(), PackedSum::new(precision)).unwrap();
    let local = pack(&BigFloat::from_u64(1, precision));
    let err = reducer.gather(local, vec![root_end]).await.unwrap_err();

    let NodeErr::Io(err) = err else {
        panic!("expected an io error, got {err:?}");
    };
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}
