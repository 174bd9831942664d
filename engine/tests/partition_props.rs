//! Property tests for the work partitioner: every strategy must visit each
//! index of `[0, N)` exactly once.

use std::sync::Arc;

use engine::partition::{
    Distribution, TeamLayout, WorkRange, WorkRateTable, cyclic, partition,
};
use proptest::prelude::*;

fn rates() -> Arc<WorkRateTable> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../resources/work_rates.txt");
    Arc::new(WorkRateTable::load(path).unwrap())
}

fn covers_exactly(ranges: &[WorkRange], total: u64) -> bool {
    let mut hits = vec![0u8; total as usize];
    for index in ranges.iter().flat_map(WorkRange::indices) {
        match hits.get_mut(index as usize) {
            Some(hit) => *hit += 1,
            None => return false,
        }
    }

    hits.iter().all(|&hit| hit == 1)
}

proptest! {
    #[test]
    fn prop_even_blocks_partition_range(workers in 1usize..64, extra in 0u64..500) {
        let total = workers as u64 + extra;
        let ranges: Vec<_> = (0..workers)
            .map(|w| partition(workers, w, total).unwrap())
            .collect();

        prop_assert!(covers_exactly(&ranges, total));
        prop_assert_eq!(ranges.last().unwrap().end, total);

        let min = ranges.iter().map(WorkRange::len).min().unwrap();
        let max = ranges.iter().map(WorkRange::len).max().unwrap();
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn prop_cyclic_partitions_range(workers in 1usize..64, extra in 0u64..500) {
        let total = workers as u64 + extra;
        let ranges: Vec<_> = (0..workers)
            .map(|w| cyclic(workers, w, total).unwrap())
            .collect();

        prop_assert!(covers_exactly(&ranges, total));
    }

    #[test]
    fn prop_fewer_iterations_than_workers_is_rejected(workers in 2usize..64) {
        let total = workers as u64 - 1;
        prop_assert!(partition(workers, 0, total).is_err());
        prop_assert!(cyclic(workers, 0, total).is_err());
    }

    #[test]
    fn prop_hybrid_block_and_cyclic_partition_range(
        processes in 1usize..6,
        threads in 1usize..6,
        extra in 0u64..300,
    ) {
        let layout = TeamLayout::new(processes, threads).unwrap();
        let total = layout.workers() as u64 + extra;

        for distribution in [Distribution::Block, Distribution::Cyclic] {
            let ranges: Vec<_> = (0..processes)
                .flat_map(|p| distribution.thread_ranges(layout, p, total).unwrap())
                .collect();

            prop_assert_eq!(ranges.len(), layout.workers());
            prop_assert!(covers_exactly(&ranges, total));
        }
    }

    #[test]
    fn prop_skewed_blocks_are_contiguous(
        layout in prop_oneof![
            Just((1usize, 1usize)),
            Just((1, 2)),
            Just((2, 1)),
            Just((1, 4)),
            Just((2, 2)),
            Just((4, 1)),
            Just((2, 4)),
            Just((3, 4)),
            Just((4, 3)),
            Just((4, 4)),
            Just((8, 2)),
        ],
        extra in 0u64..2000,
    ) {
        let (processes, threads) = layout;
        let layout = TeamLayout::new(processes, threads).unwrap();
        let total = layout.workers() as u64 + extra;
        let distribution = Distribution::Skewed(rates());

        let ranges: Vec<_> = (0..processes)
            .flat_map(|p| distribution.thread_ranges(layout, p, total).unwrap())
            .collect();

        prop_assert!(covers_exactly(&ranges, total));
        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        prop_assert_eq!(ranges.last().unwrap().end, total);
    }
}
