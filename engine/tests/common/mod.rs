use std::sync::Arc;

use engine::partition::WorkRateTable;

pub fn reference() -> &'static str {
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../resources/pi_reference.txt"))
}

pub fn rates() -> Arc<WorkRateTable> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../resources/work_rates.txt");
    Arc::new(WorkRateTable::load(path).unwrap())
}
