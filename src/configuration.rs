use crate::availability::SlotGrid;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn password(&self) -> String;
    fn port(&self) -> String;
    fn slot_grid(&self) -> SlotGrid;
    fn seed_example_courts(&self) -> bool;
}
