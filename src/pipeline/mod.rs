mod coordinator;
mod dedup;
mod state;

pub use coordinator::ScanPipeline;
pub use dedup::DeliveryCache;
pub use state::ScanStage;
