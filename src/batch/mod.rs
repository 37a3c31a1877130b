pub mod coordinator;
pub mod table;

pub use coordinator::{
    BatchCoordinator, BatchResult, BatchStats, Outcome, ProcessorInfo, RowOutcome,
    DEFAULT_WORKERS, MAX_WORKERS, STATUS_ERROR, STATUS_SUCCESS,
};
pub use table::{Table, OPTIONAL_COLUMNS, REQUIRED_COLUMNS, RESULT_COLUMNS};
