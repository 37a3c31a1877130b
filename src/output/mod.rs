pub mod formatter;

pub use formatter::{
    format_batch_summary, format_breakdown, format_info, format_row_errors, format_score,
    format_score_result, should_use_colors,
};
