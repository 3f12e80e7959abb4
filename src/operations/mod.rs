pub mod op_helper;
pub mod count_op;
pub mod recall_op;
pub mod snapshot_op;
pub mod reprocess_op;
