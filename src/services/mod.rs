pub mod answer_sheet;
pub mod persistence;
pub mod review_api;
pub mod session_store;
