//! Integration tests for deploywatch

mod test_logs;
mod test_pipeline_flow;
mod test_polling;
mod test_store;
mod test_stream;
