//! Cart Repositories

mod lines;
mod summaries;

pub(crate) use lines::{InsertOutcome, PgCartLinesRepository};
pub(crate) use summaries::PgCartSummariesRepository;
