//! Stateful coordination: the repository, its clock, and the services it
//! plans writes and answers queries with.

pub mod clock;
pub mod repository;
pub mod services;

pub use clock::{Clock, FixedClock, SystemClock};
pub use repository::TransactionRepository;
