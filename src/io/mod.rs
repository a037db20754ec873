/// CSV export of recorded channels.
pub mod export;
