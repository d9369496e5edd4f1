//! Thread synchronization primitives bridging plugin worker threads to
//! the dispatch loop.

pub mod rendezvous;
pub mod update_queue;

pub use rendezvous::{channel, ChannelState, Consumer, Producer};
pub use update_queue::UpdateQueue;
