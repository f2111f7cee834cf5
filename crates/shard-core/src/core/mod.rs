pub mod affinity;
pub mod reassembly;
pub mod sink;

pub use reassembly::{Drained, ReassemblyBuffer};
pub use sink::{ErrorRecord, ErrorSink};
