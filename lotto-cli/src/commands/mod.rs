pub mod commit;
pub mod history;
pub mod simulate;

pub use commit::{commit, verify};
pub use history::{events, history};
pub use simulate::{simulate, SimulateOptions};
