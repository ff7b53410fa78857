//! Controller adapter
//!
//! Lets an external provisioning controller drive the provisioner over a
//! line-oriented JSON stream. Watching, queueing and retries stay with the
//! controller.

pub mod protocol;
mod session;

pub use protocol::{Greeting, Request, Response, Status};
pub use session::{execute, serve};
