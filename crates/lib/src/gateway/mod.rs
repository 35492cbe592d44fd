//! Gateway: the HTTP request surface of the relay.
//!
//! Three routes: start a job conversation, continue one, and poll a run's
//! status (dispatching tool calls on demand). Plus a health probe on `/`.

mod protocol;
mod server;

pub use protocol::{FunctionResult, ProcessRequest, StartRequest, StartResponse, StatusResponse};
pub use server::run_gateway;
