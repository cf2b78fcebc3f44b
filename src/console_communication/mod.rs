//! Network surface of the ground station: the operator console endpoint with
//! its protobuf messages and the messenger bridging it to the simulation, plus
//! the pass-through relay group for peer links.

mod console_endpoint;
mod console_messenger;
mod framing;
mod gcs_messages;
mod relay_endpoint;
#[cfg(test)]
mod tests;

pub(crate) use console_messenger::ConsoleMessenger;
pub(crate) use relay_endpoint::RelayEndpoint;
