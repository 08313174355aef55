//! Framed-msgpack transport for the tether bridge: length-prefixed frames
//! over a local TCP connection, with command replies demultiplexed by id and
//! daemon events fanned out on a broadcast channel.

mod codec;
mod transport;

pub use codec::{decode_payload, encode_frame, read_frame, MAX_FRAME_BYTES};
pub use transport::{RpcBridge, RpcBridgeConfig};
