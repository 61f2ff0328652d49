pub mod channel;
pub mod codec;
pub mod messages;

pub use channel::{ChannelTap, OpticalChannel};
pub use codec::{decode_signal, Signal, SignalCodec};
pub use messages::{Message, MessageBody, MessageKind, VehicleId};
