use crate::communication::messages::{Message, MessageBody, VehicleId};
use crate::error::V2vResult;
use crate::monitoring::event_log::{AdasEvent, AdasEventKind, EventSink};
use log::{debug, warn};

/// The reaction capability a listener exposes to the dispatcher.
pub trait EmergencyResponder {
    fn vehicle_id(&self) -> &VehicleId;

    /// Brakes hard. Returns `true` when a new EMERGENCY_BRAKE went out.
    fn emergency_brake(&self) -> V2vResult<bool>;
}

/// Outcome of dispatching one decoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    StatusReported,
    EmergencyBrakeEngaged { rebroadcast: bool },
    /// The listener heard its own transmission.
    OwnEcho,
    /// The brake reaction could not be re-announced.
    ReactionFailed,
}

/// Classifies `message` and runs the matching reaction.
///
/// STATUS only produces an event; EMERGENCY_BRAKE makes the responder brake
/// and re-announce. Exactly one event reaches `sink` per message from another
/// vehicle.
pub fn dispatch<R>(responder: &R, message: &Message, sink: &dyn EventSink) -> Dispatch
where
    R: EmergencyResponder + ?Sized,
{
    let listener = responder.vehicle_id();
    if &message.sender_id == listener {
        debug!("[ADAS {}] ignoring own {}", listener, message.kind());
        return Dispatch::OwnEcho;
    }

    match &message.body {
        MessageBody::Status { speed_mps, .. } => {
            sink.record(&AdasEvent::new(
                listener,
                &message.sender_id,
                AdasEventKind::Status {
                    speed_mps: *speed_mps,
                },
            ));
            Dispatch::StatusReported
        }
        MessageBody::EmergencyBrake => {
            let (outcome, rebroadcast) = match responder.emergency_brake() {
                Ok(rebroadcast) => (Dispatch::EmergencyBrakeEngaged { rebroadcast }, rebroadcast),
                Err(e) => {
                    warn!("[ADAS {}] failed to re-announce emergency brake: {}", listener, e);
                    (Dispatch::ReactionFailed, false)
                }
            };
            sink.record(&AdasEvent::new(
                listener,
                &message.sender_id,
                AdasEventKind::EmergencyBrake { rebroadcast },
            ));
            outcome
        }
    }
}
