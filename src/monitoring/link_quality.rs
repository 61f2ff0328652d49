use crate::communication::codec::{classify_sample, SignalCodec};
use crate::communication::messages::{Message, MessageKind};
use crate::config::ChannelProfile;
use crate::error::V2vResult;
use serde::Serialize;

/// Monte-Carlo estimate of how a channel profile treats bits and messages.
#[derive(Debug, Clone, Serialize)]
pub struct LinkQuality {
    /// Share of `1` bits read back as `1`.
    pub one_detect_rate: f64,
    /// Share of `0` bits read back as `1`.
    pub false_one_rate: f64,
    /// Share of whole messages that decoded with the right type and sender.
    pub message_success_rate: f64,
    pub bit_draws: usize,
    pub message_trials: usize,
}

pub fn measure_link_quality(
    profile: &ChannelProfile,
    probe: &Message,
    bit_draws: usize,
    message_trials: usize,
    seed: u64,
) -> V2vResult<LinkQuality> {
    let mut codec = SignalCodec::seeded(profile, seed)?;
    let threshold = profile.decode_threshold;

    let mut ones_detected = 0usize;
    let mut false_ones = 0usize;
    for _ in 0..bit_draws {
        if classify_sample(codec.sample_bit(true), threshold) {
            ones_detected += 1;
        }
        if classify_sample(codec.sample_bit(false), threshold) {
            false_ones += 1;
        }
    }

    let expected_kind: MessageKind = probe.kind();
    let mut successes = 0usize;
    for _ in 0..message_trials {
        let signal = codec.encode(probe)?;
        if let Ok(decoded) = codec.decode(&signal) {
            if decoded.kind() == expected_kind && decoded.sender_id == probe.sender_id {
                successes += 1;
            }
        }
    }

    Ok(LinkQuality {
        one_detect_rate: ratio(ones_detected, bit_draws),
        false_one_rate: ratio(false_ones, bit_draws),
        message_success_rate: ratio(successes, message_trials),
        bit_draws,
        message_trials,
    })
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
