//! Noisy bit-level modulation of V2V messages.
//!
//! Each bit of the serialized message becomes a single sample drawn from a
//! zero-centered Gaussian whose spread depends on the bit:
//!
//! ```text
//! bit 1:  N(0, base_sigma) + N(0, one_sigma)    (wide)
//! bit 0:  N(0, base_sigma) + N(0, zero_sigma)   (narrow)
//! ```
//!
//! The receiver only sees amplitudes, so it classifies a sample as `1` when
//! `|sample| > decode_threshold`. With the default profile a sizeable share of
//! bits flip in both directions and most messages fail to decode. Listeners
//! treat that as normal background loss.

use crate::communication::messages::Message;
use crate::config::ChannelProfile;
use crate::error::{DecodeError, V2vError, V2vResult};
use crate::global_variables::{BITS_PER_BYTE, WIRE_VERSION};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;

/// Sampled waveform of one transmitted message. Immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Arc<[f64]>,
}

impl Signal {
    pub fn from_samples(samples: Vec<f64>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Encoder/decoder pair bound to one channel profile and one random source.
pub struct SignalCodec {
    threshold: f64,
    base: Normal<f64>,
    one: Normal<f64>,
    zero: Normal<f64>,
    rng: StdRng,
}

impl SignalCodec {
    /// Codec with a deterministic noise stream.
    pub fn seeded(profile: &ChannelProfile, seed: u64) -> V2vResult<Self> {
        Self::with_rng(profile, StdRng::seed_from_u64(seed))
    }

    /// Codec drawing its noise stream from OS entropy.
    pub fn from_entropy(profile: &ChannelProfile) -> V2vResult<Self> {
        Self::with_rng(profile, StdRng::from_os_rng())
    }

    pub fn with_rng(profile: &ChannelProfile, rng: StdRng) -> V2vResult<Self> {
        profile.validate()?;
        Ok(Self {
            threshold: profile.decode_threshold,
            base: normal(profile.base_sigma)?,
            one: normal(profile.one_sigma)?,
            zero: normal(profile.zero_sigma)?,
            rng,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Draws the amplitude that carries a single bit.
    pub fn sample_bit(&mut self, bit: bool) -> f64 {
        let base = self.base.sample(&mut self.rng);
        if bit {
            base + self.one.sample(&mut self.rng)
        } else {
            base + self.zero.sample(&mut self.rng)
        }
    }

    /// Serializes `message` and modulates it, most significant bit first.
    pub fn encode(&mut self, message: &Message) -> V2vResult<Signal> {
        let bytes = serde_json::to_vec(message).map_err(V2vError::Encode)?;
        Ok(self.modulate(&bytes))
    }

    pub fn modulate(&mut self, bytes: &[u8]) -> Signal {
        let mut samples = Vec::with_capacity(bytes.len() * BITS_PER_BYTE);
        for &byte in bytes {
            for shift in (0..BITS_PER_BYTE).rev() {
                let bit = (byte >> shift) & 1 == 1;
                samples.push(self.sample_bit(bit));
            }
        }
        Signal::from_samples(samples)
    }

    pub fn decode(&self, signal: &Signal) -> Result<Message, DecodeError> {
        decode_signal(signal, self.threshold)
    }
}

fn normal(sigma: f64) -> V2vResult<Normal<f64>> {
    Normal::new(0.0, sigma).map_err(|e| V2vError::Noise(format!("sigma {}: {}", sigma, e)))
}

/// Hard decision on a single sample.
pub fn classify_sample(sample: f64, threshold: f64) -> bool {
    sample.abs() > threshold
}

/// Recovers bytes from a signal. A trailing group of fewer than eight samples
/// is dropped.
pub fn demodulate(signal: &Signal, threshold: f64) -> Vec<u8> {
    signal
        .samples()
        .chunks_exact(BITS_PER_BYTE)
        .map(|group| {
            group.iter().fold(0u8, |byte, &sample| {
                (byte << 1) | classify_sample(sample, threshold) as u8
            })
        })
        .collect()
}

/// Full receive path: demodulate, check the text, parse the versioned record.
pub fn decode_signal(signal: &Signal, threshold: f64) -> Result<Message, DecodeError> {
    if signal.len() < BITS_PER_BYTE {
        return Err(DecodeError::TooShort(signal.len()));
    }
    let text = String::from_utf8(demodulate(signal, threshold))?;
    let message: Message = serde_json::from_str(&text)?;
    if message.version != WIRE_VERSION {
        return Err(DecodeError::UnsupportedVersion(message.version));
    }
    Ok(message)
}
