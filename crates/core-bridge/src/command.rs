use thiserror::Error;

use crate::status::CONNECTED_MAX;

/// Most commands a single batch on the field bus can carry.
pub const COMMAND_MAX_COUNT: usize = 15;

/// Output value meaning "no command" for a slot. Encoded as an explicit zero
/// command, never omitted: omission and explicit-zero have different safety
/// semantics on the receiving actuator.
pub const DISARMED_OUTPUT_VALUE: u16 = u16::MAX;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("gateway link down")]
    Disconnected,
    #[error("transmit queue full")]
    QueueFull,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// One per-slot command within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub actuator_id: u8,
    pub value: u16,
}

/// Ordered command batch for one broadcast. Every in-range slot always gets
/// an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    pub commands: Vec<ActuatorCommand>,
}

/// Outbound side of the field-bus boundary. Best-effort: no acknowledgment is
/// awaited and the broadcaster never retries.
pub trait CommandSink {
    fn send(&mut self, batch: &CommandBatch) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    RateLimited,
}

/// Rate-limited command broadcaster for the actuator bank.
#[derive(Debug, Default)]
pub struct CommandBroadcaster {
    last_sent_us: Option<u64>,
}

impl CommandBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast the desired outputs, or do nothing if a batch was already
    /// sent within the configured command interval.
    ///
    /// `outputs` is clamped to `min(COMMAND_MAX_COUNT, CONNECTED_MAX)`
    /// entries; the rest are ignored. `stop` or the disarmed sentinel encode
    /// an explicit zero for that slot. A transport failure is reported to the
    /// caller, but `last_sent` is not rolled back: a failed send must not
    /// cause an immediate retry burst.
    pub fn update_outputs(
        &mut self,
        stop: bool,
        outputs: &[u16],
        now_us: u64,
        command_rate_hz: u32,
        sink: &mut dyn CommandSink,
    ) -> Result<SendOutcome, TransportError> {
        // A zero rate gates all outbound traffic.
        if command_rate_hz == 0 {
            return Ok(SendOutcome::RateLimited);
        }
        let interval_us = 1_000_000 / u64::from(command_rate_hz);
        if let Some(last) = self.last_sent_us {
            if now_us.saturating_sub(last) < interval_us {
                return Ok(SendOutcome::RateLimited);
            }
        }
        self.last_sent_us = Some(now_us);

        let count = outputs.len().min(COMMAND_MAX_COUNT).min(CONNECTED_MAX);
        let mut batch = CommandBatch {
            commands: Vec::with_capacity(count),
        };
        for (i, &output) in outputs.iter().take(count).enumerate() {
            let value = if stop || output == DISARMED_OUTPUT_VALUE {
                0
            } else {
                output
            };
            batch.commands.push(ActuatorCommand {
                actuator_id: i as u8,
                value,
            });
        }

        sink.send(&batch)?;
        Ok(SendOutcome::Sent)
    }

    pub fn last_sent_us(&self) -> Option<u64> {
        self.last_sent_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        batches: Vec<CommandBatch>,
        fail_next: bool,
    }

    impl CommandSink for RecordingSink {
        fn send(&mut self, batch: &CommandBatch) -> Result<(), TransportError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(TransportError::Disconnected);
            }
            self.batches.push(batch.clone());
            Ok(())
        }
    }

    fn values(batch: &CommandBatch) -> Vec<u16> {
        batch.commands.iter().map(|c| c.value).collect()
    }

    #[test]
    fn passes_outputs_through_verbatim() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink::default();
        let out = bcast
            .update_outputs(false, &[100, 200, 300, 400], 0, 200, &mut sink)
            .unwrap();
        assert_eq!(out, SendOutcome::Sent);
        assert_eq!(values(&sink.batches[0]), vec![100, 200, 300, 400]);
        let ids: Vec<u8> = sink.batches[0].commands.iter().map(|c| c.actuator_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn stop_encodes_explicit_zero_for_every_slot() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink::default();
        bcast
            .update_outputs(true, &[100, 200, 300], 0, 200, &mut sink)
            .unwrap();
        assert_eq!(values(&sink.batches[0]), vec![0, 0, 0]);
    }

    #[test]
    fn disarmed_sentinel_encodes_zero() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink::default();
        bcast
            .update_outputs(false, &[100, DISARMED_OUTPUT_VALUE, 300], 0, 200, &mut sink)
            .unwrap();
        assert_eq!(values(&sink.batches[0]), vec![100, 0, 300]);
    }

    #[test]
    fn oversized_vector_is_clamped() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink::default();
        let outputs = [7u16; 32];
        bcast
            .update_outputs(false, &outputs, 0, 200, &mut sink)
            .unwrap();
        assert_eq!(sink.batches[0].commands.len(), CONNECTED_MAX);
    }

    #[test]
    fn second_call_inside_interval_is_a_noop() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink::default();
        // 200 Hz -> 5000 us interval.
        bcast.update_outputs(false, &[1], 10_000, 200, &mut sink).unwrap();
        let out = bcast
            .update_outputs(false, &[2], 14_000, 200, &mut sink)
            .unwrap();
        assert_eq!(out, SendOutcome::RateLimited);
        assert_eq!(sink.batches.len(), 1);
        let out = bcast
            .update_outputs(false, &[3], 15_000, 200, &mut sink)
            .unwrap();
        assert_eq!(out, SendOutcome::Sent);
        assert_eq!(sink.batches.len(), 2);
    }

    #[test]
    fn zero_rate_gates_everything() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink::default();
        let out = bcast.update_outputs(false, &[1], 0, 0, &mut sink).unwrap();
        assert_eq!(out, SendOutcome::RateLimited);
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn send_failure_still_advances_last_sent() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink {
            fail_next: true,
            ..Default::default()
        };
        let err = bcast.update_outputs(false, &[1], 10_000, 200, &mut sink);
        assert!(err.is_err());
        assert_eq!(bcast.last_sent_us(), Some(10_000));
        // The failed send occupies the interval: no immediate retry burst.
        let out = bcast
            .update_outputs(false, &[1], 11_000, 200, &mut sink)
            .unwrap();
        assert_eq!(out, SendOutcome::RateLimited);
    }

    #[test]
    fn first_call_always_sends() {
        let mut bcast = CommandBroadcaster::new();
        let mut sink = RecordingSink::default();
        let out = bcast.update_outputs(false, &[1], 100, 200, &mut sink).unwrap();
        assert_eq!(out, SendOutcome::Sent);
    }
}
