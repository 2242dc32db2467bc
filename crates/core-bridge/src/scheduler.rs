use thiserror::Error;

/// Sanity ceiling on configured target rates. Anything above this is treated
/// as misconfiguration rather than a request to flood the bus.
pub const MAX_TARGET_RATE_HZ: f32 = 2000.0;

/// Transmit destination on the field bus (subject/port identifier).
pub type SubjectId = u16;

/// The source must produce nothing this tick. Not a fault: the target rate is
/// out of range or the source has no transmit destination assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scheduled source disabled")]
pub struct Disabled;

/// Rate-adaptation schedule for one periodic message source.
///
/// Converts an externally configured target rate into a per-tick message
/// count against a fixed tick rate. Quantization is deliberately simple:
/// above the tick rate the per-tick burst is `floor(target / tick_rate)`
/// with no inter-tick smoothing; at or below it, one message every
/// `floor(tick_rate / target)` ticks. The truncation bias toward a higher
/// effective rate in the divisor is intentional and load-bearing for
/// downstream consumers.
#[derive(Debug, Clone)]
pub struct RateSchedule {
    tick_counter: u32,
    tick_rate_hz: f32,
}

impl RateSchedule {
    /// `tick_rate_hz` is fixed for the source's lifetime and must be positive.
    pub fn new(tick_rate_hz: f32) -> Self {
        debug_assert!(tick_rate_hz > 0.0);
        Self {
            tick_counter: 0,
            tick_rate_hz,
        }
    }

    /// How many messages to emit this tick for the given target rate.
    ///
    /// The tick counter advances exactly once per invocation regardless of
    /// outcome; the decision uses the pre-advance value, so the first
    /// eligible tick is counter 0 and changing `target_rate_hz` between
    /// calls never resets phase.
    pub fn messages_for_tick(&mut self, target_rate_hz: f32) -> Result<u32, Disabled> {
        let counter = self.tick_counter;
        self.tick_counter = self.tick_counter.wrapping_add(1);

        if !target_rate_hz.is_finite()
            || target_rate_hz <= 0.0
            || target_rate_hz > MAX_TARGET_RATE_HZ
        {
            return Err(Disabled);
        }

        let ratio = self.tick_rate_hz / target_rate_hz;
        if ratio < 1.0 {
            // Target exceeds the tick rate: emit a burst, same size every tick.
            Ok((target_rate_hz / self.tick_rate_hz) as u32)
        } else {
            let interval = ratio as u32;
            Ok(u32::from(counter % interval == 0))
        }
    }

    pub fn tick_rate_hz(&self) -> f32 {
        self.tick_rate_hz
    }
}

/// A schedule bound to an optional transmit destination.
///
/// A source with no destination is disabled, but its counter still advances
/// so that assigning a destination later does not shift phase.
#[derive(Debug, Clone)]
pub struct ScheduledSource {
    schedule: RateSchedule,
    destination: Option<SubjectId>,
}

impl ScheduledSource {
    pub fn new(tick_rate_hz: f32, destination: Option<SubjectId>) -> Self {
        Self {
            schedule: RateSchedule::new(tick_rate_hz),
            destination,
        }
    }

    pub fn set_destination(&mut self, destination: Option<SubjectId>) {
        self.destination = destination;
    }

    pub fn destination(&self) -> Option<SubjectId> {
        self.destination
    }

    pub fn messages_for_tick(&mut self, target_rate_hz: f32) -> Result<u32, Disabled> {
        let decision = self.schedule.messages_for_tick(target_rate_hz);
        if self.destination.is_none() {
            return Err(Disabled);
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_tick_rate_emits_every_second_tick() {
        let mut sched = RateSchedule::new(100.0);
        let pattern: Vec<u32> = (0..6)
            .map(|_| sched.messages_for_tick(50.0).unwrap())
            .collect();
        assert_eq!(pattern, vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn equal_rates_emit_every_tick() {
        let mut sched = RateSchedule::new(100.0);
        for _ in 0..10 {
            assert_eq!(sched.messages_for_tick(100.0).unwrap(), 1);
        }
    }

    #[test]
    fn above_tick_rate_bursts_constantly() {
        let mut sched = RateSchedule::new(100.0);
        for _ in 0..10 {
            assert_eq!(sched.messages_for_tick(250.0).unwrap(), 2);
        }
    }

    #[test]
    fn zero_and_negative_targets_disable() {
        let mut sched = RateSchedule::new(100.0);
        assert_eq!(sched.messages_for_tick(0.0), Err(Disabled));
        assert_eq!(sched.messages_for_tick(-5.0), Err(Disabled));
        assert_eq!(sched.messages_for_tick(f32::NAN), Err(Disabled));
    }

    #[test]
    fn ceiling_disables() {
        let mut sched = RateSchedule::new(100.0);
        assert_eq!(sched.messages_for_tick(2000.5), Err(Disabled));
        assert_eq!(sched.messages_for_tick(2000.0), Ok(1));
    }

    #[test]
    fn phase_survives_rate_change() {
        let mut sched = RateSchedule::new(100.0);
        // Burn three ticks at one rate, including a disabled one.
        sched.messages_for_tick(50.0).unwrap();
        sched.messages_for_tick(50.0).unwrap();
        sched.messages_for_tick(0.0).unwrap_err();
        // Counter is now 3; at 25 Hz (interval 4) the next emit lands on tick 4.
        assert_eq!(sched.messages_for_tick(25.0).unwrap(), 0);
        assert_eq!(sched.messages_for_tick(25.0).unwrap(), 1);
    }

    #[test]
    fn exactly_one_message_per_window() {
        let mut sched = RateSchedule::new(400.0);
        let interval = 400 / 25;
        for _ in 0..5 {
            let emitted: u32 = (0..interval)
                .map(|_| sched.messages_for_tick(25.0).unwrap())
                .sum();
            assert_eq!(emitted, 1);
        }
    }

    #[test]
    fn unassigned_destination_disables_but_advances() {
        let mut src = ScheduledSource::new(100.0, None);
        assert_eq!(src.messages_for_tick(50.0), Err(Disabled));
        src.set_destination(Some(1201));
        // One tick already consumed above: counter is 1, so the next emit
        // waits for the even tick.
        assert_eq!(src.messages_for_tick(50.0).unwrap(), 0);
        assert_eq!(src.messages_for_tick(50.0).unwrap(), 1);
    }
}
