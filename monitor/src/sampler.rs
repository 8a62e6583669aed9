use crate::error::Result;
use crate::net::{CounterSource, Counters};
use common::RateSnapshot;

/// Turns cumulative counters into per-interval deltas.
///
/// The first read happens at construction and only establishes the
/// baseline, so traffic from before the monitor started is never counted.
pub struct RateSampler {
    source: Box<dyn CounterSource>,
    last: Counters,
}

impl RateSampler {
    /// A read failure here is a startup error and aborts construction.
    pub fn new(mut source: Box<dyn CounterSource>) -> Result<Self> {
        let last = source.read()?;
        Ok(Self { source, last })
    }

    /// Deltas since the previous read. A counter that went backwards
    /// (interface reset, driver reload) clamps to zero for that interval,
    /// and the new value becomes the next baseline.
    pub fn sample(&mut self) -> Result<RateSnapshot> {
        let current = self.source.read()?;
        let sent_delta = current.sent.saturating_sub(self.last.sent);
        let recv_delta = current.recv.saturating_sub(self.last.recv);
        self.last = current;

        Ok(RateSnapshot {
            up_speed: sent_delta,
            down_speed: recv_delta,
            sent_delta,
            recv_delta,
        })
    }
}
