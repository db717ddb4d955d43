//! Phase-level latency breakdown of a single HTTP exchange.
//!
//! A [`Timing`] holds ten unix-millisecond timestamps captured while the
//! request runs. Phases are ordered dns → connect → tls → ttfb → transfer;
//! the tls phase is zero-width for plain HTTP targets.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw phase timestamps, milliseconds since the unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub dns_start: i64,
    pub dns_done: i64,
    pub connect_start: i64,
    pub connect_done: i64,
    pub tls_handshake_start: i64,
    pub tls_handshake_done: i64,
    pub first_byte_start: i64,
    pub first_byte_done: i64,
    pub transfer_start: i64,
    pub transfer_done: i64,
}

/// One of the five measured phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Dns,
    Connection,
    Tls,
    Ttfb,
    Transfer,
}

impl Phase {
    pub const ALL: [Phase; 5] =
        [Phase::Dns, Phase::Connection, Phase::Tls, Phase::Ttfb, Phase::Transfer];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Dns => "dns",
            Phase::Connection => "connection",
            Phase::Tls => "tls",
            Phase::Ttfb => "ttfb",
            Phase::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("{phase} phase ends before it starts ({start} > {done})")]
    NegativePhase { phase: Phase, start: i64, done: i64 },
}

/// Duration of each phase in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPhases {
    pub dns: i64,
    pub connection: i64,
    pub tls: i64,
    pub ttfb: i64,
    pub transfer: i64,
}

impl TimingPhases {
    pub fn get(&self, phase: Phase) -> i64 {
        match phase {
            Phase::Dns => self.dns,
            Phase::Connection => self.connection,
            Phase::Tls => self.tls,
            Phase::Ttfb => self.ttfb,
            Phase::Transfer => self.transfer,
        }
    }

    pub fn total(&self) -> i64 {
        self.dns + self.connection + self.tls + self.ttfb + self.transfer
    }
}

/// Position of a phase on a 0..100 waterfall bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseWidth {
    /// Cumulative width of every phase before this one
    pub pre_width: f64,
    /// Percentage of the total latency spent in this phase
    pub width: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseWidths {
    pub dns: PhaseWidth,
    pub connection: PhaseWidth,
    pub tls: PhaseWidth,
    pub ttfb: PhaseWidth,
    pub transfer: PhaseWidth,
}

impl PhaseWidths {
    pub fn get(&self, phase: Phase) -> PhaseWidth {
        match phase {
            Phase::Dns => self.dns,
            Phase::Connection => self.connection,
            Phase::Tls => self.tls,
            Phase::Ttfb => self.ttfb,
            Phase::Transfer => self.transfer,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, PhaseWidth)> + '_ {
        Phase::ALL.into_iter().map(|phase| (phase, self.get(phase)))
    }
}

impl Timing {
    fn bounds(&self, phase: Phase) -> (i64, i64) {
        match phase {
            Phase::Dns => (self.dns_start, self.dns_done),
            Phase::Connection => (self.connect_start, self.connect_done),
            Phase::Tls => (self.tls_handshake_start, self.tls_handshake_done),
            Phase::Ttfb => (self.first_byte_start, self.first_byte_done),
            Phase::Transfer => (self.transfer_start, self.transfer_done),
        }
    }

    /// Duration of a single phase
    pub fn phase(&self, phase: Phase) -> Result<i64, TimingError> {
        let (start, done) = self.bounds(phase);
        if done < start {
            return Err(TimingError::NegativePhase { phase, start, done });
        }
        Ok(done - start)
    }

    /// Derive the duration of every phase; fails if any phase is negative
    pub fn phases(&self) -> Result<TimingPhases, TimingError> {
        Ok(TimingPhases {
            dns: self.phase(Phase::Dns)?,
            connection: self.phase(Phase::Connection)?,
            tls: self.phase(Phase::Tls)?,
            ttfb: self.phase(Phase::Ttfb)?,
            transfer: self.phase(Phase::Transfer)?,
        })
    }

    /// Sum of the five phase durations
    pub fn total_latency(&self) -> Result<i64, TimingError> {
        Ok(self.phases()?.total())
    }

    /// Share of the total latency per phase plus its cumulative offset.
    ///
    /// A zero total yields all-zero widths instead of dividing by zero.
    pub fn phase_widths(&self) -> Result<PhaseWidths, TimingError> {
        let phases = self.phases()?;
        let total = phases.total();
        if total == 0 {
            return Ok(PhaseWidths::default());
        }

        let mut offset = 0.0;
        let mut next = |phase: Phase| {
            let width = phases.get(phase) as f64 / total as f64 * 100.0;
            let current = PhaseWidth { pre_width: offset, width };
            offset += width;
            current
        };

        Ok(PhaseWidths {
            dns: next(Phase::Dns),
            connection: next(Phase::Connection),
            tls: next(Phase::Tls),
            ttfb: next(Phase::Ttfb),
            transfer: next(Phase::Transfer),
        })
    }
}

/// Current wall clock in unix milliseconds
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
