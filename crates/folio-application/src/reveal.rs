//! Reveal engine: simulated typing of a response that is already known.
//!
//! A [`RevealEngine`] turns a complete string into a sequence of ticks, each
//! revealing one more character after a randomized delay. A session ends
//! with exactly one [`Finalized`] value, either because the whole text was
//! revealed or because it was cancelled. The session is moved out of the
//! engine when it finalizes, so a second finalize cannot be produced.

use std::time::Duration;

use folio_core::config::RevealConfig;
use folio_core::{FolioError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Identifies one reveal session. Ticks for other ids are ignored.
pub type SessionId = u64;

/// Source of per-character delays.
pub trait DelayGenerator: Send {
    fn next_delay(&mut self) -> Duration;
}

/// Delays drawn uniformly from `[min, max]`.
#[derive(Debug)]
pub struct UniformDelay {
    min_ms: u64,
    max_ms: u64,
    rng: StdRng,
}

impl UniformDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self::with_rng(min, max, StdRng::from_entropy())
    }

    /// Reproducible sequence, for tests and demos.
    pub fn seeded(min: Duration, max: Duration, seed: u64) -> Self {
        Self::with_rng(min, max, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &RevealConfig) -> Self {
        Self::new(config.min_delay(), config.max_delay())
    }

    fn with_rng(min: Duration, max: Duration, rng: StdRng) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min_ms: min.as_millis() as u64,
            max_ms: max.as_millis() as u64,
            rng,
        }
    }
}

impl DelayGenerator for UniformDelay {
    fn next_delay(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(self.min_ms..=self.max_ms))
    }
}

/// The same delay every time. `FixedDelay(Duration::ZERO)` reveals as fast
/// as the scheduler allows.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl DelayGenerator for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        self.0
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeReason {
    Completed,
    Cancelled,
}

/// The single closing event of a session, carrying the text to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub session: SessionId,
    pub text: String,
    pub reason: FinalizeReason,
}

/// A freshly started session and the delay before its first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealStart {
    pub session: SessionId,
    pub first_delay: Duration,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealTick {
    /// One more character is visible; schedule the next tick after `next_delay`.
    Progress {
        session: SessionId,
        prefix: String,
        next_delay: Duration,
    },
    /// The session is over.
    Finalize(Finalized),
}

#[derive(Debug)]
struct RevealSession {
    id: SessionId,
    source: Vec<char>,
    revealed: String,
    cursor: usize,
    cancelled: bool,
}

impl RevealSession {
    fn is_complete(&self) -> bool {
        self.cursor >= self.source.len()
    }

    fn finalize(self, reason: FinalizeReason) -> Finalized {
        debug_assert!(reason == FinalizeReason::Completed || self.cancelled);
        Finalized {
            session: self.id,
            text: self.revealed,
            reason,
        }
    }
}

/// Drives at most one reveal session at a time.
pub struct RevealEngine {
    active: Option<RevealSession>,
    next_session: SessionId,
    delays: Box<dyn DelayGenerator>,
}

impl std::fmt::Debug for RevealEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealEngine")
            .field("active", &self.active)
            .field("next_session", &self.next_session)
            .finish_non_exhaustive()
    }
}

impl RevealEngine {
    pub fn new(delays: Box<dyn DelayGenerator>) -> Self {
        Self {
            active: None,
            next_session: 1,
            delays,
        }
    }

    /// Engine with a fixed pace; handy for tests.
    pub fn with_fixed_delay(delay: Duration) -> Self {
        Self::new(Box::new(FixedDelay(delay)))
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|s| s.id)
    }

    /// Text revealed so far in the live session.
    pub fn revealed(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.revealed.as_str())
    }

    /// Starts revealing `full_text`.
    ///
    /// Fails with `InvalidState` if a session is already live; the live
    /// session is not affected.
    pub fn start(&mut self, full_text: &str) -> Result<RevealStart> {
        if let Some(active) = &self.active {
            return Err(FolioError::invalid_state(format!(
                "reveal session {} is already active",
                active.id
            )));
        }

        let session = self.next_session;
        self.next_session += 1;
        self.active = Some(RevealSession {
            id: session,
            source: full_text.chars().collect(),
            revealed: String::with_capacity(full_text.len()),
            cursor: 0,
            cancelled: false,
        });

        Ok(RevealStart {
            session,
            first_delay: self.delays.next_delay(),
        })
    }

    /// Advances the live session by one character.
    ///
    /// Returns `None` when `session` is not the live session (a stale timer).
    /// The tick that reveals the last character finalizes the session.
    pub fn tick(&mut self, session: SessionId) -> Option<RevealTick> {
        let active = self.active.as_mut().filter(|s| s.id == session)?;

        if let Some(&next) = active.source.get(active.cursor) {
            active.revealed.push(next);
            active.cursor += 1;
        }

        if active.is_complete() {
            let finished = self.active.take()?;
            return Some(RevealTick::Finalize(
                finished.finalize(FinalizeReason::Completed),
            ));
        }

        Some(RevealTick::Progress {
            session,
            prefix: active.revealed.clone(),
            next_delay: self.delays.next_delay(),
        })
    }

    /// Cancels the live session and yields what was revealed so far.
    ///
    /// Returns `None` when no session is live, so repeated cancels are
    /// harmless.
    pub fn cancel(&mut self) -> Option<Finalized> {
        let mut session = self.active.take()?;
        session.cancelled = true;
        Some(session.finalize(FinalizeReason::Cancelled))
    }
}
