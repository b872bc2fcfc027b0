//! Study phase playback.
//!
//! [`StudyPlayback`] is the pure reveal state machine: it is told what time it
//! is and reports which transitions happened. Every deadline is derived from
//! the previous deadline rather than from the moment it was observed, so a
//! late wake-up never stretches the schedule.
//!
//! [`StudyScheduler`] drives a playback on the tokio clock. One scheduler is
//! created per session and owns a fresh [`CancellationToken`]; once cancelled
//! it never yields another event, including ones already queued.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::model::PacingConfig;

/// Whether the current item is on screen or hidden between reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevealTick {
    Show,
    Gap,
}

/// Where playback currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealPosition {
    pub index: usize,
    pub tick: RevealTick,
}

/// A transition reported by the playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// The item at `index` is now on screen.
    Show { index: usize },
    /// The item at `index` was hidden; the next one follows after the gap.
    Gap { index: usize },
    Paused { index: usize },
    Resumed { index: usize },
    /// Manual skip while paused. `index` is the item now on screen.
    Skipped { index: usize },
    /// Every item has been shown.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Show,
    Gap,
    /// Last item has been shown; waiting out the trailing pause.
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running { deadline: Instant },
    Paused { remaining: Duration },
    Complete,
}

/// Wall-clock-anchored reveal state machine.
#[derive(Debug, Clone)]
pub struct StudyPlayback {
    last_index: usize,
    show: Duration,
    gap: Duration,
    trailing: Duration,
    index: usize,
    stage: Stage,
    status: Status,
}

impl StudyPlayback {
    /// Start playback at `now` with the first item on screen.
    pub fn start(
        item_count: NonZeroUsize,
        pacing: &PacingConfig,
        trailing_pause: Duration,
        now: Instant,
    ) -> Self {
        let show = Duration::from_millis(pacing.per_item_show_ms);
        Self {
            last_index: item_count.get() - 1,
            show,
            gap: Duration::from_millis(pacing.inter_item_gap_ms),
            trailing: trailing_pause,
            index: 0,
            stage: Stage::Show,
            status: Status::Running {
                deadline: now + show,
            },
        }
    }

    pub fn position(&self) -> RevealPosition {
        let tick = match self.stage {
            Stage::Show | Stage::Trailing => RevealTick::Show,
            Stage::Gap => RevealTick::Gap,
        };
        RevealPosition {
            index: self.index,
            tick,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.status, Status::Paused { .. })
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    /// The next moment a transition is due, or `None` while paused or done.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.status {
            Status::Running { deadline } => Some(deadline),
            Status::Paused { .. } | Status::Complete => None,
        }
    }

    /// Apply every transition due at or before `now`, in order.
    pub fn advance(&mut self, now: Instant) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Status::Running { deadline } = self.status {
            if now < deadline {
                break;
            }
            events.extend(self.step(deadline));
        }
        events
    }

    fn step(&mut self, at: Instant) -> Option<PlaybackEvent> {
        let event = match self.stage {
            Stage::Show if self.index == self.last_index => {
                if self.trailing.is_zero() {
                    self.status = Status::Complete;
                    PlaybackEvent::Complete
                } else {
                    // Nothing visible changes until the trailing pause ends.
                    self.stage = Stage::Trailing;
                    self.status = Status::Running {
                        deadline: at + self.trailing,
                    };
                    return None;
                }
            }
            Stage::Show => {
                self.stage = Stage::Gap;
                self.status = Status::Running {
                    deadline: at + self.gap,
                };
                PlaybackEvent::Gap { index: self.index }
            }
            Stage::Gap => {
                self.index += 1;
                self.stage = Stage::Show;
                self.status = Status::Running {
                    deadline: at + self.show,
                };
                PlaybackEvent::Show { index: self.index }
            }
            Stage::Trailing => {
                self.status = Status::Complete;
                PlaybackEvent::Complete
            }
        };
        Some(event)
    }

    /// Suspend the timer, keeping the time left on the current tick.
    pub fn pause(&mut self, now: Instant) -> Option<PlaybackEvent> {
        let Status::Running { deadline } = self.status else {
            return None;
        };
        self.status = Status::Paused {
            remaining: deadline.saturating_duration_since(now),
        };
        Some(PlaybackEvent::Paused { index: self.index })
    }

    /// Continue from where `pause` stopped without replaying elapsed time.
    pub fn resume(&mut self, now: Instant) -> Option<PlaybackEvent> {
        let Status::Paused { remaining } = self.status else {
            return None;
        };
        self.status = Status::Running {
            deadline: now + remaining,
        };
        Some(PlaybackEvent::Resumed { index: self.index })
    }

    /// Jump to the next item while paused. Skipping past the last item
    /// finishes playback.
    pub fn skip_next(&mut self) -> Option<PlaybackEvent> {
        if !self.is_paused() {
            return None;
        }
        if self.index == self.last_index {
            self.status = Status::Complete;
            return Some(PlaybackEvent::Complete);
        }
        self.index += 1;
        self.stage = Stage::Show;
        self.status = Status::Paused {
            remaining: self.show,
        };
        Some(PlaybackEvent::Skipped { index: self.index })
    }
}

/// A playback event tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyEvent {
    pub session_id: Arc<str>,
    pub event: PlaybackEvent,
}

/// Drives a [`StudyPlayback`] on the tokio clock for a single session.
#[derive(Debug)]
pub struct StudyScheduler {
    session_id: Arc<str>,
    playback: StudyPlayback,
    pending: VecDeque<PlaybackEvent>,
    token: CancellationToken,
}

impl StudyScheduler {
    /// Start playback now. The first `next_event` reports item 0 on screen.
    pub fn start(
        session_id: impl Into<Arc<str>>,
        item_count: NonZeroUsize,
        pacing: &PacingConfig,
        trailing_pause: Duration,
    ) -> Self {
        let session_id = session_id.into();
        tracing::debug!(%session_id, items = item_count.get(), ?pacing, "study playback started");
        Self {
            session_id,
            playback: StudyPlayback::start(item_count, pacing, trailing_pause, Instant::now()),
            pending: VecDeque::from([PlaybackEvent::Show { index: 0 }]),
            token: CancellationToken::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn position(&self) -> RevealPosition {
        self.playback.position()
    }

    pub fn is_paused(&self) -> bool {
        self.playback.is_paused()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token observers can await to learn when this scheduler is torn down.
    pub fn cancelled_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Wait for the next transition.
    ///
    /// Returns `None` once playback is complete or the scheduler was
    /// cancelled. While paused this only returns on cancellation, so callers
    /// race it against user input. Dropping the future before it resolves
    /// loses nothing.
    pub async fn next_event(&mut self) -> Option<StudyEvent> {
        loop {
            if self.token.is_cancelled() {
                self.pending.clear();
                return None;
            }
            if let Some(event) = self.pending.pop_front() {
                return Some(self.tag(event));
            }
            let Some(deadline) = self.playback.next_deadline() else {
                if self.playback.is_complete() {
                    return None;
                }
                self.token.cancelled().await;
                return None;
            };
            tokio::select! {
                _ = self.token.cancelled() => return None,
                _ = tokio::time::sleep_until(deadline) => {
                    let events = self.playback.advance(Instant::now());
                    for event in &events {
                        tracing::debug!(session_id = %self.session_id, ?event, "study tick");
                    }
                    self.pending.extend(events);
                }
            }
        }
    }

    pub fn pause(&mut self) -> Option<StudyEvent> {
        let event = self.playback.pause(Instant::now())?;
        tracing::debug!(session_id = %self.session_id, ?event, "study paused");
        Some(self.tag(event))
    }

    pub fn resume(&mut self) -> Option<StudyEvent> {
        let event = self.playback.resume(Instant::now())?;
        tracing::debug!(session_id = %self.session_id, ?event, "study resumed");
        Some(self.tag(event))
    }

    pub fn skip_next(&mut self) -> Option<StudyEvent> {
        let event = self.playback.skip_next()?;
        tracing::debug!(session_id = %self.session_id, ?event, "study skipped ahead");
        Some(self.tag(event))
    }

    /// Stop for good. No event is yielded after this, queued or not.
    pub fn cancel(&mut self) {
        if !self.token.is_cancelled() {
            tracing::debug!(session_id = %self.session_id, "study playback cancelled");
        }
        self.token.cancel();
        self.pending.clear();
    }

    fn tag(&self, event: PlaybackEvent) -> StudyEvent {
        StudyEvent {
            session_id: Arc::clone(&self.session_id),
            event,
        }
    }
}

impl Drop for StudyScheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacing(show_ms: u64, gap_ms: u64) -> PacingConfig {
        PacingConfig {
            total_study_seconds: 20.0,
            per_item_show_ms: show_ms,
            inter_item_gap_ms: gap_ms,
        }
    }

    fn count(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn transitions_fire_on_deadlines() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(2), &pacing(1000, 250), Duration::ZERO, t0);

        assert!(p.advance(t0 + ms(999)).is_empty());
        assert_eq!(p.advance(t0 + ms(1000)), vec![PlaybackEvent::Gap { index: 0 }]);
        assert_eq!(
            p.position(),
            RevealPosition {
                index: 0,
                tick: RevealTick::Gap
            }
        );
        assert_eq!(p.advance(t0 + ms(1250)), vec![PlaybackEvent::Show { index: 1 }]);
        assert_eq!(p.advance(t0 + ms(2250)), vec![PlaybackEvent::Complete]);
        assert!(p.is_complete());
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn late_wakeup_catches_up_without_drift() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(3), &pacing(1000, 250), Duration::ZERO, t0);

        // One late observation replays every due transition in order.
        let events = p.advance(t0 + ms(2400));
        assert_eq!(
            events,
            vec![
                PlaybackEvent::Gap { index: 0 },
                PlaybackEvent::Show { index: 1 },
                PlaybackEvent::Gap { index: 1 },
            ]
        );
        // The next deadline is anchored to the schedule, not to the late observation.
        assert_eq!(p.next_deadline(), Some(t0 + ms(2500)));
    }

    #[test]
    fn pause_keeps_remaining_time() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(2), &pacing(1000, 250), Duration::ZERO, t0);

        assert_eq!(
            p.pause(t0 + ms(400)),
            Some(PlaybackEvent::Paused { index: 0 })
        );
        assert!(p.advance(t0 + ms(60_000)).is_empty());
        assert_eq!(p.next_deadline(), None);

        assert_eq!(
            p.resume(t0 + ms(5000)),
            Some(PlaybackEvent::Resumed { index: 0 })
        );
        assert_eq!(p.next_deadline(), Some(t0 + ms(5600)));
        assert!(p.advance(t0 + ms(5599)).is_empty());
        assert_eq!(p.advance(t0 + ms(5600)), vec![PlaybackEvent::Gap { index: 0 }]);
    }

    #[test]
    fn pause_during_gap_keeps_remaining_gap() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(2), &pacing(1000, 250), Duration::ZERO, t0);
        p.advance(t0 + ms(1000));

        assert_eq!(
            p.pause(t0 + ms(1100)),
            Some(PlaybackEvent::Paused { index: 0 })
        );
        assert_eq!(p.position().tick, RevealTick::Gap);
        p.resume(t0 + ms(3000));

        // 150ms of gap were left when paused.
        assert_eq!(p.next_deadline(), Some(t0 + ms(3150)));
        assert!(p.advance(t0 + ms(3149)).is_empty());
        assert_eq!(p.advance(t0 + ms(3150)), vec![PlaybackEvent::Show { index: 1 }]);
        assert_eq!(p.next_deadline(), Some(t0 + ms(4150)));
        assert_eq!(p.advance(t0 + ms(4150)), vec![PlaybackEvent::Complete]);
    }

    #[test]
    fn skip_during_gap_shows_next_item_in_full() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(3), &pacing(1000, 250), Duration::ZERO, t0);
        p.advance(t0 + ms(1200));
        p.pause(t0 + ms(1200));
        assert_eq!(
            p.position(),
            RevealPosition {
                index: 0,
                tick: RevealTick::Gap
            }
        );

        assert_eq!(p.skip_next(), Some(PlaybackEvent::Skipped { index: 1 }));
        assert_eq!(
            p.position(),
            RevealPosition {
                index: 1,
                tick: RevealTick::Show
            }
        );
        assert!(p.is_paused());

        assert_eq!(
            p.resume(t0 + ms(9000)),
            Some(PlaybackEvent::Resumed { index: 1 })
        );
        assert!(p.advance(t0 + ms(9999)).is_empty());
        assert_eq!(p.advance(t0 + ms(10_000)), vec![PlaybackEvent::Gap { index: 1 }]);
        assert_eq!(p.advance(t0 + ms(10_250)), vec![PlaybackEvent::Show { index: 2 }]);
    }

    #[test]
    fn skip_only_while_paused() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(3), &pacing(1000, 250), Duration::ZERO, t0);

        assert_eq!(p.skip_next(), None);
        p.advance(t0 + ms(1100));
        p.pause(t0 + ms(1100));
        assert_eq!(p.skip_next(), Some(PlaybackEvent::Skipped { index: 1 }));
        assert_eq!(
            p.position(),
            RevealPosition {
                index: 1,
                tick: RevealTick::Show
            }
        );
        assert!(p.is_paused());

        // The skipped-to item gets a full show once resumed.
        p.resume(t0 + ms(2000));
        assert_eq!(p.next_deadline(), Some(t0 + ms(3000)));
    }

    #[test]
    fn skip_past_last_item_completes() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(1), &pacing(1000, 250), Duration::ZERO, t0);
        p.pause(t0);
        assert_eq!(p.skip_next(), Some(PlaybackEvent::Complete));
        assert!(p.is_complete());
        assert_eq!(p.resume(t0 + ms(10)), None);
    }

    #[test]
    fn trailing_pause_delays_completion() {
        let t0 = Instant::now();
        let mut p = StudyPlayback::start(count(1), &pacing(1000, 250), ms(500), t0);
        assert_eq!(p.advance(t0 + ms(1000)), Vec::new());
        assert!(!p.is_complete());
        assert_eq!(p.next_deadline(), Some(t0 + ms(1500)));
        assert_eq!(p.advance(t0 + ms(1500)), vec![PlaybackEvent::Complete]);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_plays_whole_sequence() {
        let start = Instant::now();
        let mut scheduler =
            StudyScheduler::start("s-1", count(3), &pacing(1000, 250), Duration::ZERO);

        let mut events = Vec::new();
        while let Some(ev) = scheduler.next_event().await {
            assert_eq!(&*ev.session_id, "s-1");
            events.push(ev.event);
        }

        assert_eq!(
            events,
            vec![
                PlaybackEvent::Show { index: 0 },
                PlaybackEvent::Gap { index: 0 },
                PlaybackEvent::Show { index: 1 },
                PlaybackEvent::Gap { index: 1 },
                PlaybackEvent::Show { index: 2 },
                PlaybackEvent::Complete,
            ]
        );
        assert_eq!(start.elapsed(), ms(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_scheduler_yields_nothing() {
        let mut scheduler =
            StudyScheduler::start("s-1", count(3), &pacing(1000, 250), Duration::ZERO);
        let observer = scheduler.cancelled_token();

        scheduler.cancel();
        assert!(observer.is_cancelled());
        assert_eq!(scheduler.next_event().await, None);

        tokio::time::sleep(ms(10_000)).await;
        assert_eq!(scheduler.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_scheduler_waits_for_resume() {
        let mut scheduler =
            StudyScheduler::start("s-1", count(2), &pacing(1000, 250), Duration::ZERO);
        assert_eq!(
            scheduler.next_event().await.map(|e| e.event),
            Some(PlaybackEvent::Show { index: 0 })
        );
        scheduler.pause();

        let waited = tokio::time::timeout(ms(30_000), scheduler.next_event()).await;
        assert!(waited.is_err(), "no tick may fire while paused");

        scheduler.resume();
        assert_eq!(
            scheduler.next_event().await.map(|e| e.event),
            Some(PlaybackEvent::Gap { index: 0 })
        );
    }
}
