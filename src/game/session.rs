//! Thread-safe handle around a gameplay [`State`].
//!
//! Ticks, presses and stops all read-modify-write the same in-flight notes,
//! score and combo, so every call takes the one session lock for its whole
//! duration. Hosts that drive frames and input from different threads clone
//! the handle into each.
//!
//! Events raised under the lock are queued and handed to listeners only after
//! the lock is released, so a listener may read or drive the session itself.

use crate::core::clock::AudioClock;
use crate::game::gameplay::{self, EventListener, GameplayEvent, SessionPhase, State, TickReport};
use crate::game::judgment::Judgment;
use crate::game::scores::SessionSummary;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<State>>,
    outbox: Arc<Mutex<VecDeque<GameplayEvent>>>,
    listeners: Arc<Mutex<Vec<EventListener>>>,
}

/// Score, combo and phase at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub score: u64,
    pub combo: u32,
    pub active_notes: usize,
    pub music_time: f64,
}

// Poisoned only by a panicking listener; the guarded data is still whole.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedSession {
    pub fn new(state: State) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
            outbox: Arc::new(Mutex::new(VecDeque::new())),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runs `op` under the session lock, then delivers whatever it raised.
    fn with_state<T>(&self, op: impl FnOnce(&mut State) -> T) -> T {
        let result = {
            let mut state = lock(&self.inner);
            let result = op(&mut state);
            let events = gameplay::take_events(&mut state);
            if !events.is_empty() {
                lock(&self.outbox).extend(events);
            }
            result
        };
        self.dispatch();
        result
    }

    fn next_event(&self) -> Option<GameplayEvent> {
        lock(&self.outbox).pop_front()
    }

    // Whoever holds the listener lock drains the whole outbox. A caller that
    // finds it busy (another thread, or a listener re-entering the session)
    // leaves its events for the current holder.
    fn dispatch(&self) {
        loop {
            let mut listeners = match self.listeners.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            while let Some(event) = self.next_event() {
                for listener in listeners.iter_mut() {
                    listener(&event);
                }
            }
            drop(listeners);
            if lock(&self.outbox).is_empty() {
                return;
            }
        }
    }

    /// Adds a listener. Must not be called from inside a listener.
    pub fn subscribe(&self, listener: EventListener) {
        lock(&self.listeners).push(listener);
    }

    pub fn start(&self) {
        self.with_state(gameplay::begin_session);
    }

    pub fn stop(&self) {
        self.with_state(gameplay::end_session);
    }

    pub fn tick(&self, music_time_sec: f64) -> TickReport {
        self.with_state(|state| gameplay::advance(state, music_time_sec))
    }

    pub fn drive<C: AudioClock + ?Sized>(&self, clock: &C) -> Option<TickReport> {
        self.with_state(|state| gameplay::poll_clock(state, clock))
    }

    pub fn key_press(&self, lane: usize, music_time_sec: f64) -> Option<Judgment> {
        self.with_state(|state| gameplay::judge_press(state, lane, music_time_sec))
    }

    pub fn key(&self, key: char, music_time_sec: f64) -> Option<Judgment> {
        self.with_state(|state| {
            let lane = state.key_map.lane_for(key)?;
            gameplay::judge_press(state, lane, music_time_sec)
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = lock(&self.inner);
        SessionSnapshot {
            phase: state.phase,
            score: state.score,
            combo: state.combo,
            active_notes: gameplay::active_note_count(&state),
            music_time: state.current_music_time,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        gameplay::summary(&lock(&self.inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::note::Note;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn handle_is_shared_between_clones() {
        let notes = vec![Note { time: 2.0, lane: 0 }, Note { time: 2.0, lane: 1 }];
        let state = gameplay::init(Arc::new(notes), &GameConfig::default()).unwrap();
        let session = SharedSession::new(state);
        session.start();

        let ticker = session.clone();
        thread::spawn(move || {
            ticker.tick(1.9);
        })
        .join()
        .unwrap();

        assert_eq!(session.snapshot().active_notes, 2);
        assert!(session.key('d', 2.0).is_some());
        assert!(session.key_press(1, 2.01).is_some());
        let snap = session.snapshot();
        assert_eq!(snap.score, 200);
        assert_eq!(snap.combo, 2);
        assert_eq!(snap.active_notes, 0);

        session.stop();
        assert_eq!(session.snapshot().phase, SessionPhase::Ended);
        assert_eq!(session.snapshot().score, 0);
    }

    #[test]
    fn listeners_may_read_the_session() {
        let notes = vec![Note { time: 1.5, lane: 0 }, Note { time: 1.6, lane: 2 }];
        let state = gameplay::init(Arc::new(notes), &GameConfig::default()).unwrap();
        let session = SharedSession::new(state);
        let view = session.clone();
        let (seen_tx, seen_rx) = mpsc::channel();
        let seen_tx = Mutex::new(seen_tx);
        session.subscribe(Box::new(move |event: &GameplayEvent| {
            if let GameplayEvent::NoteSpawned { note_index, .. } = event {
                let snap = view.snapshot();
                let _ = seen_tx.lock().unwrap().send((*note_index, snap.active_notes));
            }
        }));
        session.start();

        let (done_tx, done_rx) = mpsc::channel();
        let ticker = session.clone();
        thread::spawn(move || {
            ticker.tick(1.0);
            let _ = done_tx.send(());
        });
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("tick must not block on a listener reading the session");

        // Listeners run after the tick, so both spawns are already visible.
        assert_eq!(seen_rx.try_recv().unwrap(), (0, 2));
        assert_eq!(seen_rx.try_recv().unwrap(), (1, 2));
    }

    #[test]
    fn listeners_may_drive_the_session() {
        let notes = vec![Note { time: 1.5, lane: 0 }];
        let state = gameplay::init(Arc::new(notes), &GameConfig::default()).unwrap();
        let session = SharedSession::new(state);
        let auto = session.clone();
        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        session.subscribe(Box::new(move |event: &GameplayEvent| {
            sink.lock().unwrap().push(event.clone());
            if let GameplayEvent::NoteSpawned { lane, .. } = event {
                auto.key_press(*lane, 1.5);
            }
        }));
        session.start();
        session.tick(1.0);

        let snap = session.snapshot();
        assert_eq!(snap.score, 100);
        assert_eq!(snap.combo, 1);
        let order = order.lock().unwrap();
        let spawn = order
            .iter()
            .position(|e| matches!(e, GameplayEvent::NoteSpawned { .. }))
            .unwrap();
        let judged = order
            .iter()
            .position(|e| matches!(e, GameplayEvent::NoteJudged(_)))
            .unwrap();
        assert!(spawn < judged);
        assert_eq!(order.last(), Some(&GameplayEvent::ComboChanged(1)));
    }
}
