use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// The logical actions the simulation reads each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actions {
    pub up: bool,
    pub down: bool,
    pub listen: bool,
    pub quick_ascend: bool,
    pub quick_descend: bool,
    pub percussion: bool,
    pub free_play: bool,
    pub restart: bool,
    pub quit: bool,
}

// Terminals without release events only tell us about presses and OS
// key repeats, so a held key is "still down" for a short grace period.
const FIRST_REPEAT_GRACE: Duration = Duration::from_millis(550);
const REPEAT_GRACE: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, Default)]
struct HeldKey {
    last_seen: Option<Instant>,
    repeating: bool,
}

impl HeldKey {
    fn press(&mut self, now: Instant, repeat: bool) {
        self.repeating = repeat && self.last_seen.is_some();
        self.last_seen = Some(now);
    }

    fn release(&mut self) {
        self.last_seen = None;
        self.repeating = false;
    }

    fn is_held(&self, now: Instant, release_events: bool) -> bool {
        let Some(seen) = self.last_seen else {
            return false;
        };
        if release_events {
            return true;
        }
        let grace = if self.repeating {
            REPEAT_GRACE
        } else {
            FIRST_REPEAT_GRACE
        };
        now.saturating_duration_since(seen) <= grace
    }
}

/// Turns a stream of key events into per-tick `Actions`.
#[derive(Debug, Default)]
pub struct InputTracker {
    release_events: bool,
    up: HeldKey,
    down: HeldKey,
    listen: HeldKey,
    pressed: Actions,
}

impl InputTracker {
    /// `release_events` is true when the terminal reports key releases.
    pub fn new(release_events: bool) -> Self {
        InputTracker {
            release_events,
            ..Default::default()
        }
    }

    pub fn handle(&mut self, key: KeyEvent, now: Instant) {
        let held = match key.code {
            KeyCode::Up => Some(&mut self.up),
            KeyCode::Down => Some(&mut self.down),
            KeyCode::Char('a') | KeyCode::Char('A') => Some(&mut self.listen),
            _ => None,
        };
        if let Some(held) = held {
            match key.kind {
                KeyEventKind::Press => held.press(now, false),
                KeyEventKind::Repeat => held.press(now, true),
                KeyEventKind::Release => held.release(),
            }
            return;
        }

        if key.kind != KeyEventKind::Press {
            return;
        }
        let p = &mut self.pressed;
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => p.quit = true,
            KeyCode::Esc | KeyCode::Char('q') => p.quit = true,
            KeyCode::Char('w') | KeyCode::Char('W') => p.quick_ascend = true,
            KeyCode::Char('s') | KeyCode::Char('S') => p.quick_descend = true,
            KeyCode::Char(' ') => p.percussion = true,
            KeyCode::Char('p') | KeyCode::Char('P') => p.free_play = true,
            KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::Enter => p.restart = true,
            _ => {}
        }
    }

    /// Current actions. One-shot presses are consumed.
    pub fn poll(&mut self, now: Instant) -> Actions {
        let mut actions = std::mem::take(&mut self.pressed);
        actions.up = self.up.is_held(now, self.release_events);
        actions.down = self.down.is_held(now, self.release_events);
        actions.listen = self.listen.is_held(now, self.release_events);
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn with_kind(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn presses_fire_once() {
        let mut input = InputTracker::new(true);
        let now = Instant::now();
        input.handle(press(KeyCode::Char(' ')), now);
        input.handle(press(KeyCode::Char('w')), now);
        let a = input.poll(now);
        assert!(a.percussion && a.quick_ascend);
        assert_eq!(input.poll(now), Actions::default());
    }

    #[test]
    fn held_until_release_when_terminal_reports_it() {
        let mut input = InputTracker::new(true);
        let t0 = Instant::now();
        input.handle(press(KeyCode::Char('a')), t0);
        assert!(input.poll(t0 + Duration::from_secs(5)).listen);
        input.handle(with_kind(KeyCode::Char('a'), KeyEventKind::Release), t0);
        assert!(!input.poll(t0 + Duration::from_secs(5)).listen);
    }

    #[test]
    fn held_times_out_without_release_events() {
        let mut input = InputTracker::new(false);
        let t0 = Instant::now();
        input.handle(press(KeyCode::Up), t0);
        assert!(input.poll(t0 + Duration::from_millis(400)).up);
        input.handle(with_kind(KeyCode::Up, KeyEventKind::Repeat), t0 + Duration::from_millis(500));
        assert!(input.poll(t0 + Duration::from_millis(600)).up);
        assert!(!input.poll(t0 + Duration::from_millis(700)).up);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut input = InputTracker::new(false);
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        input.handle(key, Instant::now());
        assert!(input.poll(Instant::now()).quit);
    }
}
