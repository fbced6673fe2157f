use crate::config::EnergyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Running,
    Win,
    Lose,
}

impl GameState {
    pub fn is_over(self) -> bool {
        self != GameState::Running
    }
}

/// What the player is doing this tick, as far as scoring cares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activity {
    /// Listen held: flat penalty, no proximity scoring.
    Listening,
    /// Net proximity delta for this tick.
    Scanning(f64),
}

/// Bounded score plus the Running/Win/Lose machine it drives.
#[derive(Debug, Clone)]
pub struct Energy {
    cfg: EnergyConfig,
    score: f64,
    state: GameState,
    free_play: bool,
}

impl Energy {
    pub fn new(cfg: EnergyConfig) -> Self {
        let score = cfg.start;
        Energy {
            cfg,
            score,
            state: GameState::Running,
            free_play: false,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn max(&self) -> f64 {
        self.cfg.win_threshold
    }

    pub fn is_free_play(&self) -> bool {
        self.free_play
    }

    pub fn reset(&mut self) {
        self.score = self.cfg.start;
        self.state = GameState::Running;
        self.free_play = false;
    }

    /// Energy pinned to the top and no ending; only a reset leaves it.
    pub fn enter_free_play(&mut self) {
        if self.state == GameState::Running && !self.free_play {
            self.free_play = true;
            self.score = self.cfg.win_threshold;
            tracing::info!("free play");
        }
    }

    fn clamp(&mut self) {
        self.score = self
            .score
            .clamp(self.cfg.lose_threshold, self.cfg.win_threshold);
    }

    /// Pay for a quick move. Fails without charging if energy is short.
    pub fn try_spend(&mut self, cost: f64) -> bool {
        if self.state != GameState::Running || self.score < cost {
            return false;
        }
        self.score -= cost;
        self.clamp();
        true
    }

    /// Advance one tick. Returns the new state when a transition fires.
    pub fn tick(&mut self, dt: f64, activity: Activity) -> Option<GameState> {
        if self.state != GameState::Running {
            return None;
        }

        self.score += self.cfg.regen_rate * dt;
        match activity {
            Activity::Listening => self.score -= self.cfg.listen_penalty,
            Activity::Scanning(delta) => self.score += delta,
        }
        self.clamp();

        if self.free_play {
            self.score = self.cfg.win_threshold;
            return None;
        }

        let next = if self.score >= self.cfg.win_threshold {
            GameState::Win
        } else if self.score <= self.cfg.lose_threshold {
            GameState::Lose
        } else {
            return None;
        };
        self.state = next;
        tracing::info!(score = self.score, state = ?next, "run ended");
        Some(next)
    }
}
