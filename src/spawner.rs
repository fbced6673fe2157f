use rand::Rng;

use crate::config::SpawnConfig;
use crate::proximity::{ObjectKind, SpawnedObject};

/// Drops a bird or an owl off the right edge every `interval_ticks`.
#[derive(Debug, Clone)]
pub struct Spawner {
    cfg: SpawnConfig,
    timer: u32,
}

impl Spawner {
    pub fn new(cfg: SpawnConfig) -> Self {
        Spawner { cfg, timer: 0 }
    }

    pub fn reset(&mut self) {
        self.timer = 0;
    }

    /// `top` is the world y at the top of the visible screen.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        world_width: f64,
        top: f64,
        screen_height: f64,
    ) -> Option<SpawnedObject> {
        self.timer += 1;
        if self.timer < self.cfg.interval_ticks {
            return None;
        }
        self.timer = 0;

        let c = &self.cfg;
        let half = c.size / 2.0;
        let x = world_width + rng.gen_range(0.0..=c.x_jitter) + half;
        let y_top = top - c.y_margin;
        let y_bottom = top + screen_height + c.y_margin - c.size;
        let y = rng.gen_range(y_top..=y_bottom) + half;

        let (kind, (lo, hi)) = if rng.gen_bool(c.bird_chance) {
            (ObjectKind::Bird, c.bird_speed)
        } else {
            (ObjectKind::Owl, c.owl_speed)
        };
        let speed = rng.gen_range(lo..=hi) as f64;

        tracing::trace!(?kind, x, y, speed, "spawned");
        Some(SpawnedObject { x, y, speed, kind })
    }

    /// Move everything left, then drop what has fully left the screen.
    pub fn advance(&self, objects: &mut Vec<SpawnedObject>) {
        for obj in objects.iter_mut() {
            obj.x -= obj.speed;
        }
        let half = self.cfg.size / 2.0;
        objects.retain(|obj| obj.x + half >= 0.0);
    }
}
