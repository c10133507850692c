//! PeriodicSpawner: summons a batch of units on a fixed cadence.
//!
//! Progress accumulates per tick scaled by the host's spawn speed and fires
//! once it reaches the threshold, then restarts from zero. Ticks are counted
//! from 1, the first tick the host is processed. With a fixed tick `dt` the
//! first batch lands on tick max(1, ⌈pause/dt⌉) and every ⌈interval/dt⌉
//! ticks after that, so a zero pause fires on the first processed tick.

use crate::battle::effects::{EffectRequest, SpawnLayout, SpawnRequest};

use super::{Mechanic, MechanicContext};

#[derive(Debug, Clone)]
pub struct PeriodicSpawner {
    pub unit: String,
    pub count: u32,
    pub interval_ms: u32,
    pub initial_pause_ms: u32,
    pub radius: f32,
    pub scatter: bool,
    elapsed_ms: f32,
    fired: u32,
}

impl PeriodicSpawner {
    pub fn new(
        unit: String,
        count: u32,
        interval_ms: u32,
        initial_pause_ms: u32,
        radius: f32,
        scatter: bool,
    ) -> Self {
        Self {
            unit,
            count,
            interval_ms,
            initial_pause_ms,
            radius,
            scatter,
            elapsed_ms: 0.0,
            fired: 0,
        }
    }

    fn threshold_ms(&self) -> f32 {
        if self.fired == 0 {
            self.initial_pause_ms as f32
        } else {
            self.interval_ms as f32
        }
    }

    pub fn batches_fired(&self) -> u32 {
        self.fired
    }
}

impl Mechanic for PeriodicSpawner {
    fn name(&self) -> &'static str {
        "PeriodicSpawner"
    }

    fn on_tick(&mut self, ctx: &mut MechanicContext) {
        let host = ctx.host;
        if host.disabled {
            return;
        }
        self.elapsed_ms += ctx.dt_ms as f32 * host.spawn_speed;
        if self.elapsed_ms < self.threshold_ms() {
            return;
        }
        self.elapsed_ms = 0.0;
        self.fired += 1;
        ctx.request(EffectRequest::Spawn(SpawnRequest {
            owner: host.owner,
            unit: self.unit.clone(),
            count: self.count,
            center: host.position,
            radius: self.radius,
            layout: if self.scatter {
                SpawnLayout::Scatter
            } else {
                SpawnLayout::Ring
            },
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::host;
    use super::*;

    /// Ticks (1-based) on which the spawner fired.
    fn firing_ticks(spawner: &mut PeriodicSpawner, dt_ms: u32, ticks: u64) -> Vec<u64> {
        let host = host(1);
        let mut fired = Vec::new();
        for tick in 1..=ticks {
            let mut outbox = Vec::new();
            let mut ctx = MechanicContext::new(&host, tick, dt_ms, &mut outbox);
            spawner.on_tick(&mut ctx);
            if !outbox.is_empty() {
                fired.push(tick);
            }
        }
        fired
    }

    #[test]
    fn test_first_batch_after_initial_pause() {
        let mut spawner = PeriodicSpawner::new("Skeleton".to_string(), 2, 3000, 1000, 1.0, false);
        let fired = firing_ticks(&mut spawner, 33, 250);
        // ceil(1000 / 33) = 31, then every ceil(3000 / 33) = 91 ticks.
        assert_eq!(fired, vec![31, 122, 213]);
    }

    #[test]
    fn test_zero_pause_fires_on_first_processed_tick() {
        let mut spawner = PeriodicSpawner::new("Skeleton".to_string(), 1, 1000, 0, 1.0, false);
        let fired = firing_ticks(&mut spawner, 100, 25);
        assert_eq!(fired, vec![1, 11, 21]);
    }

    #[test]
    fn test_disabled_host_does_not_progress() {
        let mut spawner = PeriodicSpawner::new("Skeleton".to_string(), 1, 1000, 500, 1.0, false);
        let mut frozen = host(1);
        frozen.disabled = true;
        let mut outbox = Vec::new();
        for tick in 0..100 {
            let mut ctx = MechanicContext::new(&frozen, tick, 33, &mut outbox);
            spawner.on_tick(&mut ctx);
        }
        assert!(outbox.is_empty());
        assert_eq!(spawner.batches_fired(), 0);
    }
}
