//! Shield: a damage pool consumed before hitpoints.

use super::{Absorption, Mechanic};

#[derive(Debug, Clone)]
pub struct Shield {
    pub pool: f32,
    remaining: f32,
}

impl Shield {
    pub fn new(pool: f32) -> Self {
        debug_assert!(pool >= 0.0, "Shield::new: negative pool {}", pool);
        Self {
            pool,
            remaining: pool.max(0.0),
        }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

impl Mechanic for Shield {
    fn name(&self) -> &'static str {
        "Shield"
    }

    fn absorb_damage(&mut self, amount: f32) -> Absorption {
        if self.remaining <= 0.0 || amount <= 0.0 {
            return Absorption::passthrough(amount);
        }
        let absorbed = amount.min(self.remaining);
        self.remaining -= absorbed;
        Absorption {
            remaining: amount - absorbed,
            absorbed,
            depleted: self.remaining <= 0.0,
        }
    }

    fn shield_remaining(&self) -> Option<f32> {
        Some(self.remaining)
    }
}
