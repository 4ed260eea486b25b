//! Chess-style game clock: per-player countdown with Fischer increment and an
//! optional simple delay.
//!
//! The clock never ticks on its own. Elapsed time is measured lazily against
//! the instant the running clock was last started, so polling
//! [`TimeControlManager::time_remaining`] has no side effects.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::types::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControlConfig {
    /// Starting time for each player.
    #[serde(with = "millis")]
    pub initial_time: Duration,
    /// Fischer increment credited when a player's clock is stopped.
    #[serde(with = "millis")]
    pub increment: Duration,
    /// Simple delay: the first `delay` of every turn is free.
    #[serde(with = "millis", default)]
    pub delay: Duration,
}

impl TimeControlConfig {
    pub fn new(initial_time: Duration, increment: Duration) -> Self {
        Self {
            initial_time,
            increment,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Remaining time for both players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTime {
    #[serde(with = "millis")]
    pub black: Duration,
    #[serde(with = "millis")]
    pub white: Duration,
}

impl PlayerTime {
    fn uniform(time: Duration) -> Self {
        Self {
            black: time,
            white: time,
        }
    }

    pub fn of(&self, player: Player) -> Duration {
        match player {
            Player::Black => self.black,
            Player::White => self.white,
        }
    }

    fn of_mut(&mut self, player: Player) -> &mut Duration {
        match player {
            Player::Black => &mut self.black,
            Player::White => &mut self.white,
        }
    }
}

/// Serialisable clock snapshot produced by [`TimeControlManager::export_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControlState {
    pub config: TimeControlConfig,
    pub time_remaining: PlayerTime,
    pub current_player: Option<Player>,
    pub is_active: bool,
    pub is_paused: bool,
}

#[derive(Debug, Clone)]
pub struct TimeControlManager {
    config: TimeControlConfig,
    remaining: PlayerTime,
    current: Option<Player>,
    active: bool,
    paused: bool,
    /// Set only while a clock is running.
    since: Option<Instant>,
}

impl TimeControlManager {
    pub fn new(config: TimeControlConfig) -> Self {
        Self {
            config,
            remaining: PlayerTime::uniform(config.initial_time),
            current: None,
            active: false,
            paused: false,
            since: None,
        }
    }

    /// Starts `player`'s clock, stopping (and crediting) the other player's
    /// first. Ignored while paused or when `player`'s clock already runs.
    pub fn start_clock(&mut self, player: Player) {
        if self.paused {
            return;
        }
        if self.active {
            match self.current {
                Some(running) if running == player => return,
                Some(_) => {
                    self.stop_clock();
                }
                None => {}
            }
        }

        self.current = Some(player);
        self.active = true;
        self.since = Some(Instant::now());
    }

    /// Charges the running player for the elapsed time, credits the increment
    /// and returns to idle. Returns the wall-clock time of the turn.
    pub fn stop_clock(&mut self) -> Duration {
        let Some(player) = self.current.filter(|_| self.active && self.since.is_some()) else {
            return Duration::ZERO;
        };

        let elapsed = self.elapsed();
        self.charge(player, elapsed);
        *self.remaining.of_mut(player) += self.config.increment;

        self.active = false;
        self.since = None;
        elapsed
    }

    /// Freezes the running clock without crediting the increment. The current
    /// player is kept so [`resume`](Self::resume) continues their turn.
    pub fn pause(&mut self) {
        if !self.active || self.paused {
            return;
        }

        let elapsed = self.elapsed();
        if let Some(player) = self.current {
            self.charge(player, elapsed);
        }
        self.paused = true;
        self.since = None;
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }

        self.paused = false;
        if self.active && self.current.is_some() {
            self.since = Some(Instant::now());
        }
    }

    /// Live remaining time for both players. Does not mutate the clock.
    pub fn time_remaining(&self) -> PlayerTime {
        let mut live = self.remaining;
        if let Some(player) = self.current
            && self.active
            && !self.paused
        {
            let charged = self.elapsed().saturating_sub(self.config.delay);
            let slot = live.of_mut(player);
            *slot = slot.saturating_sub(charged);
        }
        live
    }

    pub fn is_time_out(&self, player: Player) -> bool {
        self.time_remaining().of(player).is_zero()
    }

    /// Back to the initial time for both players, idle and unpaused.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Overrides a player's stored remaining time, clamping negatives to zero.
    pub fn set_time_remaining(&mut self, player: Player, millis: i64) {
        *self.remaining.of_mut(player) = Duration::from_millis(millis.max(0) as u64);
    }

    /// Snapshot with live remaining times folded in. A running clock stays
    /// running in the snapshot and restarts from the import instant.
    pub fn export_state(&self) -> TimeControlState {
        TimeControlState {
            config: self.config,
            time_remaining: self.time_remaining(),
            current_player: self.current,
            is_active: self.active,
            is_paused: self.paused,
        }
    }

    pub fn import_state(&mut self, state: TimeControlState) {
        self.config = state.config;
        self.remaining = state.time_remaining;
        self.current = state.current_player;
        self.active = state.is_active;
        self.paused = state.is_paused;
        self.since = (self.active && !self.paused && self.current.is_some()).then(Instant::now);
    }

    pub fn config(&self) -> TimeControlConfig {
        self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_player(&self) -> Option<Player> {
        self.current
    }

    fn elapsed(&self) -> Duration {
        match self.since {
            Some(since) if !self.paused => since.elapsed(),
            _ => Duration::ZERO,
        }
    }

    fn charge(&mut self, player: Player, elapsed: Duration) {
        let charged = elapsed.saturating_sub(self.config.delay);
        let slot = self.remaining.of_mut(player);
        *slot = slot.saturating_sub(charged);
    }
}

/// `Duration` as whole milliseconds on the wire.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn to_millis(value: &Duration) -> u64 {
        value.as_millis().min(u64::MAX as u128) as u64
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(to_millis(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// `Option<Duration>` as optional milliseconds.
pub(crate) mod millis_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&super::millis::to_millis(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
