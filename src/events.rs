// 11.0: every committed operation produces an event. used for audit trails and
// notifying external systems. the EventPayload enum lists all event types.
// rejected operations emit nothing.

use crate::types::{AssetId, HealthFactor, Quantity, Timestamp, Usd, UserId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Position events
    CollateralDeposited(CollateralDepositedEvent),
    CollateralRedeemed(CollateralRedeemedEvent),
    StableAssetMinted(StableAssetMintedEvent),
    StableAssetBurned(StableAssetBurnedEvent),

    // Risk events
    Liquidated(LiquidatedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDepositedEvent {
    pub user: UserId,
    pub asset: AssetId,
    pub amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRedeemedEvent {
    pub redeemed_from: UserId,
    pub redeemed_to: UserId,
    pub asset: AssetId,
    pub amount: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableAssetMintedEvent {
    pub user: UserId,
    pub amount: Usd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableAssetBurnedEvent {
    // whose debt shrank
    pub on_behalf_of: UserId,
    // whose tokens were burned
    pub payer: UserId,
    pub amount: Usd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidatedEvent {
    pub liquidator: UserId,
    pub user: UserId,
    pub asset: AssetId,
    pub debt_covered: Usd,
    pub collateral_seized: Quantity,
    pub health_factor_before: HealthFactor,
    pub health_factor_after: HealthFactor,
}

/// Bounded event history. oldest events fall off once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
    next_id: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
            next_id: 1,
        }
    }

    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) -> &Event {
        let event = Event::new(EventId(self.next_id), timestamp, payload);
        self.next_id += 1;

        self.events.push_back(event);
        while self.events.len() > self.capacity.max(1) {
            self.events.pop_front();
        }
        &self.events[self.events.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn recent(&self, count: usize) -> Vec<&Event> {
        let start = self.events.len().saturating_sub(count);
        self.events.range(start..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
