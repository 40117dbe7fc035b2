//! Pairwise diplomatic relations, pending actions, treaties and trade.
//!
//! Relations are keyed by an order-independent pair key. Every relation
//! carries a trust score in `[0, 100]` from which its [`RelationStatus`] is
//! derived:
//!
//! | trust      | status   |
//! |------------|----------|
//! | `>= 70`    | friendly |
//! | `[30, 70)` | neutral  |
//! | `< 30`     | hostile  |
//!
//! Status is recomputed after every trust change and on every
//! [`DiplomacySystem::update_relations`] pass.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{Millis, DAY_MS};
use crate::error::{check, GameError, Result};
use crate::resources::ResourceType;

/// Minimum trust for a friendly relation.
pub const FRIENDLY_THRESHOLD: f64 = 70.0;

/// Minimum trust for a neutral relation.
pub const NEUTRAL_THRESHOLD: f64 = 30.0;

/// Trust lost per full day without interaction.
pub const DAILY_TRUST_DECAY: f64 = 0.1;

/// Default number of actions retained in history.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

const TRADE_ACCEPT_TRUST: f64 = 5.0;
const TREATY_ACCEPT_TRUST: f64 = 10.0;
const REJECT_TRUST: f64 = -5.0;

/// Standing between two nations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationStatus {
    /// Trust at or above 70.
    Friendly,
    /// Trust in `[30, 70)`.
    Neutral,
    /// Trust below 30.
    Hostile,
}

impl RelationStatus {
    /// Derive the status for a trust value.
    #[must_use]
    pub fn for_trust(trust: f64) -> Self {
        if trust >= FRIENDLY_THRESHOLD {
            Self::Friendly
        } else if trust >= NEUTRAL_THRESHOLD {
            Self::Neutral
        } else {
            Self::Hostile
        }
    }

    /// Snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Friendly => "friendly",
            Self::Neutral => "neutral",
            Self::Hostile => "hostile",
        }
    }
}

impl fmt::Display for RelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical key for a pair of nations; `relation_key(a, b) == relation_key(b, a)`.
#[must_use]
pub fn relation_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

/// Direction of a trade agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    /// Buying the resource.
    Import,
    /// Selling the resource.
    Export,
}

/// A time-limited exchange of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAgreement {
    /// Unique identifier.
    pub id: String,
    /// Direction.
    pub kind: TradeKind,
    /// Traded resource.
    pub resource: ResourceType,
    /// Quantity, strictly positive.
    pub amount: f64,
    /// Unit price, not negative.
    pub price: f64,
    /// Lifetime in milliseconds.
    pub duration: Millis,
    /// When the agreement took effect.
    pub start_time: Millis,
}

impl TradeAgreement {
    /// Whether the agreement has run out at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Millis) -> bool {
        now >= self.start_time.saturating_add(self.duration)
    }
}

/// Kind of treaty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatyKind {
    /// Mutual defence.
    Alliance,
    /// Cessation of hostilities.
    Peace,
    /// Trade framework.
    Trade,
    /// Research cooperation.
    Research,
}

/// A time-limited formal agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treaty {
    /// Unique identifier.
    pub id: String,
    /// Kind of treaty.
    pub kind: TreatyKind,
    /// Written terms; at least one.
    pub terms: Vec<String>,
    /// Benefits granted, by name.
    #[serde(default)]
    pub benefits: BTreeMap<String, f64>,
    /// Obligations imposed, by name.
    #[serde(default)]
    pub obligations: BTreeMap<String, f64>,
    /// When the treaty took effect.
    pub start_time: Millis,
    /// Lifetime in milliseconds.
    pub duration: Millis,
}

impl Treaty {
    /// Whether the treaty has run out at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Millis) -> bool {
        now >= self.start_time.saturating_add(self.duration)
    }
}

/// Relation between two nations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiplomaticRelation {
    /// The canonical pair key.
    pub id: String,
    /// First nation.
    pub nation_a: String,
    /// Second nation.
    pub nation_b: String,
    /// Derived from `trust`.
    pub status: RelationStatus,
    /// Trust in `[0, 100]`.
    pub trust: f64,
    /// Agreements in force.
    pub trade_agreements: Vec<TradeAgreement>,
    /// Treaties in force.
    pub treaties: Vec<Treaty>,
    /// Time of the last accepted or rejected action.
    pub last_interaction: Millis,
}

impl DiplomaticRelation {
    fn adjust_trust(&mut self, delta: f64) {
        self.trust = (self.trust + delta).clamp(0.0, 100.0);
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        let status = RelationStatus::for_trust(self.trust);
        if status != self.status {
            tracing::info!(relation = %self.id, from = %self.status, to = %status, "relation status changed");
            self.status = status;
        }
    }
}

/// Kind of diplomatic action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Allowed unless the relation is hostile. Carries trade agreements.
    Negotiate,
    /// Always allowed. Carries treaties.
    Propose,
    /// Requires trust of at least 30.
    Demand,
    /// Requires a hostile relation or trust below 30.
    Threaten,
}

impl ActionKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 4] = [Self::Negotiate, Self::Propose, Self::Demand, Self::Threaten];

    /// Snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Negotiate => "negotiate",
            Self::Propose => "propose",
            Self::Demand => "demand",
            Self::Threaten => "threaten",
        }
    }

    /// Whether this kind of action is allowed for `relation`.
    #[must_use]
    pub fn permitted(self, relation: &DiplomaticRelation) -> bool {
        match self {
            Self::Negotiate => relation.status != RelationStatus::Hostile,
            Self::Propose => true,
            Self::Demand => relation.trust >= NEUTRAL_THRESHOLD,
            Self::Threaten => {
                relation.status == RelationStatus::Hostile || relation.trust < NEUTRAL_THRESHOLD
            }
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| GameError::UnknownName {
                kind: "diplomatic action",
                name: s.to_string(),
            })
    }
}

/// Payload carried by an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionContent {
    /// A trade agreement to put in force on acceptance.
    TradeAgreement(TradeAgreement),
    /// A treaty to put in force on acceptance.
    Treaty(Treaty),
    /// Free-form terms with no effect on acceptance.
    Terms(BTreeMap<String, Value>),
    /// No payload.
    Empty,
}

/// An action sent from one nation to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiplomaticAction {
    /// Kind of action.
    pub kind: ActionKind,
    /// Sending nation.
    pub initiator: String,
    /// Receiving nation.
    pub target: String,
    /// Payload.
    pub content: ActionContent,
    /// When the action was sent.
    pub timestamp: Millis,
}

impl DiplomaticAction {
    /// Key under which the action is held while pending.
    #[must_use]
    pub fn pending_key(&self) -> String {
        format!("{}{}", self.initiator, self.timestamp)
    }

    fn involves(&self, nation: &str) -> bool {
        self.initiator == nation || self.target == nation
    }
}

/// How the target answers a pending action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Put the payload in force.
    Accept,
    /// Decline, costing trust.
    Reject,
    /// Send a new action of the same kind back with a different payload.
    Counter(ActionContent),
}

/// Owns all relations and the action queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiplomacySystem {
    relations: HashMap<String, DiplomaticRelation>,
    pending: HashMap<String, DiplomaticAction>,
    history: VecDeque<DiplomaticAction>,
    history_limit: usize,
}

impl Default for DiplomacySystem {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl DiplomacySystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty system that keeps at most `limit` history entries.
    #[must_use]
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            relations: HashMap::new(),
            pending: HashMap::new(),
            history: VecDeque::new(),
            history_limit: limit.max(1),
        }
    }

    /// Register a relation between two distinct nations.
    pub fn establish_relation(&mut self, a: &str, b: &str, trust: f64, now: Millis) -> Result<()> {
        const ENTITY: &str = "diplomatic relation";
        check::non_empty(ENTITY, "nation_a", a)?;
        check::non_empty(ENTITY, "nation_b", b)?;
        check::in_range(ENTITY, "trust", trust, 0.0, 100.0)?;
        if a == b {
            return Err(GameError::SelfRelation {
                nation: a.to_string(),
            });
        }
        let key = relation_key(a, b);
        if self.relations.contains_key(&key) {
            return Err(GameError::DuplicateId {
                kind: "diplomatic relation",
                id: key,
            });
        }

        let (nation_a, nation_b) = if a <= b { (a, b) } else { (b, a) };
        self.relations.insert(
            key.clone(),
            DiplomaticRelation {
                id: key,
                nation_a: nation_a.to_string(),
                nation_b: nation_b.to_string(),
                status: RelationStatus::for_trust(trust),
                trust,
                trade_agreements: Vec::new(),
                treaties: Vec::new(),
                last_interaction: now,
            },
        );
        Ok(())
    }

    /// Queue an action if the relation exists and permits it.
    pub fn initiate_diplomatic_action(&mut self, action: DiplomaticAction) -> Result<()> {
        self.check_action(&action)?;

        let key = action.pending_key();
        if self.pending.contains_key(&key) {
            tracing::warn!(key = %key, "pending action replaced by a newer action with the same key");
        }
        tracing::debug!(key = %key, kind = %action.kind, "diplomatic action pending");
        self.record_history(action.clone());
        self.pending.insert(key, action);
        Ok(())
    }

    /// Everything `initiate_diplomatic_action` checks, without queueing.
    fn check_action(&self, action: &DiplomaticAction) -> Result<()> {
        check::non_empty("diplomatic action", "initiator", &action.initiator)?;
        check::non_empty("diplomatic action", "target", &action.target)?;
        validate_content(&action.content)?;

        let relation = self.relation_for(&action.initiator, &action.target)?;
        if !action.kind.permitted(relation) {
            tracing::warn!(
                kind = %action.kind,
                initiator = %action.initiator,
                target = %action.target,
                status = %relation.status,
                "diplomatic action rejected"
            );
            return Err(GameError::ActionRejected {
                action: action.kind.name(),
                status: relation.status.name(),
                trust: relation.trust,
            });
        }
        Ok(())
    }

    /// Send a treaty proposal.
    pub fn propose_treaty(&mut self, initiator: &str, target: &str, treaty: Treaty, now: Millis) -> Result<()> {
        validate_treaty(&treaty)?;
        self.initiate_diplomatic_action(DiplomaticAction {
            kind: ActionKind::Propose,
            initiator: initiator.to_string(),
            target: target.to_string(),
            content: ActionContent::Treaty(treaty),
            timestamp: now,
        })
    }

    /// Open trade negotiations.
    pub fn negotiate_trade_agreement(
        &mut self,
        initiator: &str,
        target: &str,
        agreement: TradeAgreement,
        now: Millis,
    ) -> Result<()> {
        validate_trade_agreement(&agreement)?;
        self.initiate_diplomatic_action(DiplomaticAction {
            kind: ActionKind::Negotiate,
            initiator: initiator.to_string(),
            target: target.to_string(),
            content: ActionContent::TradeAgreement(agreement),
            timestamp: now,
        })
    }

    /// Answer a pending action. On success the action always leaves the
    /// pending queue.
    ///
    /// A counter-proposal is checked like a fresh action from the target back
    /// to the initiator before anything changes; if it would be rejected the
    /// original action stays pending.
    pub fn respond_to_diplomatic_action(&mut self, action_id: &str, response: Response, now: Millis) -> Result<()> {
        let action = self.pending.get(action_id).ok_or_else(|| GameError::NotFound {
            kind: "pending action",
            id: action_id.to_string(),
        })?;
        let key = relation_key(&action.initiator, &action.target);
        if !self.relations.contains_key(&key) {
            return Err(GameError::RelationNotFound {
                a: action.initiator.clone(),
                b: action.target.clone(),
            });
        }

        let counter = match &response {
            Response::Counter(content) => {
                let counter = DiplomaticAction {
                    kind: action.kind,
                    initiator: action.target.clone(),
                    target: action.initiator.clone(),
                    content: content.clone(),
                    timestamp: now,
                };
                self.check_action(&counter)?;
                Some(counter)
            }
            Response::Accept | Response::Reject => None,
        };
        let Some(action) = self.pending.remove(action_id) else {
            return Ok(());
        };

        match response {
            Response::Accept => {
                if let Some(relation) = self.relations.get_mut(&key) {
                    execute_action(action, relation, now);
                }
                Ok(())
            }
            Response::Reject => {
                if let Some(relation) = self.relations.get_mut(&key) {
                    relation.adjust_trust(REJECT_TRUST);
                    relation.last_interaction = now;
                }
                Ok(())
            }
            Response::Counter(_) => match counter {
                Some(counter) => self.initiate_diplomatic_action(counter),
                None => Ok(()),
            },
        }
    }

    /// Per-tick pass: decay trust, refresh status and drop expired agreements.
    pub fn update_relations(&mut self, now: Millis) -> Result<()> {
        let mut keys: Vec<&String> = self.relations.keys().collect();
        keys.sort();
        let keys: Vec<String> = keys.into_iter().cloned().collect();

        for key in keys {
            let Some(relation) = self.relations.get_mut(&key) else {
                continue;
            };
            relation.adjust_trust(-trust_decay(relation.last_interaction, now));
            relation.trade_agreements.retain(|agreement| !agreement.is_expired(now));
            relation.treaties.retain(|treaty| !treaty.is_expired(now));
        }
        Ok(())
    }

    /// Look up the relation for a pair, in either order.
    #[must_use]
    pub fn relation(&self, a: &str, b: &str) -> Option<&DiplomaticRelation> {
        self.relations.get(&relation_key(a, b))
    }

    /// All relations, in key order.
    #[must_use]
    pub fn relations(&self) -> Vec<DiplomaticRelation> {
        let mut relations: Vec<_> = self.relations.values().cloned().collect();
        relations.sort_by(|a, b| a.id.cmp(&b.id));
        relations
    }

    /// Look up a pending action by key.
    #[must_use]
    pub fn pending_action(&self, key: &str) -> Option<&DiplomaticAction> {
        self.pending.get(key)
    }

    /// Pending actions sent or received by `nation`, ordered by timestamp then key.
    #[must_use]
    pub fn pending_actions(&self, nation: &str) -> Vec<DiplomaticAction> {
        let mut actions: Vec<(&String, &DiplomaticAction)> = self
            .pending
            .iter()
            .filter(|(_, action)| action.involves(nation))
            .collect();
        actions.sort_by(|(ka, a), (kb, b)| a.timestamp.cmp(&b.timestamp).then_with(|| ka.cmp(kb)));
        actions.into_iter().map(|(_, action)| action.clone()).collect()
    }

    /// The most recent `limit` history entries involving `nation`, oldest first.
    #[must_use]
    pub fn action_history(&self, nation: &str, limit: usize) -> Vec<DiplomaticAction> {
        let involved: Vec<&DiplomaticAction> = self
            .history
            .iter()
            .filter(|action| action.involves(nation))
            .collect();
        let skip = involved.len().saturating_sub(limit);
        involved.into_iter().skip(skip).cloned().collect()
    }

    pub(crate) fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        for relation in self.relations() {
            hasher.write(relation.id.as_bytes());
            if let Ok(bytes) = serde_json::to_vec(&relation) {
                hasher.write(&bytes);
            }
        }
        let mut keys: Vec<&String> = self.pending.keys().collect();
        keys.sort();
        for key in keys {
            hasher.write(key.as_bytes());
        }
        hasher.write_usize(self.history.len());
    }

    fn relation_for(&self, a: &str, b: &str) -> Result<&DiplomaticRelation> {
        self.relation(a, b).ok_or_else(|| GameError::RelationNotFound {
            a: a.to_string(),
            b: b.to_string(),
        })
    }

    fn record_history(&mut self, action: DiplomaticAction) {
        self.history.push_back(action);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }
}

/// Trust lost after `now - last_interaction` milliseconds: 0.1 per whole day.
#[must_use]
pub fn trust_decay(last_interaction: Millis, now: Millis) -> f64 {
    let days = now.saturating_sub(last_interaction) / DAY_MS;
    days as f64 * DAILY_TRUST_DECAY
}

fn execute_action(action: DiplomaticAction, relation: &mut DiplomaticRelation, now: Millis) {
    match (action.kind, action.content) {
        (ActionKind::Negotiate, ActionContent::TradeAgreement(agreement)) => {
            tracing::debug!(relation = %relation.id, agreement = %agreement.id, "trade agreement in force");
            relation.trade_agreements.push(agreement);
            relation.adjust_trust(TRADE_ACCEPT_TRUST);
        }
        (ActionKind::Propose, ActionContent::Treaty(treaty)) => {
            tracing::debug!(relation = %relation.id, treaty = %treaty.id, "treaty in force");
            relation.treaties.push(treaty);
            relation.adjust_trust(TREATY_ACCEPT_TRUST);
        }
        _ => {}
    }
    relation.last_interaction = now;
}

fn validate_content(content: &ActionContent) -> Result<()> {
    match content {
        ActionContent::TradeAgreement(agreement) => validate_trade_agreement(agreement),
        ActionContent::Treaty(treaty) => validate_treaty(treaty),
        ActionContent::Terms(_) | ActionContent::Empty => Ok(()),
    }
}

fn validate_treaty(treaty: &Treaty) -> Result<()> {
    const ENTITY: &str = "treaty";
    check::non_empty(ENTITY, "id", &treaty.id)?;
    if treaty.terms.is_empty() {
        return Err(GameError::EmptyIdentifier {
            entity: ENTITY,
            field: "terms",
        });
    }
    if treaty.duration == 0 {
        return Err(GameError::OutOfRange {
            entity: ENTITY,
            field: "duration",
            value: 0.0,
            min: 1.0,
            max: f64::MAX,
        });
    }
    check::all_finite(
        ENTITY,
        treaty
            .benefits
            .iter()
            .chain(&treaty.obligations)
            .map(|(key, value)| (key.as_str(), *value)),
    )
}

fn validate_trade_agreement(agreement: &TradeAgreement) -> Result<()> {
    const ENTITY: &str = "trade agreement";
    check::non_empty(ENTITY, "id", &agreement.id)?;
    check::positive(ENTITY, "amount", agreement.amount)?;
    check::non_negative(ENTITY, "price", agreement.price)?;
    if agreement.duration == 0 {
        return Err(GameError::OutOfRange {
            entity: ENTITY,
            field: "duration",
            value: 0.0,
            min: 1.0,
            max: f64::MAX,
        });
    }
    Ok(())
}
