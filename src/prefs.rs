//! The shared preference store.
//!
//! [`PreferenceStore`] holds the live [`Preferences`] and an explicit
//! observer registry: listeners register once (getting an RAII
//! [`Subscription`]), subscribe to individual [`PrefKey`]s, and are notified
//! synchronously, in subscription order, whenever one of those values
//! changes.  Dropping the subscription unsubscribes from every key.
//!
//! Keys are typed.  The only place a preference *name* appears is at the
//! boundary ([`PreferenceStore::set_named`]), where an unknown name is an
//! error the caller logs and ignores.

use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

/// Highest opacity percentage.
pub const MAX_OPACITY: u8 = 100;

/// A preference the rulers react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrefKey {
    GroupRulers,
    FloatRulers,
    ForegroundOpacity,
    BackgroundOpacity,
    RulerShadow,
}

impl PrefKey {
    pub const ALL: [PrefKey; 5] = [
        PrefKey::GroupRulers,
        PrefKey::FloatRulers,
        PrefKey::ForegroundOpacity,
        PrefKey::BackgroundOpacity,
        PrefKey::RulerShadow,
    ];

    /// The stored name of this preference.
    pub fn name(&self) -> &'static str {
        match self {
            PrefKey::GroupRulers => "groupRulers",
            PrefKey::FloatRulers => "floatRulers",
            PrefKey::ForegroundOpacity => "foregroundOpacity",
            PrefKey::BackgroundOpacity => "backgroundOpacity",
            PrefKey::RulerShadow => "rulerShadow",
        }
    }

    fn is_percent(&self) -> bool {
        matches!(self, PrefKey::ForegroundOpacity | PrefKey::BackgroundOpacity)
    }
}

impl fmt::Display for PrefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrefKey {
    type Err = PrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrefKey::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| PrefError::UnknownKey(s.to_string()))
    }
}

/// A preference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefValue {
    Bool(bool),
    /// Percentage in `0..=100`.
    Percent(u8),
}

impl PrefValue {
    /// Decode a JSON value for `key`.  Percentages are rounded and clamped
    /// to `0..=100`.
    pub fn from_json(key: PrefKey, value: &serde_json::Value) -> Result<Self, PrefError> {
        if key.is_percent() {
            let n = value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| PrefError::type_mismatch(key, "number", value))?;
            Ok(PrefValue::Percent(n.round().clamp(0.0, f64::from(MAX_OPACITY)) as u8))
        } else {
            value
                .as_bool()
                .map(PrefValue::Bool)
                .ok_or_else(|| PrefError::type_mismatch(key, "boolean", value))
        }
    }
}

/// Convert an opacity percentage to a window alpha in `[0.0, 1.0]`.
pub fn opacity_alpha(percent: u8) -> f64 {
    f64::from(percent.min(MAX_OPACITY)) / 100.0
}

/// The preference values themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Focusing one ruler carries the other along.
    pub group_rulers: bool,
    /// Rulers float above other applications' windows.
    pub float_rulers: bool,
    /// Opacity (percent) of the rulers while in the foreground.
    pub foreground_opacity: u8,
    /// Opacity (percent) of the rulers while in the background.
    pub background_opacity: u8,
    /// Rulers cast a drop shadow.
    pub ruler_shadow: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            group_rulers: true,
            float_rulers: true,
            foreground_opacity: 90,
            background_opacity: 50,
            ruler_shadow: false,
        }
    }
}

impl Preferences {
    /// The same preferences with opacities clamped to `0..=100`.
    pub fn normalized(self) -> Self {
        Self {
            foreground_opacity: self.foreground_opacity.min(MAX_OPACITY),
            background_opacity: self.background_opacity.min(MAX_OPACITY),
            ..self
        }
    }

    pub fn get(&self, key: PrefKey) -> PrefValue {
        match key {
            PrefKey::GroupRulers => PrefValue::Bool(self.group_rulers),
            PrefKey::FloatRulers => PrefValue::Bool(self.float_rulers),
            PrefKey::ForegroundOpacity => PrefValue::Percent(self.foreground_opacity),
            PrefKey::BackgroundOpacity => PrefValue::Percent(self.background_opacity),
            PrefKey::RulerShadow => PrefValue::Bool(self.ruler_shadow),
        }
    }

    /// Store `value` under `key`.  Returns whether the value changed.
    pub fn set(&mut self, key: PrefKey, value: PrefValue) -> Result<bool, PrefError> {
        let changed = match (key, value) {
            (PrefKey::GroupRulers, PrefValue::Bool(b)) => replace(&mut self.group_rulers, b),
            (PrefKey::FloatRulers, PrefValue::Bool(b)) => replace(&mut self.float_rulers, b),
            (PrefKey::RulerShadow, PrefValue::Bool(b)) => replace(&mut self.ruler_shadow, b),
            (PrefKey::ForegroundOpacity, PrefValue::Percent(p)) => {
                replace(&mut self.foreground_opacity, p.min(MAX_OPACITY))
            }
            (PrefKey::BackgroundOpacity, PrefValue::Percent(p)) => {
                replace(&mut self.background_opacity, p.min(MAX_OPACITY))
            }
            (key, value) => {
                return Err(PrefError::TypeMismatch {
                    key,
                    expected: if key.is_percent() { "number" } else { "boolean" },
                    got: format!("{:?}", value),
                })
            }
        };
        Ok(changed)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

//  Observer registry

/// Something that reacts to preference changes.
pub trait PreferenceSubscriber {
    /// `key` changed; the new value is already readable from the store.
    fn preference_changed(&mut self, key: PrefKey);
}

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Weak<RefCell<dyn PreferenceSubscriber>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<ListenerId, Listener>,
    /// Per key, listener ids in subscription order.
    by_key: BTreeMap<PrefKey, Vec<ListenerId>>,
}

/// Live preference values plus their subscribers.
pub struct PreferenceStore {
    values: RefCell<Preferences>,
    registry: RefCell<Registry>,
    /// Changes a listener could not take because it was mid-callback.
    deferred: RefCell<Vec<(ListenerId, PrefKey)>>,
}

impl PreferenceStore {
    pub fn new(values: Preferences) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(values.normalized()),
            registry: RefCell::new(Registry::default()),
            deferred: RefCell::new(Vec::new()),
        })
    }

    /// Register a listener.  It receives nothing until it subscribes to
    /// keys, and is unsubscribed from everything when the returned
    /// [`Subscription`] is dropped.
    pub fn register(self: &Rc<Self>, subscriber: Listener) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.insert(id, subscriber);
        Subscription {
            id,
            store: Rc::downgrade(self),
        }
    }

    /// Subscribe `listener` to `key`.  Subscribing twice is a no-op.
    pub fn subscribe(&self, key: PrefKey, listener: ListenerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        if !registry.listeners.contains_key(&listener) {
            return false;
        }
        let ids = registry.by_key.entry(key).or_default();
        if ids.contains(&listener) {
            return false;
        }
        ids.push(listener);
        true
    }

    /// Remove `listener` from every key.  Unknown listeners are a no-op.
    pub fn unsubscribe(&self, listener: ListenerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let known = registry.listeners.remove(&listener).is_some();
        for ids in registry.by_key.values_mut() {
            ids.retain(|id| *id != listener);
        }
        known
    }

    /// Number of listeners subscribed to `key`.
    pub fn subscriber_count(&self, key: PrefKey) -> usize {
        self.registry
            .borrow()
            .by_key
            .get(&key)
            .map_or(0, |ids| ids.len())
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    pub fn values(&self) -> Preferences {
        *self.values.borrow()
    }

    pub fn value(&self, key: PrefKey) -> PrefValue {
        self.values.borrow().get(key)
    }

    pub fn group_rulers(&self) -> bool {
        self.values.borrow().group_rulers
    }

    pub fn float_rulers(&self) -> bool {
        self.values.borrow().float_rulers
    }

    pub fn foreground_opacity(&self) -> u8 {
        self.values.borrow().foreground_opacity
    }

    pub fn background_opacity(&self) -> u8 {
        self.values.borrow().background_opacity
    }

    pub fn ruler_shadow(&self) -> bool {
        self.values.borrow().ruler_shadow
    }

    /// Change a preference and notify its subscribers if the value changed.
    pub fn set(&self, key: PrefKey, value: PrefValue) -> Result<bool, PrefError> {
        let changed = self.values.borrow_mut().set(key, value)?;
        if changed {
            debug!("preference {} = {:?}", key, self.value(key));
            self.notify(key);
        }
        Ok(changed)
    }

    /// [`set`](Self::set) by preference name and JSON value.
    pub fn set_named(&self, name: &str, value: &serde_json::Value) -> Result<bool, PrefError> {
        let key: PrefKey = name.parse()?;
        self.set(key, PrefValue::from_json(key, value)?)
    }

    /// Deliver a change of `key` to its subscribers, in order.
    fn notify(&self, key: PrefKey) {
        // Snapshot so listeners may read the store (or unsubscribe) while
        // being notified.
        let targets: Vec<(ListenerId, Listener)> = {
            let registry = self.registry.borrow();
            registry
                .by_key
                .get(&key)
                .into_iter()
                .flatten()
                .filter_map(|id| registry.listeners.get(id).map(|l| (*id, l.clone())))
                .collect()
        };
        for (id, listener) in targets {
            let Some(listener) = listener.upgrade() else {
                debug!("pruning dead preference listener {:?}", id);
                self.unsubscribe(id);
                continue;
            };
            match listener.try_borrow_mut() {
                Ok(mut l) => l.preference_changed(key),
                Err(_) => self.defer(id, key),
            };
        }
        self.flush_deferred();
    }

    /// Queue `key` for a listener that is still running its own callback
    /// (it changed a preference from inside a notification).
    fn defer(&self, id: ListenerId, key: PrefKey) {
        let mut deferred = self.deferred.borrow_mut();
        if !deferred.contains(&(id, key)) {
            debug!("listener {:?} is busy; deferring change of {}", id, key);
            deferred.push((id, key));
        }
    }

    /// Redeliver deferred changes to listeners that are free again.  A
    /// listener that is still busy keeps its entry until a later flush.
    fn flush_deferred(&self) {
        let pending = std::mem::take(&mut *self.deferred.borrow_mut());
        for (id, key) in pending {
            let listener = self.registry.borrow().listeners.get(&id).cloned();
            let Some(listener) = listener.and_then(|l| l.upgrade()) else {
                continue;
            };
            match listener.try_borrow_mut() {
                Ok(mut l) => l.preference_changed(key),
                Err(_) => self.defer(id, key),
            };
        }
    }

    /// Number of changes waiting for a busy listener.
    pub fn deferred_count(&self) -> usize {
        self.deferred.borrow().len()
    }
}

/// Registration of one preference listener.  Dropping it unsubscribes the
/// listener from every key.
pub struct Subscription {
    id: ListenerId,
    store: Weak<PreferenceStore>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Subscribe this listener to `key`.
    pub fn subscribe(&self, key: PrefKey) -> bool {
        self.store
            .upgrade()
            .is_some_and(|store| store.subscribe(key, self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}

/// Errors from reading or writing preferences by name.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PrefError {
    #[error("unknown preference: {0:?}")]
    UnknownKey(String),
    #[error("preference {key} expects a {expected}, got {got}")]
    TypeMismatch {
        key: PrefKey,
        expected: &'static str,
        got: String,
    },
}

impl PrefError {
    fn type_mismatch(key: PrefKey, expected: &'static str, got: &serde_json::Value) -> Self {
        PrefError::TypeMismatch {
            key,
            expected,
            got: got.to_string(),
        }
    }
}
