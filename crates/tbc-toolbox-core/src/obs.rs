//! The per-field observation store shared by a processing run.
//!
//! Observers measure properties of the video signal and publish what they find as namespaced
//! key/value observations.  The namespace is the observer family (`"biphase"`, `"field_parity"`,
//! ...); keys within a namespace identify individual measurements.  Stages and analyzers read
//! the accumulated observations to make decisions.
//!
//! A context may carry a registered *schema*: a set of [`ObservationKey`] declarations collected
//! from the observers in a run.  With a schema registered, [`ObservationContext::set`] rejects
//! writes whose value type does not match the declaration.  Keys without a schema entry are
//! accepted as exploratory data.

use std::collections::BTreeMap;
use std::fmt;

use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use tracing::warn;

use crate::field::FieldId;


/// The value kinds an observation can take.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationType {
    /// 32-bit integer (picture numbers, phases, chapter numbers).
    #[display("int32")]
    I32,
    /// 64-bit integer (sequence counters).
    #[display("int64")]
    I64,
    /// Floating point (levels, ratios, decibels).
    #[display("double")]
    F64,
    /// Text (timecodes, user codes).
    #[display("string")]
    Str,
    /// Boolean flag.
    #[display("bool")]
    Bool,
    /// One of the sealed richer payloads in [`CustomPayload`].
    #[display("custom")]
    Custom,
}

/// A single observation value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
    /// Boolean flag.
    Bool(bool),
    /// 32-bit integer.
    I32(i32),
    /// 64-bit integer.
    I64(i64),
    /// Floating point.
    F64(f64),
    /// Text.
    Str(String),
    /// Sealed richer payload.
    Custom(CustomPayload),
}

impl ObservationValue {
    /// The type tag of this value.
    pub fn observation_type(&self) -> ObservationType {
        match self {
            ObservationValue::Bool(_) => ObservationType::Bool,
            ObservationValue::I32(_) => ObservationType::I32,
            ObservationValue::I64(_) => ObservationType::I64,
            ObservationValue::F64(_) => ObservationType::F64,
            ObservationValue::Str(_) => ObservationType::Str,
            ObservationValue::Custom(_) => ObservationType::Custom,
        }
    }

    /// The contained `i32`, if this is an [`ObservationValue::I32`].
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ObservationValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `i64`, if this is an [`ObservationValue::I64`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ObservationValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `f64`, if this is an [`ObservationValue::F64`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ObservationValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `bool`, if this is an [`ObservationValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ObservationValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained string, if this is an [`ObservationValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ObservationValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The contained payload, if this is an [`ObservationValue::Custom`].
    pub fn as_custom(&self) -> Option<&CustomPayload> {
        match self {
            ObservationValue::Custom(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i32> for ObservationValue {
    fn from(v: i32) -> Self {
        ObservationValue::I32(v)
    }
}

impl From<i64> for ObservationValue {
    fn from(v: i64) -> Self {
        ObservationValue::I64(v)
    }
}

impl From<f64> for ObservationValue {
    fn from(v: f64) -> Self {
        ObservationValue::F64(v)
    }
}

impl From<bool> for ObservationValue {
    fn from(v: bool) -> Self {
        ObservationValue::Bool(v)
    }
}

impl From<String> for ObservationValue {
    fn from(v: String) -> Self {
        ObservationValue::Str(v)
    }
}

impl From<&str> for ObservationValue {
    fn from(v: &str) -> Self {
        ObservationValue::Str(v.to_owned())
    }
}

impl From<CustomPayload> for ObservationValue {
    fn from(v: CustomPayload) -> Self {
        ObservationValue::Custom(v)
    }
}

/// Sound configuration signalled by the programme-status code (IEC 60857 10.1.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum VbiSoundMode {
    Stereo,
    Mono,
    AudioSubcarriersOff,
    Bilingual,
    StereoStereo,
    StereoBilingual,
    CrossChannelStereo,
    BilingualBilingual,
    MonoDump,
    StereoDump,
    BilingualDump,
    FutureUse,
}

/// Decoded programme-status code (IEC 60857 10.1.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeStatus {
    /// Whether CX noise reduction is enabled.
    pub cx_enabled: bool,
    /// Whether the parity over the x4/x5 nibbles checked out.
    pub parity_valid: bool,
    /// Disc diameter: 12 inch when set, 8 inch otherwise.
    pub is_12_inch: bool,
    /// Disc side: side 1 when set.
    pub is_side_1: bool,
    /// Teletext present in the programme.
    pub has_teletext: bool,
    /// Digital video flag.
    pub is_digital: bool,
    /// FM multiplex audio in use.
    pub is_fm_multiplex: bool,
    /// Programme dump flag.
    pub is_programme_dump: bool,
    /// Decoded sound mode.
    pub sound_mode: VbiSoundMode,
}

/// Decoded programme-status code, Amendment 2 interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amendment2Status {
    /// Copy permission flag (x34).
    pub copy_permitted: bool,
    /// Whether the sound configuration is one of the video-standard modes.
    pub is_video_standard: bool,
    /// Decoded sound mode.
    pub sound_mode: VbiSoundMode,
}

/// A VITC timecode decoded from a vertical-interval line (SMPTE 12M BCD fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitcTimecode {
    /// Hours, 0-23.
    pub hours: u8,
    /// Minutes, 0-59.
    pub minutes: u8,
    /// Seconds, 0-59.
    pub seconds: u8,
    /// Frame number within the second.
    pub frames: u8,
    /// Drop-frame flag.
    pub drop_frame: bool,
    /// Colour-frame flag.
    pub color_frame: bool,
    /// The four user bits from each of the eight data bytes.
    pub user_bits: [u8; 8],
}

/// The sealed set of richer observation payloads.
///
/// Payloads are addressed by `(namespace, name)` like any other observation; the namespace is
/// the dispatch key, so there is no dynamic dispatch on the payload itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomPayload {
    /// Decoded programme status.
    ProgrammeStatus(ProgrammeStatus),
    /// Decoded Amendment-2 programme status.
    Amendment2Status(Amendment2Status),
    /// Decoded VITC timecode.
    VitcTimecode(VitcTimecode),
}

/// Declares one observation an observer provides or a consumer requires.
///
/// Keys compare by `(namespace, name)` alone: two declarations of the same key are the same
/// key even when their descriptions differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationKey {
    /// Observer family, e.g. `"biphase"`.
    pub namespace: String,
    /// Measurement name within the namespace, e.g. `"picture_number"`.
    pub name: String,
    /// Expected value type.
    pub observation_type: ObservationType,
    /// Human-readable description.
    pub description: String,
    /// Whether the observation may be absent for some fields.
    pub optional: bool,
}

impl ObservationKey {
    /// Creates a key declaration.
    pub fn new(
        namespace: &str,
        name: &str,
        observation_type: ObservationType,
        description: &str,
        optional: bool,
    ) -> Self {
        ObservationKey {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            observation_type,
            description: description.to_owned(),
            optional,
        }
    }

    /// `namespace.name`, for display.
    pub fn full_key(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl PartialEq for ObservationKey {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }
}

impl Eq for ObservationKey {}

impl PartialOrd for ObservationKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObservationKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.namespace, &self.name).cmp(&(&other.namespace, &other.name))
    }
}

/// One observation staged by an observer, to be applied to the live context by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    /// Observer family the record belongs to.
    pub namespace: &'static str,
    /// Measurement name.
    pub name: &'static str,
    /// Measured value.
    pub value: ObservationValue,
}

impl ObservationRecord {
    /// Creates a staged observation.
    pub fn new(
        namespace: &'static str,
        name: &'static str,
        value: impl Into<ObservationValue>,
    ) -> Self {
        ObservationRecord { namespace, name, value: value.into() }
    }
}

/// Map of `name -> value` for a single namespace.
pub type NamespaceObservations = BTreeMap<String, ObservationValue>;

/// Map of `namespace -> name -> value` for a single field.
pub type FieldObservations = BTreeMap<String, NamespaceObservations>;

/// Result type for observation-store operations.
pub type ObservationResult<T, E = ObservationError> = std::result::Result<T, E>;

/// Error type for observation-store operations.
#[derive(Debug, Snafu)]
pub enum ObservationError {
    /// A write targeted the invalid field sentinel.
    #[snafu(display("Cannot store an observation against the invalid field ID"))]
    InvalidFieldId,

    /// A write's value type contradicted the registered schema.
    #[snafu(display(
        "Observation {namespace}.{name} expects {expected} but a {actual} value was written"
    ))]
    SchemaMismatch {
        /// Namespace of the rejected write.
        namespace: String,
        /// Key name of the rejected write.
        name: String,
        /// Type declared by the schema.
        expected: ObservationType,
        /// Type of the rejected value.
        actual: ObservationType,
    },

    /// Registering a schema produced conflicting type declarations.  All conflicts are listed.
    #[snafu(display("Conflicting observation schema declarations: {}", conflicts.join("; ")))]
    SchemaConflict {
        /// One message per conflicting `(namespace, name)` pair.
        conflicts: Vec<String>,
    },
}

impl ObservationError {
    /// The error taxonomy entry this error maps onto.
    pub fn kind(&self) -> crate::ErrorKind {
        crate::ErrorKind::InvalidArgument
    }
}

/// Typed, namespaced, per-field observation store.
#[derive(Debug, Default, Clone)]
pub struct ObservationContext {
    observations: BTreeMap<FieldId, FieldObservations>,
    schema: BTreeMap<(String, String), ObservationType>,
}

impl ObservationContext {
    /// Creates an empty context with no schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `(field_id, namespace, name)`.
    ///
    /// Rejects writes against the invalid field sentinel and, when a schema entry exists for
    /// the key, writes whose value type contradicts the declaration.  Keys without a schema
    /// entry are accepted as exploratory data.
    pub fn set(
        &mut self,
        field_id: FieldId,
        namespace: &str,
        name: &str,
        value: impl Into<ObservationValue>,
    ) -> ObservationResult<()> {
        snafu::ensure!(field_id.is_valid(), InvalidFieldIdSnafu);
        let value = value.into();
        if let Some(expected) = self.schema.get(&(namespace.to_owned(), name.to_owned())) {
            let actual = value.observation_type();
            snafu::ensure!(
                actual == *expected,
                SchemaMismatchSnafu {
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                    expected: *expected,
                    actual,
                }
            );
        }
        self.observations
            .entry(field_id)
            .or_default()
            .entry(namespace.to_owned())
            .or_default()
            .insert(name.to_owned(), value);
        Ok(())
    }

    /// Observer-facing variant of [`ObservationContext::set`]: schema violations are logged and
    /// dropped instead of surfaced, upholding the policy that observers never fail.
    pub fn record(
        &mut self,
        field_id: FieldId,
        namespace: &str,
        name: &str,
        value: impl Into<ObservationValue>,
    ) {
        if let Err(error) = self.set(field_id, namespace, name, value) {
            warn!(%field_id, namespace, name, %error, "dropping observation");
        }
    }

    /// Applies a batch of staged observer records for one field.
    pub fn apply_records(&mut self, field_id: FieldId, records: Vec<ObservationRecord>) {
        for record in records {
            self.record(field_id, record.namespace, record.name, record.value);
        }
    }

    /// Looks up an observation.
    pub fn get(&self, field_id: FieldId, namespace: &str, name: &str) -> Option<&ObservationValue> {
        self.observations.get(&field_id)?.get(namespace)?.get(name)
    }

    /// Whether an observation is present.
    pub fn has(&self, field_id: FieldId, namespace: &str, name: &str) -> bool {
        self.get(field_id, namespace, name).is_some()
    }

    /// All key names present for a field within one namespace.
    pub fn keys(&self, field_id: FieldId, namespace: &str) -> Vec<String> {
        self.observations
            .get(&field_id)
            .and_then(|ns| ns.get(namespace))
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All namespaces that hold observations for a field.
    pub fn namespaces(&self, field_id: FieldId) -> Vec<String> {
        self.observations
            .get(&field_id)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every observation stored for a field.
    pub fn all_for_field(&self, field_id: FieldId) -> FieldObservations {
        self.observations.get(&field_id).cloned().unwrap_or_default()
    }

    /// Removes every observation in the context.  The schema is retained.
    pub fn clear(&mut self) {
        self.observations.clear();
    }

    /// Removes every observation for one field.
    pub fn clear_field(&mut self, field_id: FieldId) {
        self.observations.remove(&field_id);
    }

    /// Registers schema declarations, enabling type validation on subsequent writes.
    ///
    /// Re-declaring a key with the same type is permitted (observers may share keys across a
    /// run).  Conflicting declarations are all collected into a single
    /// [`ObservationError::SchemaConflict`] before the registration is refused; the schema is
    /// left unchanged in that case.
    pub fn register_schema(&mut self, keys: &[ObservationKey]) -> ObservationResult<()> {
        let mut staged = self.schema.clone();
        let mut conflicts = Vec::new();
        for key in keys {
            let map_key = (key.namespace.clone(), key.name.clone());
            match staged.get(&map_key) {
                Some(existing) if *existing != key.observation_type => {
                    conflicts.push(format!(
                        "{} declared as both {existing} and {}",
                        key.full_key(),
                        key.observation_type
                    ));
                }
                _ => {
                    staged.insert(map_key, key.observation_type);
                }
            }
        }
        snafu::ensure!(conflicts.is_empty(), SchemaConflictSnafu { conflicts });
        self.schema = staged;
        Ok(())
    }

    /// Removes every schema declaration.
    pub fn clear_schema(&mut self) {
        self.schema.clear();
    }

    /// Number of fields that hold at least one observation.
    pub fn field_count(&self) -> usize {
        self.observations.len()
    }

    /// The highest field ID that holds observations, or the invalid sentinel when empty.
    pub fn latest_field(&self) -> FieldId {
        self.observations.keys().next_back().copied().unwrap_or_else(FieldId::invalid)
    }

    /// A read-only history view over this context.
    pub fn history(&self) -> ObservationHistory<'_> {
        ObservationHistory { context: self }
    }
}

/// Read-only view of observations accumulated earlier in a run.
///
/// Observers receive this view instead of the live context: they stage their own writes as
/// [`ObservationRecord`]s which the engine applies afterwards, so within one field an observer
/// sees the results of observers that ran before it, and for earlier fields it sees everything.
/// Fallback lookups (such as field parity flipping the previous field's result) only ever reach
/// strictly smaller field IDs, so no cycles can form.
#[derive(Debug, Clone, Copy)]
pub struct ObservationHistory<'a> {
    context: &'a ObservationContext,
}

impl ObservationHistory<'_> {
    /// Looks up an observation.
    pub fn get(&self, field_id: FieldId, namespace: &str, name: &str) -> Option<&ObservationValue> {
        self.context.get(field_id, namespace, name)
    }

    /// Shorthand for an `i32` observation.
    pub fn get_i32(&self, field_id: FieldId, namespace: &str, name: &str) -> Option<i32> {
        self.get(field_id, namespace, name)?.as_i32()
    }

    /// Shorthand for an `f64` observation.
    pub fn get_f64(&self, field_id: FieldId, namespace: &str, name: &str) -> Option<f64> {
        self.get(field_id, namespace, name)?.as_f64()
    }

    /// Shorthand for a `bool` observation.
    pub fn get_bool(&self, field_id: FieldId, namespace: &str, name: &str) -> Option<bool> {
        self.get(field_id, namespace, name)?.as_bool()
    }

    /// Whether any observations exist for a field.
    pub fn has_field(&self, field_id: FieldId) -> bool {
        !self.context.namespaces(field_id).is_empty()
    }

    /// The highest field ID processed so far.
    pub fn latest_field(&self) -> FieldId {
        self.context.latest_field()
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.namespace, self.name, self.observation_type)
    }
}
