//! Streaming decoder for current-weather API responses.
//!
//! The response body is a JSON array holding at most one weather object.
//! It is read token by token through `serde_json`'s reader-backed
//! deserializer; each record shape supplies a table of the field names it
//! understands and everything else is skipped unread.

use std::{
    cell::{Cell, RefCell},
    fmt,
    io::{BufReader, Read},
    marker::PhantomData,
};

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::error::Category;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::model::{DecodeOutcome, WeatherRecord};

mod shapes;

/// Position of the decoder in the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeState {
    #[default]
    ExpectArrayStart,
    ExpectElementOrArrayEnd,
    ExpectObjectStart,
    ExpectFieldNameOrObjectEnd,
    DecodingFieldValue,
    ObjectClosed,
    NoData,
    Decoded,
    Failed,
}

impl DecodeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DecodeState::NoData | DecodeState::Decoded | DecodeState::Failed)
    }
}

impl fmt::Display for DecodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecodeState::ExpectArrayStart => "expecting array start",
            DecodeState::ExpectElementOrArrayEnd => "expecting element or array end",
            DecodeState::ExpectObjectStart => "expecting object start",
            DecodeState::ExpectFieldNameOrObjectEnd => "expecting field name or object end",
            DecodeState::DecodingFieldValue => "decoding field value",
            DecodeState::ObjectClosed => "object closed",
            DecodeState::NoData => "no data",
            DecodeState::Decoded => "decoded",
            DecodeState::Failed => "failed",
        })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed JSON, premature end of input, or a structure of the wrong shape.
    #[error("malformed weather response at {path} while {state}: {source}")]
    Structural {
        state: DecodeState,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A recognized field carried a value of the wrong JSON kind.
    #[error("unexpected value at {path}: {source}")]
    TypeMismatch {
        state: DecodeState,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{record} object is missing required field `{field}`")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("failed to read weather response: {0}")]
    Io(#[source] std::io::Error),
}

impl DecodeError {
    /// State the decoder was in when it gave up, when one applies.
    pub fn state(&self) -> Option<DecodeState> {
        match self {
            DecodeError::Structural { state, .. } | DecodeError::TypeMismatch { state, .. } => {
                Some(*state)
            }
            DecodeError::MissingField { .. } => Some(DecodeState::ObjectClosed),
            DecodeError::Io(_) => None,
        }
    }

    /// JSON path of the value being decoded when the error occurred, e.g. `$[0].main.humidity`.
    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::Structural { path, .. } | DecodeError::TypeMismatch { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}

/// Decodes one API response from `reader`.
///
/// The reader is consumed and dropped before this returns, whatever the
/// outcome. Only the first element of the root array is decoded; anything
/// after it is left unread, so a malformed tail does not fail the call.
pub fn decode<R: Read>(reader: R) -> Result<DecodeOutcome, DecodeError> {
    let tracker = Tracker::default();
    let first = Cell::new(None);

    let result = {
        let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
        (&mut de).deserialize_seq(RootVisitor { tracker: &tracker, first: &first })
    };

    match (first.take(), result) {
        (Some(record), tail) => {
            // Closing the root array is the only check made after the first
            // record; whatever follows it is never parsed.
            if let Err(err) = tail {
                warn!(error = %err, "ignoring root array content after the first record");
            }
            tracker.enter(DecodeState::Decoded);
            debug!(state = %DecodeState::Decoded, "weather response decoded");
            Ok(DecodeOutcome::Records(vec![record]))
        }
        (None, Ok(())) => {
            tracker.enter(DecodeState::NoData);
            debug!(state = %DecodeState::NoData, "weather response decoded");
            Ok(DecodeOutcome::NoData)
        }
        (None, Err(err)) => {
            let err = tracker.fail(err);
            debug!(error = %err, "weather response rejected");
            Err(err)
        }
    }
}

/// One shape of JSON object the decoder knows how to read.
trait Record: Sized {
    const NAME: &'static str;

    /// JSON field names this shape reads. Anything else is skipped.
    const FIELDS: &'static [&'static str];

    type Builder: Default;

    /// Reads the value of `field`, one of [`Record::FIELDS`], into `builder`.
    fn read_field<'de, A: MapAccess<'de>>(
        builder: &mut Self::Builder,
        field: &'static str,
        map: &mut A,
        tracker: &Tracker,
    ) -> Result<(), A::Error>;

    /// Freezes the builder, or names the required field that never arrived.
    fn freeze(builder: Self::Builder) -> Result<Self, &'static str>;
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Field(&'static str),
    Index(usize),
}

/// Per-call decoder state. Lives on the stack of one [`decode`] call.
#[derive(Debug, Default)]
struct Tracker {
    state: Cell<DecodeState>,
    path: RefCell<Vec<Segment>>,
    missing: Cell<Option<(&'static str, &'static str)>>,
}

impl Tracker {
    fn enter(&self, state: DecodeState) {
        let current = self.state.get();
        if current.is_terminal() {
            return;
        }
        trace!(from = %current, to = %state, "decoder transition");
        self.state.set(state);
    }

    fn push(&self, segment: Segment) {
        self.path.borrow_mut().push(segment);
    }

    fn pop(&self) {
        self.path.borrow_mut().pop();
    }

    fn path_string(&self) -> String {
        let mut out = String::from("$");
        for segment in self.path.borrow().iter() {
            match segment {
                Segment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                Segment::Index(i) => out.push_str(&format!("[{i}]")),
            }
        }
        out
    }

    /// Whether the failing value belongs to a recognized field.
    fn inside_field(&self) -> bool {
        self.path.borrow().iter().any(|s| matches!(s, Segment::Field(_)))
    }

    fn fail(&self, source: serde_json::Error) -> DecodeError {
        let state = self.state.get();
        let path = self.path_string();
        self.state.set(DecodeState::Failed);

        if let Some((record, field)) = self.missing.take() {
            return DecodeError::MissingField { record, field };
        }

        match source.classify() {
            Category::Io => DecodeError::Io(source.into()),
            Category::Data if self.inside_field() => DecodeError::TypeMismatch { state, path, source },
            Category::Syntax
                if state == DecodeState::DecodingFieldValue && is_out_of_range(&source) =>
            {
                DecodeError::TypeMismatch { state, path, source }
            }
            Category::Data | Category::Syntax | Category::Eof => {
                DecodeError::Structural { state, path, source }
            }
        }
    }
}

/// serde_json files numbers that overflow their target type under syntax
/// errors; for a recognized field they are a value of the wrong kind.
fn is_out_of_range(err: &serde_json::Error) -> bool {
    err.to_string().starts_with("number out of range")
}

/// Reads the first element of the root array into `first` and stops.
struct RootVisitor<'t> {
    tracker: &'t Tracker,
    first: &'t Cell<Option<WeatherRecord>>,
}

impl<'de> Visitor<'de> for RootVisitor<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of weather records")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let tracker = self.tracker;
        tracker.enter(DecodeState::ExpectElementOrArrayEnd);

        tracker.push(Segment::Index(0));
        let first = seq.next_element_seed(RecordSeed::<WeatherRecord>::new(tracker))?;
        tracker.pop();

        match first {
            Some(record) => self.first.set(Some(record)),
            None => debug!("root array is empty"),
        }
        Ok(())
    }
}

/// Decodes one object of shape `T`.
struct RecordSeed<'t, T> {
    tracker: &'t Tracker,
    marker: PhantomData<fn() -> T>,
}

impl<'t, T> RecordSeed<'t, T> {
    fn new(tracker: &'t Tracker) -> Self {
        Self { tracker, marker: PhantomData }
    }
}

impl<'de, T: Record> DeserializeSeed<'de> for RecordSeed<'_, T> {
    type Value = T;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<T, D::Error> {
        self.tracker.enter(DecodeState::ExpectObjectStart);
        deserializer.deserialize_map(self)
    }
}

impl<'de, T: Record> Visitor<'de> for RecordSeed<'_, T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} object", T::NAME)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<T, A::Error> {
        let tracker = self.tracker;
        let mut builder = T::Builder::default();

        tracker.enter(DecodeState::ExpectFieldNameOrObjectEnd);
        while let Some(key) = map.next_key::<String>()? {
            match T::FIELDS.iter().copied().find(|f| *f == key) {
                Some(field) => {
                    trace!(record = T::NAME, field, "decoding field");
                    tracker.push(Segment::Field(field));
                    tracker.enter(DecodeState::DecodingFieldValue);
                    T::read_field(&mut builder, field, &mut map, tracker)?;
                    tracker.pop();
                }
                None => {
                    debug!(record = T::NAME, field = %key, "skipping unrecognized field");
                    map.next_value::<IgnoredAny>()?;
                }
            }
            tracker.enter(DecodeState::ExpectFieldNameOrObjectEnd);
        }
        tracker.enter(DecodeState::ObjectClosed);

        T::freeze(builder).map_err(|field| {
            tracker.missing.set(Some((T::NAME, field)));
            de::Error::missing_field(field)
        })
    }
}

/// Decodes an array of `T` objects in source order.
struct ListSeed<'t, T> {
    tracker: &'t Tracker,
    marker: PhantomData<fn() -> T>,
}

impl<'t, T> ListSeed<'t, T> {
    fn new(tracker: &'t Tracker) -> Self {
        Self { tracker, marker: PhantomData }
    }
}

impl<'de, T: Record> DeserializeSeed<'de> for ListSeed<'_, T> {
    type Value = Vec<T>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Vec<T>, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, T: Record> Visitor<'de> for ListSeed<'_, T> {
    type Value = Vec<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an array of {} objects", T::NAME)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
        let tracker = self.tracker;
        let mut items = Vec::new();
        loop {
            tracker.enter(DecodeState::ExpectElementOrArrayEnd);
            tracker.push(Segment::Index(items.len()));
            let item = seq.next_element_seed(RecordSeed::<T>::new(tracker))?;
            tracker.pop();
            match item {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }
}
