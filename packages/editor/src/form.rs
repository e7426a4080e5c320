//! # Form Serializer
//!
//! Bidirectional mapping between a front-matter record and editable field
//! state, driven by the collection schema.
//!
//! | widget     | record → field                         | field → record                          |
//! |------------|----------------------------------------|-----------------------------------------|
//! | `string`   | value as text, default when absent     | raw text                                |
//! | `boolean`  | checked when `true`                    | checkbox state, never absent            |
//! | `list`     | elements joined with `", "`            | split on `,`, trimmed, empties dropped  |
//! | `datetime` | instant shown as local wall-clock time | local time with explicit numeric offset |
//!
//! Keys missing from the schema are kept as extra fields whose widget is
//! inferred from the value. Form order is schema order, then extra keys in
//! the order the record lists them.

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, SubsecRound, TimeZone,
    Timelike, Utc,
};
use hugocms_common::{Collection, FieldDescriptor, FrontMatter, Widget, BODY_FIELD};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Wall-clock format of datetime inputs
const INPUT_MINUTES: &str = "%Y-%m-%dT%H:%M";
const INPUT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Stored datetime format: local time plus `+HH:MM` offset. Fractional
/// seconds are written only when present.
const RECORD_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

const LIST_SEPARATOR: &str = ", ";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field {field} is a {widget:?} field and cannot take this input")]
    InputMismatch { field: String, widget: Widget },

    #[error("Invalid UTC offset: {0}")]
    InvalidOffset(String),
}

/// Time zone used to show and rebuild datetime fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalZone {
    /// The machine's zone, looked up at conversion time
    #[default]
    System,
    Fixed(FixedOffset),
}

impl LocalZone {
    /// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`
    pub fn parse(offset: &str) -> Result<Self, FormError> {
        let invalid = || FormError::InvalidOffset(offset.to_string());
        let trimmed = offset.trim();
        if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
            return Ok(LocalZone::Fixed(FixedOffset::east_opt(0).ok_or_else(invalid)?));
        }

        let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
            (1, rest)
        } else if let Some(rest) = trimmed.strip_prefix('-') {
            (-1, rest)
        } else {
            return Err(invalid());
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
        let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(LocalZone::Fixed)
            .ok_or_else(invalid)
    }

    fn wall_clock(&self, instant: DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            LocalZone::System => instant.with_timezone(&Local).naive_local(),
            LocalZone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    fn stamp(&self, wall_clock: NaiveDateTime) -> Option<String> {
        match self {
            LocalZone::System => stamp_in(&Local, wall_clock),
            LocalZone::Fixed(offset) => stamp_in(offset, wall_clock),
        }
    }

    fn now(&self) -> NaiveDateTime {
        self.wall_clock(Utc::now().fixed_offset()).trunc_subsecs(0)
    }
}

/// Resolve a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant; times inside a DST gap move forward by an hour.
fn stamp_in<Tz: TimeZone>(tz: &Tz, wall_clock: NaiveDateTime) -> Option<String>
where
    Tz::Offset: fmt::Display,
{
    let resolved = tz
        .from_local_datetime(&wall_clock)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(wall_clock + Duration::hours(1))).earliest())?;
    Some(resolved.format(RECORD_FORMAT).to_string())
}

/// Current value of one form input
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    Checked(bool),
}

impl FieldInput {
    pub fn text(&self) -> Option<&str> {
        match self {
            FieldInput::Text(text) => Some(text),
            FieldInput::Checked(_) => None,
        }
    }

    pub fn checked(&self) -> Option<bool> {
        match self {
            FieldInput::Checked(checked) => Some(*checked),
            FieldInput::Text(_) => None,
        }
    }
}

/// One rendered form field
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub widget: Widget,
    pub input: FieldInput,

    /// Key found in the record but not declared by the schema
    pub extra: bool,

    /// Original record value and the text it was shown as, for values the
    /// widget cannot reproduce from text (numbers in a string field, nested
    /// lists, timestamps in another offset, ...). Emitted verbatim while the
    /// text is untouched.
    original: Option<(String, Value)>,
}

impl FormField {
    fn accepts(&self, input: &FieldInput) -> bool {
        matches!(
            (self.widget, input),
            (Widget::Boolean, FieldInput::Checked(_))
                | (Widget::String | Widget::List | Widget::Datetime, FieldInput::Text(_))
        )
    }
}

/// Editable front matter of one document
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    fields: Vec<FormField>,
    zone: LocalZone,
}

impl FormState {
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the input of a field
    pub fn set(&mut self, name: &str, input: FieldInput) -> Result<(), FormError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;

        if !field.accepts(&input) {
            return Err(FormError::InputMismatch {
                field: name.to_string(),
                widget: field.widget,
            });
        }

        field.input = input;
        Ok(())
    }

    /// Set a field from command-line style text: `true`/`false` for
    /// boolean fields, raw text otherwise
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), FormError> {
        let widget = self
            .field(name)
            .map(|f| f.widget)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;

        let input = match widget {
            Widget::Boolean => FieldInput::Checked(matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            )),
            _ => FieldInput::Text(text.to_string()),
        };
        self.set(name, input)
    }

    /// Rebuild the front-matter record from the current inputs
    pub fn to_record(&self) -> FrontMatter {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), field_to_value(field, &self.zone)))
            .collect()
    }
}

/// Converts records to forms and back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormSerializer {
    zone: LocalZone,
}

impl FormSerializer {
    pub fn new(zone: LocalZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Build the form for a record. `schema` is the field list of the
    /// document's collection, empty when the document belongs to none.
    pub fn to_form(&self, record: &FrontMatter, schema: &[FieldDescriptor]) -> FormState {
        let mut fields: Vec<FormField> = schema
            .iter()
            .filter(|descriptor| descriptor.name != BODY_FIELD)
            .map(|descriptor| {
                self.build_field(
                    descriptor.name.clone(),
                    descriptor.display_label().to_string(),
                    descriptor.widget,
                    record.get(&descriptor.name),
                    descriptor.default.as_ref(),
                    false,
                )
            })
            .collect();

        for (key, value) in record {
            if fields.iter().any(|f| &f.name == key) {
                continue;
            }
            fields.push(self.build_field(
                key.clone(),
                format!("{} (Extra)", key),
                infer_widget(value),
                Some(value),
                None,
                true,
            ));
        }

        FormState {
            fields,
            zone: self.zone,
        }
    }

    pub fn to_record(&self, form: &FormState) -> FrontMatter {
        form.to_record()
    }

    /// Empty form for a new document in `collection`, seeded with schema
    /// defaults. Datetime fields without a default start at the current time.
    pub fn creation_form(&self, collection: &Collection) -> FormState {
        let mut form = self.to_form(&FrontMatter::new(), &collection.fields);
        for field in &mut form.fields {
            let has_default = collection
                .fields
                .iter()
                .any(|d| d.name == field.name && d.default.is_some());
            if field.widget == Widget::Datetime && !has_default {
                field.input = FieldInput::Text(self.now_input());
            }
        }
        form
    }

    /// Current local wall-clock time formatted for a datetime input
    pub fn now_input(&self) -> String {
        format_wall_clock(self.zone.now())
    }

    /// Render a stored timestamp as local wall-clock text. Values that are
    /// not timestamps are shown unchanged.
    pub fn datetime_to_input(&self, stored: &str) -> String {
        match parse_stored_datetime(stored) {
            Some(Stored::Instant(instant)) => format_wall_clock(self.zone.wall_clock(instant)),
            Some(Stored::WallClock(naive)) => format_wall_clock(naive),
            None => stored.to_string(),
        }
    }

    /// Rebuild a stored timestamp from wall-clock text, using the zone's
    /// offset at that moment. Empty input clears the value.
    pub fn input_to_datetime(&self, input: &str) -> Value {
        input_to_datetime(input, &self.zone)
    }

    fn build_field(
        &self,
        name: String,
        label: String,
        widget: Widget,
        value: Option<&Value>,
        default: Option<&Value>,
        extra: bool,
    ) -> FormField {
        let present = value.filter(|v| !v.is_null());
        let shown = present.or(default.filter(|v| !v.is_null()));

        let input = match widget {
            Widget::Boolean => FieldInput::Checked(shown.and_then(Value::as_bool).unwrap_or(false)),
            Widget::String => FieldInput::Text(shown.map(value_text).unwrap_or_default()),
            Widget::List => FieldInput::Text(shown.map(list_text).unwrap_or_default()),
            Widget::Datetime => FieldInput::Text(
                shown
                    .map(|v| match v.as_str() {
                        Some(stored) => self.datetime_to_input(stored),
                        None => value_text(v),
                    })
                    .unwrap_or_default(),
            ),
        };

        let mut field = FormField {
            name,
            label,
            widget,
            input,
            extra,
            original: None,
        };

        // Keep what the text form would lose
        if let (Some(value), FieldInput::Text(text)) = (present, &field.input) {
            if matches!(widget, Widget::String | Widget::List | Widget::Datetime)
                && field_to_value(&field, &self.zone) != *value
            {
                field.original = Some((text.clone(), value.clone()));
            }
        }

        field
    }
}

fn infer_widget(value: &Value) -> Widget {
    match value {
        Value::Bool(_) => Widget::Boolean,
        Value::Array(_) => Widget::List,
        _ => Widget::String,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn list_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        other => value_text(other),
    }
}

/// Split list input: comma separated, trimmed, empty segments dropped
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn field_to_value(field: &FormField, zone: &LocalZone) -> Value {
    match &field.input {
        FieldInput::Checked(checked) => Value::Bool(*checked),
        FieldInput::Text(text) => {
            if let Some((shown, original)) = &field.original {
                if shown == text {
                    return original.clone();
                }
            }
            match field.widget {
                Widget::List => Value::Array(parse_list(text).into_iter().map(Value::String).collect()),
                Widget::Datetime => input_to_datetime(text, zone),
                Widget::Boolean => Value::Bool(text.trim() == "true"),
                Widget::String => Value::String(text.clone()),
            }
        }
    }
}

fn input_to_datetime(input: &str, zone: &LocalZone) -> Value {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    NaiveDateTime::parse_from_str(trimmed, INPUT_SECONDS)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, INPUT_MINUTES))
        .ok()
        .and_then(|naive| zone.stamp(naive))
        .map(Value::String)
        // Not a wall-clock input; keep what the user typed
        .unwrap_or_else(|| Value::String(trimmed.to_string()))
}

enum Stored {
    Instant(DateTime<FixedOffset>),
    WallClock(NaiveDateTime),
}

fn parse_stored_datetime(stored: &str) -> Option<Stored> {
    let trimmed = stored.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(Stored::Instant(instant));
    }
    // Date-only values denote UTC midnight
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Stored::Instant(midnight.and_utc().fixed_offset()));
    }
    NaiveDateTime::parse_from_str(trimmed, INPUT_SECONDS)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, INPUT_MINUTES))
        .ok()
        .map(Stored::WallClock)
}

fn format_wall_clock(naive: NaiveDateTime) -> String {
    if naive.second() == 0 && naive.nanosecond() == 0 {
        naive.format(INPUT_MINUTES).to_string()
    } else {
        naive.format(INPUT_SECONDS).to_string()
    }
}
