use crate::application::controller::UserDecision;
use crate::application::session::SessionEvent;
use crate::domain::lifecycle::LifecycleState;
use crate::domain::scan::ScanEvent;
use crate::error::ReplayError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Scan,
    Rescan,
    Proceed,
    Lifecycle,
    Decide,
    Cancel,
    Close,
    Manual,
    AddTag,
    RenameTag,
    RemoveTag,
}

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

impl From<Answer> for UserDecision {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Yes => UserDecision::Confirmed,
            Answer::No => UserDecision::Declined,
        }
    }
}

/// One row of a recorded session: `event, at, payload, amount, note, tag,
/// state, decision, name`. Columns an event does not use may be left empty,
/// and a trailing `name` column may be omitted entirely.
///
/// `tag` names an existing tag; `name` is the new name for `add_tag` and
/// `rename_tag`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRecord {
    pub event: EventKind,
    /// Milliseconds since the Unix epoch.
    pub at: i64,
    pub payload: Option<String>,
    pub amount: Option<String>,
    pub note: Option<String>,
    pub tag: Option<String>,
    pub state: Option<LifecycleState>,
    pub decision: Option<Answer>,
    #[serde(default)]
    pub name: Option<String>,
}

impl TryFrom<EventRecord> for SessionEvent {
    type Error = ReplayError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let at = DateTime::<Utc>::from_timestamp_millis(record.at)
            .ok_or_else(|| ReplayError::InvalidRow(format!("timestamp {} out of range", record.at)))?;

        let event = match record.event {
            EventKind::Scan => SessionEvent::Scan(ScanEvent::new(
                record.payload.unwrap_or_default(),
                at,
            )),
            EventKind::Rescan => SessionEvent::Rescan,
            EventKind::Proceed => SessionEvent::Proceed {
                amount: record.amount.unwrap_or_default(),
                tag: record.tag,
                note: record.note.unwrap_or_default(),
            },
            EventKind::Lifecycle => SessionEvent::Lifecycle(record.state.ok_or_else(|| {
                ReplayError::InvalidRow("lifecycle event without a state".to_string())
            })?),
            EventKind::Decide => SessionEvent::Decide {
                decision: record
                    .decision
                    .ok_or_else(|| {
                        ReplayError::InvalidRow("decide event without a decision".to_string())
                    })?
                    .into(),
                at,
            },
            EventKind::Cancel => SessionEvent::Cancel,
            EventKind::Close => SessionEvent::Close,
            EventKind::Manual => SessionEvent::Manual {
                amount: record.amount.unwrap_or_default(),
                tag: record.tag,
                note: record.note.unwrap_or_default(),
                at,
            },
            EventKind::AddTag => SessionEvent::AddTag(required(record.name, "add_tag", "name")?),
            EventKind::RenameTag => SessionEvent::RenameTag {
                from: required(record.tag, "rename_tag", "tag")?,
                to: required(record.name, "rename_tag", "name")?,
            },
            EventKind::RemoveTag => {
                SessionEvent::RemoveTag(required(record.tag, "remove_tag", "tag")?)
            }
        };
        Ok(event)
    }
}

fn required(value: Option<String>, event: &str, column: &str) -> Result<String, ReplayError> {
    value.ok_or_else(|| ReplayError::InvalidRow(format!("{event} event without a {column}")))
}

/// Reads recorded session events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// and yields events lazily.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and converts events.
    pub fn events(self) -> impl Iterator<Item = Result<SessionEvent, ReplayError>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| SessionEvent::try_from(result?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "event,at,payload,amount,note,tag,state,decision\n";

    fn read(rows: &str) -> Vec<Result<SessionEvent, ReplayError>> {
        let data = format!("{HEADER}{rows}");
        EventReader::new(data.as_bytes()).events().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = read(
            "scan,1700000000000,upi://pay?pa=x@bank,,,,,\n\
             proceed,1700000001000,,150,,Food,,\n\
             lifecycle,1700000002000,,,,,background,\n\
             decide,1700000003000,,,,,,yes\n",
        );
        assert_eq!(results.len(), 4);

        let SessionEvent::Scan(scan) = results[0].as_ref().unwrap() else {
            panic!("expected scan");
        };
        assert_eq!(scan.payload, "upi://pay?pa=x@bank");
        assert_eq!(scan.observed_at.timestamp_millis(), 1_700_000_000_000);

        assert_eq!(
            results[1].as_ref().unwrap(),
            &SessionEvent::Proceed {
                amount: "150".to_string(),
                tag: Some("Food".to_string()),
                note: String::new(),
            }
        );
        assert_eq!(
            results[2].as_ref().unwrap(),
            &SessionEvent::Lifecycle(LifecycleState::Background)
        );
        assert!(matches!(
            results[3].as_ref().unwrap(),
            SessionEvent::Decide {
                decision: UserDecision::Confirmed,
                ..
            }
        ));
    }

    #[test]
    fn test_reader_short_rows() {
        let results = read("close,1700000000000\n");
        assert_eq!(results[0].as_ref().unwrap(), &SessionEvent::Close);
    }

    #[test]
    fn test_reader_manual_and_tag_rows() {
        let data = "event,at,payload,amount,note,tag,state,decision,name\n\
                    manual,1700000000000,,20,bus,Transport,,,\n\
                    add_tag,1700000000000,,,,,,,Gym\n\
                    rename_tag,1700000000000,,,,Gym,,,Fitness\n\
                    remove_tag,1700000000000,,,,Fitness,,,\n\
                    rename_tag,1700000000000,,,,Gym,,,\n";
        let results: Vec<_> = EventReader::new(data.as_bytes()).events().collect();

        assert!(matches!(
            results[0].as_ref().unwrap(),
            SessionEvent::Manual { amount, tag: Some(tag), .. } if amount == "20" && tag == "Transport"
        ));
        assert_eq!(
            results[1].as_ref().unwrap(),
            &SessionEvent::AddTag("Gym".to_string())
        );
        assert_eq!(
            results[2].as_ref().unwrap(),
            &SessionEvent::RenameTag {
                from: "Gym".to_string(),
                to: "Fitness".to_string(),
            }
        );
        assert_eq!(
            results[3].as_ref().unwrap(),
            &SessionEvent::RemoveTag("Fitness".to_string())
        );
        assert!(matches!(results[4], Err(ReplayError::InvalidRow(_))));
    }

    #[test]
    fn test_reader_malformed_lines() {
        let results = read(
            "teleport,1700000000000,,,,,,\n\
             lifecycle,1700000000000,,,,,,\n\
             decide,1700000000000,,,,,,maybe\n\
             scan,not_a_time,upi://pay,,,,,\n",
        );
        assert_eq!(results.len(), 4);
        assert!(matches!(results[0], Err(ReplayError::Csv(_))));
        assert!(matches!(results[1], Err(ReplayError::InvalidRow(_))));
        assert!(matches!(results[2], Err(ReplayError::Csv(_))));
        assert!(matches!(results[3], Err(ReplayError::Csv(_))));
    }
}
