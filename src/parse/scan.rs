//! A finite-state line scanner for text output.
//!
//! The scanner is in one of two states: no record open, or accumulating one.
//! A [`Grammar`] classifies each line as a header, an attribute, or noise:
//!
//! | state        | line      | next                                      |
//! |--------------|-----------|-------------------------------------------|
//! | no record    | header    | open a record                             |
//! | no record    | attribute | ignore it (orphan)                        |
//! | accumulating | header    | flush the open record, open a new one     |
//! | accumulating | attribute | apply it to the open record               |
//! | any          | noise     | unchanged                                 |
//!
//! At end of input an open record is flushed. Flushing keeps a record only if
//! it has its identifying field; a record closed by the very next header is
//! still kept, carrying whatever defaults it was opened with.

/// How a grammar sees a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<H, A> {
    /// Starts a new record.
    Header(H),

    /// Populates a field on the open record.
    Attribute(A),

    /// Matches nothing; ignored.
    Noise,
}

/// The record format of one command's text output.
pub trait Grammar {
    type Header;
    type Attribute;
    type Record;

    fn classify(&self, line: &str) -> LineKind<Self::Header, Self::Attribute>;

    /// Open a record from its header, with defaults for everything else.
    fn open(&self, header: Self::Header) -> Self::Record;

    fn apply(&self, record: &mut Self::Record, attribute: Self::Attribute);

    /// Whether the record carries the field that identifies it.
    fn is_identified(&self, record: &Self::Record) -> bool;
}

enum State<R> {
    NoRecord,
    Accumulating(R),
}

/// Scan `text` line by line and return every identified record, in order.
pub fn scan<G: Grammar>(grammar: &G, text: &str) -> Vec<G::Record> {
    let mut records = Vec::new();
    let mut state = State::NoRecord;

    for line in text.lines() {
        state = match (state, grammar.classify(line)) {
            (State::NoRecord, LineKind::Header(header)) => {
                State::Accumulating(grammar.open(header))
            }
            (State::Accumulating(record), LineKind::Header(header)) => {
                flush(grammar, record, &mut records);
                State::Accumulating(grammar.open(header))
            }
            (State::Accumulating(mut record), LineKind::Attribute(attribute)) => {
                grammar.apply(&mut record, attribute);
                State::Accumulating(record)
            }
            (State::NoRecord, LineKind::Attribute(_)) => {
                tracing::trace!(line, "attribute outside any record");
                State::NoRecord
            }
            (state, LineKind::Noise) => state,
        };
    }

    if let State::Accumulating(record) = state {
        flush(grammar, record, &mut records);
    }

    records
}

fn flush<G: Grammar>(grammar: &G, record: G::Record, records: &mut Vec<G::Record>) {
    if grammar.is_identified(&record) {
        records.push(record);
    } else {
        tracing::debug!("dropping record without an identifying field");
    }
}
