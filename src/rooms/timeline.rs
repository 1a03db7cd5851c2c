use std::iter::Peekable;

use super::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub message: Message,
    /// Sender name matched the local display name when the entry was added.
    pub own: bool,
}

/// Messages of the current room, oldest first. Entries are only ever added.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends in delivery order, no matter the timestamp.
    pub fn append(&mut self, entry: TimelineEntry) -> &TimelineEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Weaves a history batch in front of / between the live entries already
    /// present, by timestamp. The batch is taken in the order it was served
    /// and live entries in delivery order; neither side is reordered, and on
    /// equal timestamps history goes first. Returns the number of entries
    /// added.
    pub fn merge_history(&mut self, history: Vec<TimelineEntry>) -> usize {
        let added = history.len();

        let live = std::mem::take(&mut self.entries);
        self.entries = Merge {
            history: history.into_iter().peekable(),
            live: live.into_iter().peekable(),
        }
        .collect();

        added
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEntry;
    type IntoIter = std::slice::Iter<'a, TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

struct Merge<H: Iterator<Item = TimelineEntry>, L: Iterator<Item = TimelineEntry>> {
    history: Peekable<H>,
    live: Peekable<L>,
}

impl<H, L> Iterator for Merge<H, L>
where
    H: Iterator<Item = TimelineEntry>,
    L: Iterator<Item = TimelineEntry>,
{
    type Item = TimelineEntry;

    fn next(&mut self) -> Option<TimelineEntry> {
        match (self.history.peek(), self.live.peek()) {
            (Some(past), Some(live)) if past.message.timestamp <= live.message.timestamp => self.history.next(),
            (Some(_), Some(_)) => self.live.next(),
            (Some(_), None) => self.history.next(),
            (None, _) => self.live.next(),
        }
    }
}
