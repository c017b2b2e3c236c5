//! Read-only projections of the collection for the list and board screens.

use crate::models::{Record, Status};

/// Records whose role or company contains `search_term` (case-insensitive),
/// newest `dateApplied` first. Equal dates keep collection order.
pub fn visible_list<'a>(records: &'a [Record], search_term: &str) -> Vec<&'a Record> {
    let needle = search_term.to_lowercase();
    let mut list: Vec<&Record> = records
        .iter()
        .filter(|record| matches_search(record, &needle))
        .collect();
    // sort_by is stable
    list.sort_by(|a, b| b.fields.date_applied.cmp(&a.fields.date_applied));
    list
}

fn matches_search(record: &Record, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [record.fields.role.as_deref(), record.fields.company.as_deref()]
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(needle))
}

#[derive(Debug)]
pub struct Column<'a> {
    pub status: Status,
    pub records: Vec<&'a Record>,
}

/// Records grouped by status, one column per status in `Status::ALL` order.
#[derive(Debug)]
pub struct Board<'a> {
    pub columns: Vec<Column<'a>>,
}

impl<'a> Board<'a> {
    pub fn column(&self, status: Status) -> &[&'a Record] {
        self.columns
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.records.as_slice())
            .unwrap_or(&[])
    }
}

/// The search term does not apply to the board.
pub fn board(records: &[Record]) -> Board<'_> {
    let columns = Status::ALL
        .into_iter()
        .map(|status| Column {
            status,
            records: records
                .iter()
                .filter(|r| r.fields.status == status)
                .collect(),
        })
        .collect();
    Board { columns }
}
