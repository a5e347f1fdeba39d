//! Change classification for rows events
//!
//! Inserts and deletes carry one row image per change. Updates carry
//! (before, after) pairs, so they are walked with a stride of two starting at
//! the first after image.

use crate::core::BinlogResult;
use crate::mapping::FromRow;
use crate::types::{ColumnValue, RowsAction, RowsEvent};
use tracing::warn;

/// One logical change inside a rows event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowChange<'a> {
    /// Index of `image` in the event's rows
    pub index: usize,
    /// State before an update; None for inserts and deletes
    pub before: Option<&'a [ColumnValue]>,
    /// The inserted row, the updated row, or the deleted row
    pub image: &'a [ColumnValue],
}

/// A change with its row images mapped into records
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedChange<T> {
    pub action: RowsAction,
    pub before: Option<T>,
    /// For deletes, the removed row
    pub after: T,
}

/// Starting offset and stride for an action, None when rows are not changes
fn walk(action: &RowsAction) -> Option<(usize, usize)> {
    match action {
        RowsAction::Insert | RowsAction::Delete => Some((0, 1)),
        RowsAction::Update => Some((1, 2)),
        RowsAction::Other(_) => None,
    }
}

/// Split an event into its logical changes
pub fn row_changes(event: &RowsEvent) -> Vec<RowChange<'_>> {
    let Some((start, step)) = walk(&event.action) else {
        return Vec::new();
    };

    if event.action == RowsAction::Update && event.rows.len() % 2 != 0 {
        warn!(
            "Update on {}.{} carries {} row images, ignoring the unpaired last one",
            event.table.schema,
            event.table.name,
            event.rows.len()
        );
    }

    (start..event.rows.len())
        .step_by(step)
        .map(|index| RowChange {
            index,
            before: (event.action == RowsAction::Update).then(|| event.rows[index - 1].as_slice()),
            image: event.rows[index].as_slice(),
        })
        .collect()
}

/// Map every change of an event into records of type `T`
///
/// The first row that fails to map fails the whole event.
pub fn classify<T: FromRow>(event: &RowsEvent) -> BinlogResult<Vec<ClassifiedChange<T>>> {
    row_changes(event)
        .into_iter()
        .map(|change| {
            let before = match change.before {
                Some(image) => Some(T::from_row(&event.table, image)?),
                None => None,
            };
            let after = T::from_row(&event.table, change.image)?;

            Ok(ClassifiedChange {
                action: event.action.clone(),
                before,
                after,
            })
        })
        .collect()
}
