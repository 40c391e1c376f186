//! Building filter written by the download step.
//!
//! The filter lists the buildings created by a changeset as Overpass
//! statements, for example `way(123);relation(45);`.

use std::collections::HashSet;

use catfix_core::AreaId;
use log::debug;

/// Parse the Overpass statements of a filter file.
///
/// Statements other than `way(<id>)` and `relation(<id>)` are ignored.
///
/// # Examples
/// ```
/// use catfix_core::AreaId;
/// use catfix_data::parse_building_filter;
///
/// let filter = parse_building_filter("way(12);relation(7);node(3);");
/// assert!(filter.contains(&AreaId::way(12)));
/// assert!(filter.contains(&AreaId::relation(7)));
/// assert_eq!(filter.len(), 2);
/// ```
#[must_use]
pub fn parse_building_filter(text: &str) -> HashSet<AreaId> {
    text.split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .filter_map(|statement| {
            let parsed = parse_statement(statement);
            if parsed.is_none() {
                debug!("ignoring filter statement {statement:?}");
            }
            parsed
        })
        .collect()
}

fn parse_statement(statement: &str) -> Option<AreaId> {
    let (kind, rest) = statement.split_once('(')?;
    let id = rest.strip_suffix(')')?.trim().parse().ok()?;
    match kind.trim() {
        "way" => Some(AreaId::way(id)),
        "relation" => Some(AreaId::relation(id)),
        _ => None,
    }
}
