//! Column descriptors for rendering resources as table rows.

use crudstack_core::{Sort, SortDirection, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Produces the display text of one cell.
pub type Formatter<T> = fn(&T) -> String;

pub struct ColumnDescriptor<T> {
    pub key: &'static str,
    pub label: String,
    pub sortable: bool,
    pub alignment: Alignment,
    pub formatter: Formatter<T>,
}

impl<T> ColumnDescriptor<T> {
    /// Left-aligned, unsortable column labelled after its key.
    pub fn new(key: &'static str, formatter: Formatter<T>) -> Self {
        Self {
            key,
            label: default_label(key),
            sortable: false,
            alignment: Alignment::Left,
            formatter,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn render(&self, row: &T) -> String {
        (self.formatter)(row)
    }
}

impl<T> std::fmt::Debug for ColumnDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("sortable", &self.sortable)
            .field("alignment", &self.alignment)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub key: &'static str,
    pub label: String,
    pub sortable: bool,
    pub alignment: Alignment,
    /// Direction shown on the column the table is sorted by.
    pub sorted: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub key: &'static str,
    pub text: String,
    pub alignment: Alignment,
}

/// `email_verified_at` -> `Email Verified At`.
pub fn default_label(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_header<T>(columns: &[ColumnDescriptor<T>], sort: Option<&Sort>) -> Vec<HeaderCell> {
    columns
        .iter()
        .map(|column| HeaderCell {
            key: column.key,
            label: column.label.clone(),
            sortable: column.sortable,
            alignment: column.alignment,
            sorted: sort.filter(|s| s.column == column.key).map(|s| s.direction),
        })
        .collect()
}

pub fn render_row<T>(columns: &[ColumnDescriptor<T>], row: &T) -> Vec<Cell> {
    columns
        .iter()
        .map(|column| Cell {
            key: column.key,
            text: column.render(row),
            alignment: column.alignment,
        })
        .collect()
}

/// Sort after clicking `column`: ascending, unless it is already ascending.
pub fn next_sort(current: Option<&Sort>, column: &str) -> Sort {
    match current {
        Some(sort) if sort.column == column && sort.direction == SortDirection::Asc => Sort::desc(column),
        _ => Sort::asc(column),
    }
}

/// Columns of the users index.
pub fn user_columns() -> Vec<ColumnDescriptor<User>> {
    vec![
        ColumnDescriptor::new("id", |u: &User| u.id.to_string()).label("#").sortable(),
        ColumnDescriptor::new("name", |u: &User| u.name.clone()).sortable(),
        ColumnDescriptor::new("email", |u: &User| u.email.clone())
            .label("E-mail")
            .sortable(),
        ColumnDescriptor::new("email_verified_at", |u: &User| {
            u.email_verified_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string())
        })
        .label("Verified at")
        .align(Alignment::Right),
        ColumnDescriptor::new("created_at", |u: &User| u.created_at.format("%Y-%m-%d").to_string())
            .sortable()
            .align(Alignment::Right),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use crudstack_core::UserId;
    use proptest::prelude::*;

    use super::*;

    fn user(verified: bool) -> User {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        User {
            id: UserId::new(7),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            email_verified_at: verified.then_some(at),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn labels_derive_from_keys() {
        assert_eq!(default_label("email_verified_at"), "Email Verified At");
        assert_eq!(default_label("name"), "Name");
        assert_eq!(default_label("created-at"), "Created At");
        assert_eq!(default_label(""), "");
    }

    #[test]
    fn user_row_formats_verification_date() {
        let columns = user_columns();
        let cells = render_row(&columns, &user(true));
        let texts: Vec<_> = cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["7", "Ada", "ada@example.com", "2024-03-09", "2024-03-09"]);
        assert_eq!(cells[3].alignment, Alignment::Right);

        let cells = render_row(&columns, &user(false));
        assert_eq!(cells[3].text, "-");
    }

    #[test]
    fn header_marks_sorted_column() {
        let columns = user_columns();
        let sort = Sort::desc("name");
        let header = render_header(&columns, Some(&sort));
        assert_eq!(header[0].label, "#");
        assert_eq!(header[1].sorted, Some(SortDirection::Desc));
        assert!(header.iter().filter(|h| h.key != "name").all(|h| h.sorted.is_none()));
        assert!(!header[3].sortable);
    }

    #[test]
    fn next_sort_flips_only_ascending_column() {
        assert_eq!(next_sort(None, "name"), Sort::asc("name"));
        assert_eq!(next_sort(Some(&Sort::asc("name")), "name"), Sort::desc("name"));
        assert_eq!(next_sort(Some(&Sort::desc("name")), "name"), Sort::asc("name"));
        assert_eq!(next_sort(Some(&Sort::asc("email")), "name"), Sort::asc("name"));
    }

    proptest! {
        #[test]
        fn clicking_a_header_alternates_after_first_click(column in "[a-z_]{1,12}", other in "[A-Z]{1,4}") {
            let first = next_sort(Some(&Sort::desc(other)), &column);
            prop_assert_eq!(&first, &Sort::asc(column.as_str()));
            let second = next_sort(Some(&first), &column);
            prop_assert_eq!(&second, &Sort::desc(column.as_str()));
            prop_assert_eq!(next_sort(Some(&second), &column), first);
        }
    }
}
