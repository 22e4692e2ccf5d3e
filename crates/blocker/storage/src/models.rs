//! Database models.

use diesel::prelude::*;

use crate::schema::set_entries;

/// New set member for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = set_entries)]
pub struct NewSetEntry<'a> {
    pub namespace: &'a str,
    pub set_key: &'a str,
    pub value: &'a str,
}
