use crate::schema::model::Reference;
use crate::schema::row::RowRecord;
use crate::schema::row::CHILD_TABLE;
use crate::schema::row::CONSTRAINTS;
use crate::schema::row::DEPENDENT_ON;
use crate::schema::row::EXPORTABLE;
use crate::schema::row::FOREIGN_KEY;
use crate::schema::row::FOREIGN_TABLE;
use crate::schema::row::IS_DEPENDENT;
use crate::schema::row::IS_INDEX;
use crate::schema::row::IS_NULL;
use crate::schema::row::IS_PARENT;
use crate::schema::row::IS_UNIQUE;
use crate::schema::row::SORTABLE;
use std::collections::BTreeSet;

/// Keywords recognized in the free-text `constraints` cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintFlag {
    PrimaryKey,
    ForeignKey,
}

impl ConstraintFlag {
    pub const ALL: [ConstraintFlag; 2] = [ConstraintFlag::PrimaryKey, ConstraintFlag::ForeignKey];

    /// Substring marking this flag
    pub fn marker(self) -> &'static str {
        match self {
            ConstraintFlag::PrimaryKey => "pk",
            ConstraintFlag::ForeignKey => "fk",
        }
    }
}

/// Flags whose marker occurs anywhere in the lower-cased text,
/// so `"PK, FK"` and `"pk_fk"` both carry both flags.
pub fn tokenize_constraints(constraints: &str) -> BTreeSet<ConstraintFlag> {
    let lowered = constraints.to_lowercase();
    ConstraintFlag::ALL
        .into_iter()
        .filter(|flag| lowered.contains(flag.marker()))
        .collect()
}

/// `y` (any case) is the only true value of a flag cell.
pub fn is_yes(value: Option<&str>) -> bool {
    value.map(|value| value.trim().eq_ignore_ascii_case("y")).unwrap_or(false)
}

/// `is_null = n` means NOT NULL, every other value is optional.
pub fn is_required(is_null: Option<&str>) -> bool {
    is_null.map(|value| value.trim().eq_ignore_ascii_case("n")).unwrap_or(false)
}

/// Flags and relationship pointers of one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Constraints {
    pub required: bool,
    pub unique: bool,
    pub indexed: bool,
    pub sortable: bool,
    pub exportable: bool,
    pub is_primary: bool,
    pub is_foreign: bool,
    pub is_dependent: bool,
    pub is_parent: bool,
    pub foreign_table: Option<String>,
    pub foreign_key: Option<String>,
    pub dependent_on: Option<String>,
    pub child_table: Option<String>,
}

impl Constraints {
    pub(crate) fn resolve(record: &RowRecord) -> Self {
        let flag = |key: &str| is_yes(record.text(key).as_deref());
        let flags = record
            .text(CONSTRAINTS)
            .map(|constraints| tokenize_constraints(&constraints))
            .unwrap_or_default();
        Constraints {
            required: is_required(record.text(IS_NULL).as_deref()),
            unique: flag(IS_UNIQUE),
            indexed: flag(IS_INDEX),
            sortable: flag(SORTABLE),
            exportable: flag(EXPORTABLE),
            is_primary: flags.contains(&ConstraintFlag::PrimaryKey),
            is_foreign: flags.contains(&ConstraintFlag::ForeignKey),
            is_dependent: flag(IS_DEPENDENT),
            is_parent: flag(IS_PARENT),
            foreign_table: record.text(FOREIGN_TABLE),
            foreign_key: record.text(FOREIGN_KEY),
            dependent_on: record.text(DEPENDENT_ON),
            child_table: record.text(CHILD_TABLE),
        }
    }

    /// Present for `fk` fields and for fields naming a foreign table.
    pub fn reference(&self) -> Option<Reference> {
        if self.is_foreign || self.foreign_table.is_some() {
            Some(Reference {
                table: self.foreign_table.to_owned(),
                key: self.foreign_key.to_owned(),
            })
        } else {
            None
        }
    }
}
