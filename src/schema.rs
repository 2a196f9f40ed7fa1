//! Table schemas for the two resource collections.
//!
//! Every read and write path works from these definitions: the validator reads
//! the required set, the record filter reads the declared columns, and the
//! store builds its SQL from them. Column names are the camelCase names used on
//! the wire and are always quoted in SQL.

/// Primary key column shared by both tables.
pub const ID: &str = "id";
/// Creation timestamp, set once by the server.
pub const CREATED_AT: &str = "createdAt";
/// Last update timestamp, null until the first update.
pub const UPDATED_AT: &str = "updatedAt";

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Timestamp,
}

/// A declared table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Must be present and non-empty in create and update bodies.
    pub required: bool,
    /// Assigned by the server; client-supplied values are ignored.
    pub managed: bool,
}

const fn required(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
        required: true,
        managed: false,
    }
}

const fn optional(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
        required: false,
        managed: false,
    }
}

const fn managed(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        required: false,
        managed: true,
    }
}

/// A resource collection mapped to one table.
#[derive(Debug)]
pub struct TableSchema {
    /// Table name, also the path segment under `/api`.
    pub table: &'static str,
    /// Human-readable singular name used in messages ("Lead").
    pub label: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    /// Required field names in declared order.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().filter(|c| c.required).map(|c| c.name)
    }

    /// Columns a client may write through create and update.
    pub fn writable_columns(&self) -> impl Iterator<Item = &'static Column> + '_ {
        self.columns.iter().filter(|c| !c.managed)
    }

    pub fn not_found_message(&self) -> String {
        format!("{} not found", self.label)
    }

    pub fn deleted_message(&self) -> String {
        format!("{} deleted successfully", self.label)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this schema.
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let sql_type = match c.kind {
                    ColumnKind::Text => "TEXT",
                    ColumnKind::Timestamp => "TIMESTAMPTZ",
                };
                if c.name == ID {
                    format!("{} {} PRIMARY KEY", quote_ident(c.name), sql_type)
                } else if c.required {
                    format!("{} {} NOT NULL", quote_ident(c.name), sql_type)
                } else {
                    format!("{} {}", quote_ident(c.name), sql_type)
                }
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(self.table),
            columns.join(", ")
        )
    }
}

/// Double-quotes an identifier so camelCase names keep their case in PostgreSQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub static LEADS: TableSchema = TableSchema {
    table: "leads",
    label: "Lead",
    columns: &[
        managed(ID, ColumnKind::Text),
        required("leadName"),
        required("leadSource"),
        required("contactPhone"),
        required("contactEmail"),
        required("companyName"),
        required("leadStatus"),
        required("assignedSalesRep"),
        optional("lastContactDate"),
        optional("nextFollowUpDate"),
        managed(CREATED_AT, ColumnKind::Timestamp),
        managed(UPDATED_AT, ColumnKind::Timestamp),
    ],
};

pub static MEETINGS: TableSchema = TableSchema {
    table: "meetings",
    label: "Meeting",
    columns: &[
        managed(ID, ColumnKind::Text),
        required("meetingTitle"),
        required("meetingDate"),
        required("meetingTime"),
        required("participants"),
        required("location"),
        optional("travelMode"),
        optional("expenses"),
        optional("meetingAgenda"),
        optional("latitude"),
        optional("longitude"),
        managed(CREATED_AT, ColumnKind::Timestamp),
        managed(UPDATED_AT, ColumnKind::Timestamp),
    ],
};

/// Every table the service owns, in creation order.
pub static ALL_TABLES: [&TableSchema; 2] = [&LEADS, &MEETINGS];
