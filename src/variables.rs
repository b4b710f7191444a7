//! Row model and variable binding.
//!
//! A [`Table`] is what the external tabular reader hands us: a column list
//! plus rows mapping column name to an optional string. [`bind`] turns one
//! row into a [`VariableMap`], the ordered token → value list consumed by the
//! substitution engine.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Error;

/// One of the eight recognised columns, in substitution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ContractNumber,
    IdNumber,
    Email,
    Name,
    StartDate,
    EndDate,
    TermDays,
    TotalValue,
}

impl Field {
    /// All fields in the fixed order that drives replacement and highlighting.
    pub const ALL: [Field; 8] = [
        Field::ContractNumber,
        Field::IdNumber,
        Field::Email,
        Field::Name,
        Field::StartDate,
        Field::EndDate,
        Field::TermDays,
        Field::TotalValue,
    ];

    /// Column name in the row source.
    pub fn column(self) -> &'static str {
        match self {
            Field::ContractNumber => "CONTRATO NÚMERO",
            Field::IdNumber => "CÉDULA",
            Field::Email => "CORREO ELECTRÓNICO",
            Field::Name => "NOMBRE",
            Field::StartDate => "FECHA DE INICIO",
            Field::EndDate => "FECHA FINALIZACIÓN",
            Field::TermDays => "PLAZO EN DÍAS",
            Field::TotalValue => "VALOR TOTAL DEL CONTRATO SIN IVA",
        }
    }

    /// Literal placeholder token as it appears in the template.
    pub fn token(self) -> &'static str {
        match self {
            Field::ContractNumber => "[(CONTRATO NÚMERO)]",
            Field::IdNumber => "[(CÉDULA)]",
            Field::Email => "[(CORREO ELECTRÓNICO)]",
            Field::Name => "[(NOMBRE)]",
            Field::StartDate => "[(FECHA DE INICIO)]",
            Field::EndDate => "[(FECHA FINALIZACIÓN)]",
            Field::TermDays => "[(PLAZO EN DÍAS)]",
            Field::TotalValue => "[(VALOR TOTAL DEL CONTRATO SIN IVA)]",
        }
    }
}

/// A single data row. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: IndexMap<String, Option<String>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mainly for tests and row-source adapters.
    pub fn with(mut self, column: &str, value: Option<&str>) -> Self {
        self.values
            .insert(column.to_string(), value.map(str::to_string));
        self
    }

    /// Value of `column`; `None` when the column is absent or null.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Option<String>)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Rows plus the column set exposed by the row source.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Build a table whose column set is the union of the rows' columns,
    /// in first-seen order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for col in row.columns() {
                if !columns.iter().any(|c| c == col) {
                    columns.push(col.to_string());
                }
            }
        }
        Self { columns, rows }
    }

    /// Parse a JSON array of objects. `null` becomes an absent value; numbers
    /// and booleans keep their textual representation.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let parsed: Vec<IndexMap<String, Value>> =
            serde_json::from_str(json).map_err(|e| Error::Rows(e.to_string()))?;

        let rows = parsed
            .into_iter()
            .map(|obj| {
                obj.into_iter()
                    .map(|(k, v)| {
                        let value = match v {
                            Value::Null => None,
                            Value::String(s) => Some(s),
                            other => Some(other.to_string()),
                        };
                        (k, value)
                    })
                    .collect::<Row>()
            })
            .collect();

        Ok(Self::from_rows(rows))
    }

    /// Required columns the source does not expose, in field order.
    ///
    /// A source with neither rows nor columns (an empty JSON array) has
    /// nothing to check and reports no missing columns.
    pub fn missing_columns(&self) -> Vec<String> {
        if self.rows.is_empty() && self.columns.is_empty() {
            return Vec::new();
        }
        Field::ALL
            .iter()
            .map(|f| f.column())
            .filter(|col| !self.columns.iter().any(|c| c == col))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Ordered token → value pairs for one row. Always holds all eight fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMap {
    entries: Vec<(Field, String)>,
}

impl VariableMap {
    /// `(token, value)` pairs in substitution order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(f, v)| (f.token(), v.as_str()))
    }

    pub fn value(&self, field: Field) -> &str {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bind a row to its variable map. Absent values become the empty string.
pub fn bind(row: &Row) -> VariableMap {
    let entries = Field::ALL
        .iter()
        .map(|&field| (field, row.get(field.column()).unwrap_or_default().to_string()))
        .collect();
    VariableMap { entries }
}
