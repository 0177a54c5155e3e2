use serde::Deserialize;

use crate::cells::{Cell, ColumnKind};
use crate::errors::SnowflakeError;

/// One page of rows exactly as the server returned them: nullable strings,
/// each row led by an opaque sequence identifier.
pub type StringTable = Vec<Vec<Option<String>>>;

/// One entry of the `rowType` metadata: how to decode a single position in
/// every row of the result set.
///
/// `name` and `type` must be present on the wire; a descriptor without them
/// is rejected when the envelope is deserialized, before any row is decoded.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub scale: Option<i64>,
}

impl ColumnDescriptor {
    pub fn kind(&self) -> Result<ColumnKind, SnowflakeError> {
        ColumnKind::from_name(&self.data_type)
    }
}

/// A decoded row: column name to typed value, in descriptor order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedRow {
    entries: Vec<(String, Cell)>,
}

impl DecodedRow {
    /// Look up a cell by column name.
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, cell)| cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.entries.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&DecodedRow> for serde_json::Value {
    fn from(row: &DecodedRow) -> Self {
        let mut object = serde_json::Map::with_capacity(row.entries.len());
        for (name, cell) in &row.entries {
            object.insert(name.clone(), cell.clone().into());
        }
        serde_json::Value::Object(object)
    }
}

/// Decode one wire row against its column descriptors.
///
/// Element 0 of the row is the sequence identifier and never appears in the
/// output; element `i + 1` is decoded with descriptor `i`. A descriptor with
/// an unrecognized type fails the whole row, there are no partial rows.
pub fn decode_row(
    row: &[Option<String>],
    fields: &[ColumnDescriptor],
) -> Result<DecodedRow, SnowflakeError> {
    let mut entries = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        let kind = field
            .kind()
            .map_err(|error| SnowflakeError::Decode(Box::new(error)))?;
        let value = row.get(index + 1).and_then(|cell| cell.as_deref());
        entries.push((field.name.clone(), kind.decode(value, field.scale)));
    }
    Ok(DecodedRow { entries })
}
