//! The validated metadata model handed to the template renderer.

use serde_derive::{Deserialize, Serialize};

/// One extracted struct member. Immutable after construction.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct DropField {
    pub name: String,
    /// Canonical type name after typedef resolution.
    #[serde(rename = "type")]
    pub field_type: String,
    pub is_array: bool,
    /// Array length expression exactly as spelled in the source (numeric
    /// literal or macro token). Never evaluated. `None` for scalars.
    pub array_count: Option<String>,
}

impl DropField {
    pub fn scalar(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        DropField {
            name: name.into(),
            field_type: field_type.into(),
            is_array: false,
            array_count: None,
        }
    }

    pub fn array(
        name: impl Into<String>,
        field_type: impl Into<String>,
        count: impl Into<String>,
    ) -> Self {
        DropField {
            name: name.into(),
            field_type: field_type.into(),
            is_array: true,
            array_count: Some(count.into()),
        }
    }
}

/// A tagged struct's extracted layout: the owner name and its fields in
/// declaration order.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct DropStruct {
    name: String,
    fields: Vec<DropField>,
}

impl DropStruct {
    pub fn new(name: impl Into<String>) -> Self {
        DropStruct {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[DropField] {
        &self.fields
    }

    /// Appends `field` unless a field with the same name is already
    /// present. Returns whether the field was added; on rejection the
    /// struct is unchanged.
    pub fn add_field(&mut self, field: DropField) -> bool {
        if self.fields.iter().any(|existing| existing.name == field.name) {
            return false;
        }
        self.fields.push(field);
        true
    }
}

#[test]
fn add_field_should_reject_duplicate_names() {
    let mut drop_struct = DropStruct::new("state");
    assert!(drop_struct.add_field(DropField::scalar("x", "int")));
    assert!(drop_struct.add_field(DropField::scalar("y", "int")));
    assert!(!drop_struct.add_field(DropField::scalar("x", "float")));

    assert_eq!(drop_struct.fields().len(), 2);
    assert_eq!(drop_struct.fields()[0].field_type, "int");
}

#[test]
fn field_type_should_serialize_as_type() {
    let field = DropField::array("name", "char", "32");
    let json = serde_json::to_value(&field).unwrap();
    assert_eq!(json["type"], "char");
    assert_eq!(json["is_array"], true);
    assert_eq!(json["array_count"], "32");
}
