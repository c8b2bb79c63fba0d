//! Record shapes and the write input they are built from.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Field, ValidationError};

/// Qualification data for one vendor, stored in the `vendor` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QualificationRecord {
    pub name: String,
    pub project: String,
    pub status: String,
    pub expiry: String,
}

/// Qualification data plus price, stored in the `vendorPrice` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedRecord {
    #[serde(flatten)]
    pub qualification: QualificationRecord,
    #[serde(rename = "Price", serialize_with = "serialize_price")]
    pub price: f64,
}

/// Whole prices are written as JSON integers (`6666`, not `6666.0`).
fn serialize_price<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if price.fract() == 0.0 && price.abs() < EXACT_INT_LIMIT {
        serializer.serialize_i64(*price as i64)
    } else {
        serializer.serialize_f64(*price)
    }
}

/// The `vendor` entry of the transient map. Absent JSON fields decode to
/// their empty value and are then caught by [`VendorInput::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VendorInput {
    pub name: String,
    pub project: String,
    pub status: String,
    pub expiry: String,
    pub price: f64,
}

impl VendorInput {
    /// Checks fields in the order Name, Project, Status, Expiry, Price and
    /// reports the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let text_fields = [
            (Field::Name, &self.name),
            (Field::Project, &self.project),
            (Field::Status, &self.status),
            (Field::Expiry, &self.expiry),
        ];
        for (field, value) in text_fields {
            if value.is_empty() {
                return Err(ValidationError::EmptyField(field));
            }
        }
        // NaN fails this too.
        if !(self.price > 0.0) {
            return Err(ValidationError::NonPositivePrice);
        }

        // Name and Status become composite-key components.
        for (field, value) in [(Field::Name, &self.name), (Field::Status, &self.status)] {
            if keycodec::validate_component(value).is_err() {
                return Err(ValidationError::ReservedCharacter(field));
            }
        }
        Ok(())
    }

    /// Splits the input into the two stored shapes.
    pub fn into_records(self) -> (QualificationRecord, PricedRecord) {
        let qualification = QualificationRecord {
            name: self.name,
            project: self.project,
            status: self.status,
            expiry: self.expiry,
        };
        let priced = PricedRecord {
            qualification: qualification.clone(),
            price: self.price,
        };
        (qualification, priced)
    }
}
