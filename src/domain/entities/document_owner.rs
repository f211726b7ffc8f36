use crate::domain::errors::ValidationError;

/// The single row a document is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOwner {
    Property(String),
    Subdivision(String),
    Payment(String),
}

impl DocumentOwner {
    /// Pick the owner from optional ids, property first, as the upload form sends them.
    pub fn from_ids(
        property_id: Option<String>,
        subdivision_id: Option<String>,
        payment_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        match (property_id, subdivision_id, payment_id) {
            (Some(id), _, _) => Ok(DocumentOwner::Property(id)),
            (None, Some(id), _) => Ok(DocumentOwner::Subdivision(id)),
            (None, None, Some(id)) => Ok(DocumentOwner::Payment(id)),
            (None, None, None) => Err(ValidationError::MissingField(
                "property_id, subdivision_id or payment_id",
            )),
        }
    }

    /// Column holding the owner id in the `documents` table.
    pub fn column(&self) -> &'static str {
        match self {
            DocumentOwner::Property(_) => "property_id",
            DocumentOwner::Subdivision(_) => "subdivision_id",
            DocumentOwner::Payment(_) => "payment_id",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DocumentOwner::Property(id)
            | DocumentOwner::Subdivision(id)
            | DocumentOwner::Payment(id) => id,
        }
    }
}
