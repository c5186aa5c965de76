pub mod cenote;
pub mod measurement;
pub mod reference;
pub mod species;
pub mod user;
pub mod variable;

pub use cenote::Cenote;
pub use measurement::MeasurementOrFact;
pub use reference::Reference;
pub use species::Species;
pub use user::{Role, User, UserRecord};
pub use variable::{AccessLevel, Variable};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::database::store::CollectionName;

/// A typed document stored under `_key` in one collection
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: CollectionName;

    fn key(&self) -> &str;

    fn set_key(&mut self, key: String);

    /// `<Collection>/<key>`
    fn document_id(&self) -> String {
        Self::COLLECTION.document_id(self.key())
    }
}

/// Overlay the top-level fields of `patch` onto `base`.
///
/// Non-object values on either side leave `base` untouched.
pub fn merge_documents(base: &mut Value, patch: &Value) {
    if let (Some(base), Some(patch)) = (base.as_object_mut(), patch.as_object()) {
        for (field, value) in patch {
            base.insert(field.clone(), value.clone());
        }
    }
}
