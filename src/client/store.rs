use crate::value::Document;
use std::collections::HashMap;

/// Backing storage of one client: databases → collections → documents
#[derive(Debug, Default)]
pub(crate) struct Store {
    databases: HashMap<String, HashMap<String, Vec<Document>>>,
}

impl Store {
    pub fn documents(&self, database: &str, collection: &str) -> &[Document] {
        self.databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Documents of a collection, creating the collection on first write
    pub fn documents_mut(&mut self, database: &str, collection: &str) -> &mut Vec<Document> {
        self.databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
    }

    pub fn drop_collection(&mut self, database: &str, collection: &str) -> bool {
        self.databases
            .get_mut(database)
            .is_some_and(|collections| collections.remove(collection).is_some())
    }

    pub fn drop_database(&mut self, database: &str) -> bool {
        self.databases.remove(database).is_some()
    }

    pub fn collection_names(&self, database: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .databases
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.keys().cloned().collect();
        names.sort();
        names
    }
}
