//! Collection operations.

use quiver_concurrency::{Deferred, Page, PageRequest};
use quiver_core::{Collection, Error, Metadata};
use quiver_wire::{
    decode_ack, decode_collection, decode_collections, decode_count, CreateCollection,
    UpdateCollection,
};

use super::{collection_endpoint, endpoint, paged, to_body, validate_collection_name, Client};
use crate::transport::Method;

impl Client {
    // =========================================================================
    // Listing
    // =========================================================================

    /// List collections.
    ///
    /// With a `limit` the result is paginated: a full page carries a
    /// continuation for the next window. Without one a single final page
    /// holds everything the server returns.
    pub fn list_collections(&self, limit: Option<usize>) -> Deferred<Page<Collection>> {
        self.list_collections_from(limit.map(PageRequest::first))
    }

    /// List collections starting at an explicit window.
    pub fn list_collections_from(&self, window: Option<PageRequest>) -> Deferred<Page<Collection>> {
        let executor = std::sync::Arc::clone(&self.executor);
        paged(window, move |w: Option<PageRequest>| {
            let query = match w {
                Some(w) => vec![
                    ("limit".to_string(), w.limit.to_string()),
                    ("offset".to_string(), w.offset.to_string()),
                ],
                None => Vec::new(),
            };
            executor.execute_as(
                Method::Get,
                &endpoint("/collections"),
                query,
                None,
                decode_collections,
            )
        })
    }

    /// Number of collections in the current tenant/database.
    pub fn count_collections(&self) -> Deferred<u64> {
        self.executor.execute_as(
            Method::Get,
            &endpoint("/count_collections"),
            Vec::new(),
            None,
            decode_count,
        )
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a collection.
    ///
    /// With `get_or_create` an existing collection of the same name is
    /// returned instead of failing (its metadata is left unchanged).
    pub fn create_collection(
        &self,
        name: &str,
        metadata: Option<Metadata>,
        get_or_create: bool,
    ) -> Deferred<Collection> {
        if let Err(e) = validate_collection_name(name) {
            return Deferred::failed(e);
        }
        let body = match to_body(&CreateCollection {
            name: name.to_string(),
            metadata,
            get_or_create,
        }) {
            Ok(body) => body,
            Err(e) => return Deferred::failed(e),
        };
        self.executor.execute_as(
            Method::Post,
            &endpoint("/collections"),
            Vec::new(),
            Some(body),
            decode_collection,
        )
    }

    /// `create_collection(name, metadata, true)`
    pub fn get_or_create_collection(
        &self,
        name: &str,
        metadata: Option<Metadata>,
    ) -> Deferred<Collection> {
        self.create_collection(name, metadata, true)
    }

    /// Look a collection up by name.
    pub fn get_collection(&self, name: &str) -> Deferred<Collection> {
        match collection_endpoint(name, "") {
            Ok(path) => self.executor.execute_as(
                Method::Get,
                &path,
                Vec::new(),
                None,
                decode_collection,
            ),
            Err(e) => Deferred::failed(e),
        }
    }

    /// Rename a collection and/or replace its metadata.
    pub fn update_collection(&self, id: &str, update: UpdateCollection) -> Deferred<()> {
        if update.new_name.is_none() && update.new_metadata.is_none() {
            return Deferred::failed(Error::invalid_input(
                "update_collection: nothing to update",
            ));
        }
        if let Some(name) = &update.new_name {
            if let Err(e) = validate_collection_name(name) {
                return Deferred::failed(e);
            }
        }
        let prepared = collection_endpoint(id, "").and_then(|path| Ok((path, to_body(&update)?)));
        match prepared {
            Ok((path, body)) => {
                self.executor
                    .execute_as(Method::Put, &path, Vec::new(), Some(body), decode_ack)
            }
            Err(e) => Deferred::failed(e),
        }
    }

    /// Delete a collection by name.
    pub fn delete_collection(&self, name: &str) -> Deferred<()> {
        match collection_endpoint(name, "") {
            Ok(path) => self
                .executor
                .execute_as(Method::Delete, &path, Vec::new(), None, decode_ack),
            Err(e) => Deferred::failed(e),
        }
    }
}
