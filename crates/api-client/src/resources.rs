//! Storefront resource endpoints.
//!
//! Thin wrappers: every call goes through the dispatcher and returns the
//! decoded JSON body untouched.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::client::StorefrontClient;
use crate::error::{Error, Result};
use crate::request::ApiRequest;

/// Resource collections exposed under `/api/<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Products,
    Donations,
    Testimonials,
    Faqs,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Products,
        Resource::Donations,
        Resource::Testimonials,
        Resource::Faqs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Products => "products",
            Resource::Donations => "donations",
            Resource::Testimonials => "testimonials",
            Resource::Faqs => "faqs",
        }
    }

    pub fn collection_path(&self) -> String {
        format!("/api/{}", self.name())
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("/api/{}/{}", self.name(), id)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownResource(s.to_string()))
    }
}

/// CRUD client for one resource collection.
pub struct ResourceApi {
    client: StorefrontClient,
    resource: Resource,
}

impl ResourceApi {
    pub(crate) fn new(client: StorefrontClient, resource: Resource) -> Self {
        Self { client, resource }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// List the collection.
    pub async fn list(&self) -> Result<Value> {
        self.client
            .send(ApiRequest::get(self.resource.collection_path()))
            .await?
            .json()
    }

    /// Get one item by ID.
    pub async fn get(&self, id: &str) -> Result<Value> {
        self.client
            .send(ApiRequest::get(self.resource.item_path(id)))
            .await?
            .json()
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<Value> {
        let request = ApiRequest::post(self.resource.collection_path()).json(body)?;
        self.client.send(request).await?.json()
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: &str, body: &B) -> Result<Value> {
        let request = ApiRequest::put(self.resource.item_path(id)).json(body)?;
        self.client.send(request).await?.json()
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .send(ApiRequest::delete(self.resource.item_path(id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(Resource::Products.collection_path(), "/api/products");
        assert_eq!(Resource::Faqs.item_path("42"), "/api/faqs/42");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Donations".parse::<Resource>().unwrap(), Resource::Donations);
        assert_eq!(" testimonials ".parse::<Resource>().unwrap(), Resource::Testimonials);
        assert!(matches!(
            "orders".parse::<Resource>(),
            Err(Error::UnknownResource(name)) if name == "orders"
        ));
    }
}
