// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use k8s_openapi::NamespaceResourceScope;
use kube::api::{ListParams, PostParams};
use kube::{Resource, ResourceExt, api::Api};
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::Snafu;
use std::fmt::Debug;
use std::future::Future;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{} '{}' not found in namespace '{}'", kind, name, namespace))]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[snafu(display("{} '{}' already exists in namespace '{}'", kind, name, namespace))]
    AlreadyExists {
        kind: String,
        name: String,
        namespace: String,
    },

    #[snafu(display("forbidden to {} {} in namespace '{}': {}", verb, kind, namespace, message))]
    Forbidden {
        verb: String,
        kind: String,
        namespace: String,
        message: String,
    },

    #[snafu(display("Kubernetes API error: {}", source))]
    Kube { source: kube::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Forbidden { .. })
    }

    /// Classifies a raw API error by its HTTP status.
    ///
    /// Anything that is not a recognised API answer stays a `Kube` error and is left to the
    /// caller's retry policy.
    pub fn from_kube(source: kube::Error, verb: &str, kind: &str, name: &str, namespace: &str) -> Self {
        let (code, message) = match &source {
            kube::Error::Api(response) => (Some(response.code), response.message.clone()),
            _ => (None, String::new()),
        };

        match code {
            Some(404) => Error::NotFound {
                kind: kind.to_owned(),
                name: name.to_owned(),
                namespace: namespace.to_owned(),
            },
            Some(409) => Error::AlreadyExists {
                kind: kind.to_owned(),
                name: name.to_owned(),
                namespace: namespace.to_owned(),
            },
            Some(401) | Some(403) => Error::Forbidden {
                verb: verb.to_owned(),
                kind: kind.to_owned(),
                namespace: namespace.to_owned(),
                message,
            },
            _ => Error::Kube { source },
        }
    }
}

/// Any namespaced object kind the provisioner reads or creates.
pub trait NamespacedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Serialize
    + DeserializeOwned
    + Debug
    + Send
    + Sync
    + 'static
{
}

impl<T> NamespacedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static
{
}

/// The cluster operations provisioning relies on, per object kind and namespace.
pub trait NamespaceClient: Send + Sync {
    /// Fails with [`Error::NotFound`] when no object has that name.
    fn get<K: NamespacedObject>(
        &self,
        name: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<K, Error>> + Send;

    /// Fails with [`Error::AlreadyExists`] when the name is taken.
    fn create<K: NamespacedObject>(
        &self,
        resource: &K,
        namespace: &str,
    ) -> impl Future<Output = Result<K, Error>> + Send;

    fn list<K: NamespacedObject>(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<K>, Error>> + Send;
}

impl<T: NamespaceClient> NamespaceClient for &T {
    fn get<K: NamespacedObject>(
        &self,
        name: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<K, Error>> + Send {
        (**self).get(name, namespace)
    }

    fn create<K: NamespacedObject>(
        &self,
        resource: &K,
        namespace: &str,
    ) -> impl Future<Output = Result<K, Error>> + Send {
        (**self).create(resource, namespace)
    }

    fn list<K: NamespacedObject>(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<K>, Error>> + Send {
        (**self).list(namespace)
    }
}

#[derive(Clone)]
pub struct Context {
    pub(crate) client: kube::Client,
}

impl Context {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

impl NamespaceClient for Context {
    async fn get<K: NamespacedObject>(&self, name: &str, namespace: &str) -> Result<K, Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| Error::from_kube(e, "get", &K::kind(&()), name, namespace))
    }

    async fn create<K: NamespacedObject>(&self, resource: &K, namespace: &str) -> Result<K, Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), resource)
            .await
            .map_err(|e| {
                Error::from_kube(e, "create", &K::kind(&()), &resource.name_any(), namespace)
            })
    }

    async fn list<K: NamespacedObject>(&self, namespace: &str) -> Result<Vec<K>, Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| Error::from_kube(e, "list", &K::kind(&()), "", namespace))
    }
}
