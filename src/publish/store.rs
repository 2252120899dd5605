use crate::fetch::{FetchError, FetchResult, FetchedResource, ResourceFetcher};
use crate::publish::{Generation, PublishedResource};
use crate::util::uri;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identifies a group of resources within a [`ResourceStore`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Bucket {
    /// The unkeyed bucket, used when a writer names no bucket at all.
    Default,
    /// A bucket owned by a named writer, such as the book cache.
    Named(String),
}

impl From<&str> for Bucket {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

type Resources = HashMap<String, PublishedResource>;

#[derive(Default)]
struct StoreState {
    /// Buckets in creation order; lookups scan them in this order.
    buckets: Vec<(Bucket, Resources)>,
    generation: Option<Generation>,
    /// The wrapper directory stripped from the current generation's paths.
    wrapper: Option<String>,
    /// The highest generation handed out or published so far.
    issued: u64,
}

impl StoreState {
    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Resources {
        let position = match self.buckets.iter().position(|(name, _)| *name == bucket) {
            Some(position) => position,
            None => {
                self.buckets.push((bucket, Resources::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[position].1
    }

    fn find(&self, url: &str) -> Option<&PublishedResource> {
        self.buckets
            .iter()
            .find_map(|(_, resources)| resources.get(url))
    }

    fn remove_bucket(&mut self, bucket: &Bucket) -> usize {
        match self.buckets.iter().position(|(name, _)| name == bucket) {
            Some(position) => self.buckets.remove(position).1.len(),
            None => 0,
        }
    }
}

/// Process-wide store backing every published resource.
///
/// Resources are keyed by their public URL. Lookups scan every bucket and, when
/// nothing is stored under the full URL, retry without its query or fragment,
/// matching how an HTTP cache answers a page's requests.
///
/// The store is the default [`ResourceFetcher`]: once a resource is put,
/// it is immediately retrievable.
#[derive(Default)]
pub struct ResourceStore {
    state: RwLock<StoreState>,
}

impl ResourceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Writers always leave the state consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `resource` in `bucket`, replacing any resource with the same URL there.
    pub fn put(&self, bucket: Bucket, resource: PublishedResource) {
        self.write()
            .bucket_mut(bucket)
            .insert(resource.public_url.clone(), resource);
    }

    /// Retrieves the resource served at `url`.
    pub fn get(&self, url: &str) -> Option<PublishedResource> {
        let state = self.read();
        // File names may contain `?` or `#` themselves.
        state
            .find(url)
            .or_else(|| state.find(uri::split_suffix(url).0))
            .cloned()
    }

    /// Returns `true` if a resource is served at `url`.
    pub fn contains(&self, url: &str) -> bool {
        let state = self.read();
        state.find(url).is_some() || state.find(uri::split_suffix(url).0).is_some()
    }

    /// Removes `bucket` and everything in it, returning how many resources were evicted.
    pub fn delete_bucket(&self, bucket: &Bucket) -> usize {
        self.write().remove_bucket(bucket)
    }

    /// The generation most recently published into this store.
    pub fn generation(&self) -> Option<Generation> {
        self.read().generation
    }

    /// The wrapper directory the current generation was published without.
    ///
    /// `None` for flat archives and when nothing has been published.
    pub fn wrapper(&self) -> Option<String> {
        self.read().wrapper.clone()
    }

    /// Hands out a generation no writer of this store has used yet.
    ///
    /// Every session sharing the store draws from the same sequence.
    pub fn next_generation(&self) -> Generation {
        let mut state = self.write();
        state.issued = state.issued.wrapping_add(1);
        Generation::new(state.issued)
    }

    /// Every URL currently served, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls = self
            .read()
            .buckets
            .iter()
            .flat_map(|(_, resources)| resources.keys().cloned())
            .collect::<Vec<_>>();
        urls.sort_unstable();
        urls.dedup();
        urls
    }

    /// The number of stored resources across all buckets.
    pub fn len(&self) -> usize {
        self.read()
            .buckets
            .iter()
            .map(|(_, resources)| resources.len())
            .sum()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swaps in a complete generation under one write lock.
    ///
    /// `bucket` and the [`Bucket::Default`] bucket are emptied before the
    /// new resources are written, so no reader ever observes a mix of generations.
    /// Returns the number of evicted resources.
    pub(crate) fn replace_generation(
        &self,
        bucket: Bucket,
        generation: Generation,
        wrapper: Option<String>,
        resources: Vec<PublishedResource>,
    ) -> usize {
        let mut state = self.write();
        let evicted = state.remove_bucket(&bucket) + state.remove_bucket(&Bucket::Default);

        let fresh = state.bucket_mut(bucket);
        for resource in resources {
            fresh.insert(resource.public_url.clone(), resource);
        }
        state.generation = Some(generation);
        state.wrapper = wrapper;
        state.issued = state.issued.max(generation.get());
        evicted
    }
}

impl Debug for ResourceStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("ResourceStore")
            .field("generation", &state.generation)
            .field("wrapper", &state.wrapper)
            .field(
                "buckets",
                &state
                    .buckets
                    .iter()
                    .map(|(bucket, resources)| (bucket, resources.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for ResourceStore {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource> {
        self.get(url)
            .map(FetchedResource::from)
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_owned(),
            })
    }
}

impl From<PublishedResource> for FetchedResource {
    fn from(resource: PublishedResource) -> Self {
        Self {
            content_length: resource.content_length(),
            content_type: resource.content_type.to_owned(),
            url: resource.public_url,
            body: resource.payload,
            generation: Some(resource.generation),
        }
    }
}
