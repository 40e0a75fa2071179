use metatree_types::{Address, Scalar, Shape};

use crate::error::StoreResult;
use crate::property::PropertyEntry;

/// Flat, path-addressed metadata store.
///
/// The tree layer only ever talks to a packet through this interface, keyed
/// by `(namespace URI, address)`. Implementations must satisfy:
/// - `enumerate` reports every namespace declaration and every property,
///   in any order.
/// - Scalars are stored as text; typing is the reader's concern.
/// - Deleting a container deletes everything below it.
/// - Errors are propagated to the caller, never retried.
///
/// Access is exclusive for the duration of a build/mutate cycle, so mutating
/// operations take `&mut self` and no locking is done.
pub trait PropertyStore {
    /// All namespace declarations and properties as flat tuples.
    fn enumerate(&self) -> StoreResult<Vec<PropertyEntry>>;

    /// Whether a property exists at `address`.
    ///
    /// The root of a registered namespace always exists.
    fn exists(&self, namespace: &str, address: &Address) -> StoreResult<bool>;

    /// The raw text stored at `address`, or `None` if absent.
    fn get(&self, namespace: &str, address: &Address) -> StoreResult<Option<String>>;

    /// Write a scalar as text, creating the property if needed.
    fn set(&mut self, namespace: &str, address: &Address, text: &str) -> StoreResult<()>;

    /// Declare an empty container at `address`.
    ///
    /// Declaring a container that already exists with the same shape is a
    /// no-op.
    fn set_container(&mut self, namespace: &str, address: &Address, shape: Shape)
        -> StoreResult<()>;

    /// Delete the property at `address` and everything below it.
    ///
    /// Returns `true` if the property existed.
    fn delete(&mut self, namespace: &str, address: &Address) -> StoreResult<bool>;

    /// Move the property at `from`, with everything below it, to `to`.
    ///
    /// Nothing may exist at `to`. Backends with a native move should
    /// override this; the default copies each property and deletes the
    /// originals.
    fn rename(&mut self, namespace: &str, from: &Address, to: &Address) -> StoreResult<()> {
        let moved: Vec<(Address, PropertyEntry)> = self
            .enumerate()?
            .into_iter()
            .filter(|entry| entry.namespace == namespace)
            .filter_map(|entry| entry.address.rebase(from, to).map(|target| (target, entry)))
            .collect();
        self.delete(namespace, from)?;
        for (target, entry) in moved {
            if entry.is_container() {
                self.set_container(namespace, &target, entry.shape()?)?;
            } else {
                self.set(namespace, &target, &entry.value)?;
            }
        }
        Ok(())
    }

    /// Number of elements of the array or set at `address`.
    fn count(&self, namespace: &str, address: &Address) -> StoreResult<usize>;

    /// The short prefix registered for `namespace`, if any.
    fn prefix_for(&self, namespace: &str) -> StoreResult<Option<String>>;

    /// Read and decode the scalar at `address`.
    fn get_scalar(&self, namespace: &str, address: &Address) -> StoreResult<Option<Scalar>> {
        Ok(self
            .get(namespace, address)?
            .map(|text| Scalar::decode(&text)))
    }

    /// Encode and write a scalar.
    fn set_scalar(&mut self, namespace: &str, address: &Address, value: &Scalar) -> StoreResult<()> {
        self.set(namespace, address, &value.encode())
    }
}
