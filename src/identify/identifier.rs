// Thu Oct 15 2026 - Alex

use crate::database::{DatabaseIndex, KnownAddressDatabase};
use crate::identify::{AddressIdentification, AddressType};
use crate::memory::{Address, MemoryAccessor};
use crate::structure::{ClassIdentifier, ClassIdentifierKind};
use crate::symbol::ModuleSymbolResolver;
use crate::utils::ShortLivedCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Names addresses from the dataset, falling back to module-relative names.
///
/// Results are cached per `(address, hint)` and expire after a few calls to
/// [`tick`](Self::tick) without a hit. A dataset reload empties the cache.
pub struct AddressIdentifier {
    memory: Arc<dyn MemoryAccessor>,
    database: Arc<KnownAddressDatabase>,
    resolver: Arc<dyn ModuleSymbolResolver>,
    cache: ShortLivedCache<(Address, AddressType), AddressIdentification>,
    seen_generation: AtomicU64,
}

impl AddressIdentifier {
    pub fn new(
        memory: Arc<dyn MemoryAccessor>,
        database: Arc<KnownAddressDatabase>,
        resolver: Arc<dyn ModuleSymbolResolver>,
        ttl: u32,
    ) -> Self {
        let generation = database.generation();
        Self {
            memory,
            database,
            resolver,
            cache: ShortLivedCache::new(ttl),
            seen_generation: AtomicU64::new(generation),
        }
    }

    pub fn identify(&self, addr: Address, hint: AddressType) -> AddressIdentification {
        let generation = self.sync_generation();
        self.cache.get_or_insert_if(
            &(addr, hint),
            || self.lookup(addr, hint),
            || self.database.generation() == generation,
        )
    }

    fn sync_generation(&self) -> u64 {
        let current = self.database.generation();
        if self.seen_generation.swap(current, Ordering::SeqCst) != current {
            log::debug!("name database generation {}, identification cache cleared", current);
            self.cache.clear();
        }
        current
    }

    fn lookup(&self, addr: Address, hint: AddressType) -> AddressIdentification {
        if let Some(index) = self.database.snapshot() {
            let known = index.identify(addr, hint);
            if !known.is_unknown() {
                return known;
            }
            if hint.contains(AddressType::INSTANCE) {
                if let Some(pointed) = self.pointed_instance(&index, addr) {
                    return pointed;
                }
            }
        }

        match self.resolver.resolve(addr) {
            Some(module_address) => AddressIdentification::named(module_address.to_string()),
            None => AddressIdentification::unknown(),
        }
    }

    /// The object a dataset pointer-instance currently points at.
    fn pointed_instance(&self, index: &DatabaseIndex, addr: Address) -> Option<AddressIdentification> {
        if addr.is_null() {
            return None;
        }
        index
            .instance_pointers()
            .find(|(holder, _)| self.memory.read_ptr(*holder).ok() == Some(addr))
            .map(|(holder, instance)| {
                AddressIdentification::new(
                    AddressType::INSTANCE,
                    &instance.class_name,
                    Some(ClassIdentifier::new(ClassIdentifierKind::WellKnownObjectByPointer, holder)),
                    instance.name.as_deref(),
                )
            })
    }

    /// Every well-known address whose kind is in `mask`, ordered by address.
    /// Pointer instances are dereferenced and reported at the object they point to.
    pub fn enumerate_well_known(&self, mask: AddressType) -> Vec<(Address, AddressIdentification)> {
        let Some(index) = self.database.snapshot() else {
            return Vec::new();
        };

        let mut found = index.well_known(mask);
        if mask.contains(AddressType::INSTANCE) {
            for (holder, instance) in index.instance_pointers() {
                let target = match self.memory.read_ptr(holder) {
                    Ok(target) if !target.is_null() && self.memory.can_read(target) => target,
                    _ => continue,
                };
                found.push((
                    target,
                    AddressIdentification::new(
                        AddressType::INSTANCE,
                        &instance.class_name,
                        Some(ClassIdentifier::new(ClassIdentifierKind::WellKnownObjectByPointer, holder)),
                        instance.name.as_deref(),
                    ),
                ));
            }
        }
        found.sort_by_key(|(addr, _)| *addr);
        found
    }

    /// Ages the cache by one frame. Returns the number of evicted entries.
    pub fn tick(&self) -> usize {
        self.cache.tick()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
