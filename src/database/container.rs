// Wed Oct 14 2026 - Alex

use crate::database::{ClassEntry, DatasetAddress, NameDatabase};
use crate::identify::{AddressIdentification, AddressType};
use crate::memory::Address;
use crate::structure::{ClassIdentifier, ClassIdentifierKind};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A dataset instance resolved to its live address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub class_name: String,
    pub name: Option<String>,
}

/// Immutable, relocated view of one loaded [`NameDatabase`] with its inverse indexes.
pub struct DatabaseIndex {
    data: NameDatabase,
    preferred_base: u64,
    live_base: u64,
    globals: AHashMap<Address, String>,
    functions: AHashMap<Address, String>,
    class_functions: AHashMap<Address, (String, String)>,
    classes_by_instance: AHashMap<Address, InstanceRef>,
    classes_by_instance_pointer: AHashMap<Address, InstanceRef>,
    classes_by_vtable: AHashMap<Address, String>,
}

impl DatabaseIndex {
    pub fn new(data: NameDatabase, preferred_base: u64, live_base: u64) -> Self {
        let mut index = Self {
            data: NameDatabase::default(),
            preferred_base,
            live_base,
            globals: AHashMap::new(),
            functions: AHashMap::new(),
            class_functions: AHashMap::new(),
            classes_by_instance: AHashMap::new(),
            classes_by_instance_pointer: AHashMap::new(),
            classes_by_vtable: AHashMap::new(),
        };

        let relocate = |ea: DatasetAddress| Address::new(ea.0.wrapping_sub(preferred_base).wrapping_add(live_base));

        for (ea, name) in &data.globals {
            index.globals.insert(relocate(*ea), name.clone());
        }
        for (ea, name) in &data.functions {
            index.functions.insert(relocate(*ea), name.clone());
        }
        for (class_name, class) in &data.classes {
            for instance in &class.instances {
                let target = if instance.pointer {
                    &mut index.classes_by_instance_pointer
                } else {
                    &mut index.classes_by_instance
                };
                target.entry(relocate(instance.ea)).or_insert_with(|| InstanceRef {
                    class_name: class_name.clone(),
                    name: instance.name.clone(),
                });
            }
            for vtbl in &class.vtbls {
                index.classes_by_vtable.entry(relocate(vtbl.ea)).or_insert_with(|| class_name.clone());
            }
            for (ea, name) in &class.funcs {
                index.class_functions.insert(relocate(*ea), (class_name.clone(), name.clone()));
            }
        }

        index.data = data;
        index
    }

    pub fn data(&self) -> &NameDatabase {
        &self.data
    }

    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.data.class(name)
    }

    pub fn live_address(&self, ea: DatasetAddress) -> Address {
        Address::new(ea.0.wrapping_sub(self.preferred_base).wrapping_add(self.live_base))
    }

    pub fn class_by_instance(&self, addr: Address) -> Option<&InstanceRef> {
        self.classes_by_instance.get(&addr)
    }

    pub fn class_by_instance_pointer(&self, addr: Address) -> Option<&InstanceRef> {
        self.classes_by_instance_pointer.get(&addr)
    }

    pub fn class_by_vtable(&self, addr: Address) -> Option<&str> {
        self.classes_by_vtable.get(&addr).map(String::as_str)
    }

    /// Live addresses of the globals holding pointers to well-known instances.
    pub fn instance_pointers(&self) -> impl Iterator<Item = (Address, &InstanceRef)> {
        self.classes_by_instance_pointer.iter().map(|(a, r)| (*a, r))
    }

    /// Live address of the primary vtable of `class_name`.
    pub fn primary_vtable(&self, class_name: &str) -> Option<Address> {
        let vtbl = self.class(class_name)?.primary_vtable()?;
        Some(self.live_address(vtbl.ea))
    }

    /// Looks `addr` up in the dataset only; the kinds outside `hint` are skipped.
    pub fn identify(&self, addr: Address, hint: AddressType) -> AddressIdentification {
        if hint.contains(AddressType::INSTANCE) {
            if let Some(instance) = self.classes_by_instance.get(&addr) {
                return AddressIdentification::new(
                    AddressType::INSTANCE,
                    &instance.class_name,
                    Some(ClassIdentifier::new(ClassIdentifierKind::WellKnownObject, addr)),
                    instance.name.as_deref(),
                );
            }
        }

        if hint.contains(AddressType::VIRTUAL_TABLE) {
            if let Some(class_name) = self.classes_by_vtable.get(&addr) {
                return AddressIdentification::new(
                    AddressType::VIRTUAL_TABLE,
                    class_name,
                    Some(ClassIdentifier::new(ClassIdentifierKind::VirtualTable, addr)),
                    None,
                );
            }
        }

        if hint.contains(AddressType::FUNCTION) {
            if let Some((class_name, name)) = self.class_functions.get(&addr) {
                return AddressIdentification::new(
                    AddressType::FUNCTION,
                    class_name,
                    Some(ClassIdentifier::new(ClassIdentifierKind::Function, addr)),
                    Some(name),
                );
            }
            if let Some(name) = self.functions.get(&addr) {
                return AddressIdentification::new(
                    AddressType::FUNCTION,
                    "",
                    Some(ClassIdentifier::new(ClassIdentifierKind::Function, addr)),
                    Some(name),
                );
            }
        }

        if hint.contains(AddressType::GLOBAL) {
            if let Some(instance) = self.classes_by_instance_pointer.get(&addr) {
                let name = instance
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}*", instance.class_name));
                return AddressIdentification::new(
                    AddressType::GLOBAL,
                    &instance.class_name,
                    Some(ClassIdentifier::new(ClassIdentifierKind::WellKnownObjectByPointer, addr)),
                    Some(&name),
                );
            }
            if let Some(name) = self.globals.get(&addr) {
                return AddressIdentification::new(AddressType::GLOBAL, "", None, Some(name));
            }
        }

        AddressIdentification::unknown()
    }

    /// Every dataset address whose kind is in `mask`, sorted by address.
    ///
    /// Pointer instances are reported as the globals holding them; dereferencing
    /// them needs process memory and is left to the caller.
    pub fn well_known(&self, mask: AddressType) -> Vec<(Address, AddressIdentification)> {
        let mut addresses: Vec<Address> = Vec::new();
        if mask.contains(AddressType::INSTANCE) {
            addresses.extend(self.classes_by_instance.keys());
        }
        if mask.contains(AddressType::VIRTUAL_TABLE) {
            addresses.extend(self.classes_by_vtable.keys());
        }
        if mask.contains(AddressType::FUNCTION) {
            addresses.extend(self.functions.keys());
            addresses.extend(self.class_functions.keys());
        }
        if mask.contains(AddressType::GLOBAL) {
            addresses.extend(self.globals.keys());
            addresses.extend(self.classes_by_instance_pointer.keys());
        }
        addresses.sort();
        addresses.dedup();

        addresses
            .into_iter()
            .map(|addr| (addr, self.identify(addr, mask)))
            .filter(|(_, id)| !id.is_unknown())
            .collect()
    }
}

/// The read-only name database shared by every lookup, replaced wholesale on reload.
pub struct KnownAddressDatabase {
    index: RwLock<Option<Arc<DatabaseIndex>>>,
    generation: AtomicU64,
    preferred_base: u64,
}

impl KnownAddressDatabase {
    pub fn new(preferred_base: u64) -> Self {
        Self {
            index: RwLock::new(None),
            generation: AtomicU64::new(0),
            preferred_base,
        }
    }

    /// Installs a new database. `live_base` is where the image the dataset describes is mapped;
    /// `None` keeps dataset addresses as they are.
    pub fn load(&self, data: NameDatabase, live_base: Option<Address>) -> u64 {
        let live_base = live_base.map(|a| a.as_u64()).unwrap_or(self.preferred_base);
        let classes = data.classes.len();
        let index = Arc::new(DatabaseIndex::new(data, self.preferred_base, live_base));
        *self.index.write() = Some(index);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!(
            "name database loaded: {} classes, live base 0x{:x}, generation {}",
            classes,
            live_base,
            generation
        );
        generation
    }

    pub fn unload(&self) -> u64 {
        *self.index.write() = None;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("name database unloaded, generation {}", generation);
        generation
    }

    /// Bumped on every load or unload; caches compare it to detect staleness.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Option<Arc<DatabaseIndex>> {
        self.index.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.index.read().is_some()
    }

    pub fn identify(&self, addr: Address, hint: AddressType) -> AddressIdentification {
        match self.snapshot() {
            Some(index) => index.identify(addr, hint),
            None => AddressIdentification::unknown(),
        }
    }
}
