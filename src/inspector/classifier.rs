// Fri Oct 16 2026 - Alex

use crate::analysis::MemoryHeuristics;
use crate::identify::{AddressIdentifier, AddressType};
use crate::memory::{Address, MemoryAccessor};
use crate::structure::{pseudo, ClassDescriptor, ClassIdentifier, ClassIdentifierKind, ClassRegistry};
use crate::symbol::ModuleSymbolResolver;
use std::fmt;
use std::sync::Arc;

/// What lives at an address, and how far into it the address points.
#[derive(Debug, Clone)]
pub struct Classification {
    pub class: Arc<ClassDescriptor>,
    pub displacement: u64,
}

impl Classification {
    pub fn new(class: Arc<ClassDescriptor>, displacement: u64) -> Self {
        Self { class, displacement }
    }

    pub fn empty() -> Self {
        Self::new(ClassDescriptor::empty(), 0)
    }

    /// Start of the classified object.
    pub fn object_address(&self, addr: Address) -> Address {
        addr - self.displacement
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.displacement == 0 {
            write!(f, "{}", self.class)
        } else {
            write!(f, "{} +0x{:x}", self.class, self.displacement)
        }
    }
}

/// Turns a raw address into a class and a displacement.
///
/// Every check is a cheap rejection on a few words of memory; the expensive
/// part (building descriptors) goes through the [`ClassRegistry`] cache.
pub struct ObjectClassifier {
    memory: Arc<dyn MemoryAccessor>,
    heuristics: Arc<MemoryHeuristics>,
    resolver: Arc<dyn ModuleSymbolResolver>,
    identifier: Arc<AddressIdentifier>,
    registry: Arc<ClassRegistry>,
    max_thunk_depth: u32,
}

impl ObjectClassifier {
    pub fn new(
        memory: Arc<dyn MemoryAccessor>,
        heuristics: Arc<MemoryHeuristics>,
        resolver: Arc<dyn ModuleSymbolResolver>,
        identifier: Arc<AddressIdentifier>,
        registry: Arc<ClassRegistry>,
        max_thunk_depth: u32,
    ) -> Self {
        Self {
            memory,
            heuristics,
            resolver,
            identifier,
            registry,
            max_thunk_depth,
        }
    }

    pub fn classify(&self, addr: Address) -> Classification {
        self.classify_at(addr, 0)
    }

    fn classify_at(&self, addr: Address, depth: u32) -> Classification {
        if !self.memory.can_read(addr) {
            return Classification::empty();
        }

        if self.memory.can_execute(addr) {
            return self.classify_code(addr);
        }

        let rest = self.memory.rest_of_page(addr);
        if !addr.is_pointer_aligned() {
            return self.rest_of_page(rest);
        }

        let Ok(vtable) = self.memory.read_ptr(addr) else {
            return self.rest_of_page(rest);
        };

        if vtable.is_pointer_aligned() && self.memory.can_execute(vtable) {
            if let Some(owner) = self.heuristics.estimate_size_and_displacement(vtable) {
                let owner_name =
                    self.registry.class_name(ClassIdentifier::new(ClassIdentifierKind::ObjectWithVirtualTable, addr));
                let class = self.registry.virtual_table_class(&owner_name, addr, Some(owner));
                return Classification::new(class, 0);
            }
        }

        if let Some(adjusted) = self.classify_through_thunk(addr, vtable, depth) {
            return adjusted;
        }

        let id = match self.well_known_id(addr) {
            Some(id) => id,
            None if self.plausible_vtable(vtable) => {
                ClassIdentifier::new(ClassIdentifierKind::ObjectWithVirtualTable, vtable)
            }
            None => return self.rest_of_page(rest),
        };
        let class = self.registry.object_class(id, vtable, rest as u32);
        Classification::new(class, 0)
    }

    /// Code resolves to the function containing it, when a symbol says where that starts.
    fn classify_code(&self, addr: Address) -> Classification {
        let displacement = match self.resolver.resolve(addr) {
            Some(module_address) if module_address.has_symbol() => module_address.displacement,
            _ => 0,
        };
        let class = self.registry.function_class(addr - displacement);
        Classification::new(class, displacement)
    }

    /// A secondary vtable whose destructor slot is a `sub rcx, k; jmp` thunk: the object starts `k` bytes earlier.
    fn classify_through_thunk(&self, addr: Address, vtable: Address, depth: u32) -> Option<Classification> {
        if !self.plausible_vtable(vtable) {
            return None;
        }
        let dtor = self.memory.read_ptr(vtable).ok()?;
        let (k, _) = self.heuristics.thunk_at(dtor)?;
        if depth >= self.max_thunk_depth {
            log::debug!("thunk chain at {} cut off at depth {}", addr, depth);
            return None;
        }

        let outer_address = addr.checked_sub(k as u64)?;
        let outer = self.classify_at(outer_address, depth + 1);
        let displacement = outer.displacement + k as u64;
        if outer.class.is_empty() || displacement >= outer.class.estimated_size as u64 {
            log::trace!("thunk displacement 0x{:x} at {} falls outside {}", displacement, addr, outer.class);
            return None;
        }
        Some(Classification::new(outer.class, displacement))
    }

    fn well_known_id(&self, addr: Address) -> Option<ClassIdentifier> {
        let identified = self.identifier.identify(addr, AddressType::INSTANCE);
        if identified.kind != AddressType::INSTANCE {
            return None;
        }
        identified.class_hint.filter(ClassIdentifier::is_object)
    }

    fn plausible_vtable(&self, vtable: Address) -> bool {
        !vtable.is_null() && vtable.is_pointer_aligned() && self.memory.can_read(vtable)
    }

    fn rest_of_page(&self, rest: u64) -> Classification {
        let size = u32::try_from(rest).unwrap_or(u32::MAX);
        Classification::new(Arc::new(pseudo::rest_of_page(size)), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DeallocRoutines;
    use crate::database::{KnownAddressDatabase, NameDatabase};
    use crate::memory::SnapshotMemory;
    use crate::schema::StaticSchemaRegistry;
    use crate::structure::{ClassKind, Collaborators, SizeProvenance};
    use crate::symbol::SymbolTable;
    use crate::utils::testing::*;

    const OBJECT: u64 = HEAP_BASE + 0x100;
    const THUNK: u64 = CODE_BASE + 0x300;

    /// A two-base object at `OBJECT`: primary vtable at `RDATA_BASE`, secondary one at
    /// `RDATA_BASE + 0x100` reached through a `sub rcx, 0x10` thunk.
    fn memory() -> SnapshotMemory {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE).mov_ecx(0x40).call(DEALLOC_ROUTINE).ret().write(&mut memory);
        CodeBuilder::new(THUNK).sub_rcx(0x10).jmp(dtor.as_u64()).write(&mut memory);

        memory.patch_u64(Address::new(RDATA_BASE), dtor.as_u64());
        memory.patch_u64(Address::new(RDATA_BASE + 8), CODE_BASE + 0x200);
        memory.patch_u64(Address::new(RDATA_BASE + 16), HEAP_BASE);
        memory.patch_u64(Address::new(RDATA_BASE + 0x100), THUNK);

        memory.patch_u64(Address::new(OBJECT), RDATA_BASE);
        memory.patch_u64(Address::new(OBJECT + 0x10), RDATA_BASE + 0x100);
        memory
    }

    fn classifier(memory: SnapshotMemory, symbols: SymbolTable, db: Option<NameDatabase>) -> ObjectClassifier {
        classifier_with_depth(memory, symbols, db, 8)
    }

    fn classifier_with_depth(
        memory: SnapshotMemory,
        symbols: SymbolTable,
        db: Option<NameDatabase>,
        max_thunk_depth: u32,
    ) -> ObjectClassifier {
        let memory: Arc<dyn MemoryAccessor> = Arc::new(memory);
        let database = Arc::new(KnownAddressDatabase::new(IMAGE_BASE));
        if let Some(db) = db {
            database.load(db, None);
        }
        let resolver: Arc<dyn ModuleSymbolResolver> = Arc::new(symbols);
        let identifier = Arc::new(AddressIdentifier::new(memory.clone(), database.clone(), resolver.clone(), 2));
        let heuristics = Arc::new(MemoryHeuristics::new(
            memory.clone(),
            DeallocRoutines::new([Address::new(DEALLOC_ROUTINE)]),
            8,
        ));
        let registry = Arc::new(ClassRegistry::new(
            Collaborators {
                memory: memory.clone(),
                heuristics: heuristics.clone(),
                database,
                schemas: Arc::new(StaticSchemaRegistry::new()),
                resolver: resolver.clone(),
                identifier: identifier.clone(),
            },
            0x10000,
            16,
        ));
        ObjectClassifier::new(memory, heuristics, resolver, identifier, registry, max_thunk_depth)
    }

    const CHAIN: u64 = HEAP_BASE + 0x400;
    const BIG_VTABLE: u64 = RDATA_BASE + 0x200;
    const STEP_VTABLE: u64 = RDATA_BASE + 0x280;

    /// A 0x400-byte object at `CHAIN` followed by nine words whose vtable's destructor is
    /// `sub rcx, 0x10; jmp big_dtor`, so each one claims to start 0x10 bytes earlier.
    fn chained_memory() -> SnapshotMemory {
        let mut memory = memory();
        let big_dtor = CodeBuilder::new(CODE_BASE + 0x400)
            .mov_ecx(0x400)
            .call(DEALLOC_ROUTINE)
            .ret()
            .write(&mut memory);
        let step = CodeBuilder::new(CODE_BASE + 0x500).sub_rcx(0x10).jmp(big_dtor.as_u64()).write(&mut memory);
        memory.patch_u64(Address::new(BIG_VTABLE), big_dtor.as_u64());
        memory.patch_u64(Address::new(STEP_VTABLE), step.as_u64());

        memory.patch_u64(Address::new(CHAIN), BIG_VTABLE);
        for i in 1..=9 {
            memory.patch_u64(Address::new(CHAIN + i * 0x10), STEP_VTABLE);
        }
        memory
    }

    fn plain() -> ObjectClassifier {
        classifier(memory(), fake_symbols(), None)
    }

    #[test]
    fn test_unreadable_is_empty() {
        let result = plain().classify(Address::new(0x5000_0000));
        assert!(Arc::ptr_eq(&result.class, &ClassDescriptor::empty()));
        assert_eq!(result.displacement, 0);
    }

    #[test]
    fn test_code_inside_named_function() {
        let mut symbols = fake_symbols();
        symbols.add_symbol("Bar", Address::new(CODE_BASE + 0x100), 0x40);
        let classifier = classifier(memory(), symbols, None);

        let result = classifier.classify(Address::new(CODE_BASE + 0x110));
        assert_eq!(result.displacement, 0x10);
        assert_eq!(result.class.kind, ClassKind::Function);
        assert_eq!(result.class.name, "<Function> game.exe!Bar");
        assert_eq!(result.class.function.as_ref().unwrap().address, Address::new(CODE_BASE + 0x100));
    }

    #[test]
    fn test_instance_sized_by_destructor() {
        let result = plain().classify(Address::new(OBJECT));
        assert_eq!(result.displacement, 0);
        assert_eq!(result.class.name, format!("Cls_{:X}", RDATA_BASE));
        assert_eq!(result.class.estimated_size, 0x40);
        assert_eq!(result.class.size_provenance(), SizeProvenance::Destructor);
    }

    #[test]
    fn test_virtual_table() {
        let result = plain().classify(Address::new(RDATA_BASE));
        assert_eq!(result.displacement, 0);
        assert_eq!(result.class.kind, ClassKind::VirtualTable);
        assert_eq!(result.class.name, format!("<Virtual Table> Cls_{:X}", RDATA_BASE));
        assert_eq!(result.class.estimated_size, 16);
        assert_eq!(result.class.vtable_owner.map(|o| o.size), Some(0x40));
    }

    #[test]
    fn test_secondary_base_through_thunk() {
        let result = plain().classify(Address::new(OBJECT + 0x10));
        assert_eq!(result.displacement, 0x10);
        assert_eq!(result.class.estimated_size, 0x40);
        assert_eq!(result.object_address(Address::new(OBJECT + 0x10)), Address::new(OBJECT));
        assert!(result.displacement < result.class.estimated_size as u64);
    }

    #[test]
    fn test_unaligned_and_garbage_fall_back_to_rest_of_page() {
        let classifier = plain();
        let unaligned = classifier.classify(Address::new(HEAP_BASE + 3));
        assert_eq!(unaligned.class.estimated_size, 0xffd);
        assert_eq!(unaligned.class.size_provenance(), SizeProvenance::RestOfPage);

        let zeroed = classifier.classify(Address::new(HEAP_BASE + 0x800));
        assert_eq!(zeroed.class.estimated_size, 0x800);
        assert!(!zeroed.class.is_class());
    }

    #[test]
    fn test_well_known_instances() {
        let mut memory = memory();
        memory.patch_u64(Address::new(DATA_BASE), RDATA_BASE);
        memory.patch_u64(Address::new(DATA_BASE + 0x100), OBJECT);

        let mut db = empty_database();
        let mut actor = class_entry(RDATA_BASE, None);
        actor.instances.push(instance(DATA_BASE, Some("g_Player"), false));
        db.classes.insert("Actor".into(), actor);
        let mut world = class_entry(RDATA_BASE + 0x400, None);
        world.instances.push(instance(DATA_BASE + 0x100, Some("g_pWorld"), true));
        db.classes.insert("World".into(), world);

        let classifier = classifier(memory, fake_symbols(), Some(db));
        let player = classifier.classify(Address::new(DATA_BASE));
        assert_eq!(player.class.name, "Actor");
        assert_eq!(player.class.estimated_size, 0x40);

        let pointed = classifier.classify(Address::new(OBJECT));
        assert_eq!(pointed.class.name, "World");
        assert!(pointed.class.is_known());
    }

    #[test]
    fn test_repeated_classification_hits_cache() {
        let classifier = plain();
        let first = classifier.classify(Address::new(OBJECT));
        let second = classifier.classify(Address::new(OBJECT));
        assert!(Arc::ptr_eq(&first.class, &second.class));
        assert_eq!(first.class.estimated_size, second.class.estimated_size);
    }

    #[test]
    fn test_thunk_chain_within_depth_reaches_outer_object() {
        let classifier = classifier(chained_memory(), fake_symbols(), None);
        let result = classifier.classify(Address::new(CHAIN + 0x80));
        assert_eq!(result.class.name, format!("Cls_{:X}", BIG_VTABLE));
        assert_eq!(result.displacement, 0x80);
        assert_eq!(result.class.estimated_size, 0x400);
    }

    #[test]
    fn test_thunk_chain_is_cut_off_at_max_depth() {
        let classifier = classifier(chained_memory(), fake_symbols(), None);
        let result = classifier.classify(Address::new(CHAIN + 0x90));
        assert_eq!(result.class.name, format!("Cls_{:X}", STEP_VTABLE));
        assert_eq!(result.displacement, 0x80);
        assert_eq!(result.object_address(Address::new(CHAIN + 0x90)), Address::new(CHAIN + 0x10));

        let flat = classifier_with_depth(chained_memory(), fake_symbols(), None, 0);
        let result = flat.classify(Address::new(CHAIN + 0x10));
        assert_eq!(result.class.name, format!("Cls_{:X}", STEP_VTABLE));
        assert_eq!(result.displacement, 0);
    }

    #[test]
    fn test_thunk_displacement_past_outer_size_is_rejected() {
        let mut memory = memory();
        let dtor = memory.read_ptr(Address::new(RDATA_BASE)).unwrap();
        let far = CodeBuilder::new(CODE_BASE + 0x600).sub_rcx(0x40).jmp(dtor.as_u64()).write(&mut memory);
        memory.patch_u64(Address::new(RDATA_BASE + 0x300), far.as_u64());
        memory.patch_u64(Address::new(OBJECT + 0x40), RDATA_BASE + 0x300);

        let classifier = classifier(memory, fake_symbols(), None);
        assert_eq!(classifier.classify(Address::new(OBJECT)).class.estimated_size, 0x40);

        let result = classifier.classify(Address::new(OBJECT + 0x40));
        assert_eq!(result.displacement, 0);
        assert_eq!(result.class.name, format!("Cls_{:X}", RDATA_BASE + 0x300));
    }
}
