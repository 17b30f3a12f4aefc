// Thu Oct 15 2026 - Alex

use crate::analysis::{FunctionAnalyzer, MemoryHeuristics, SizeAndDisplacement};
use crate::database::{DatabaseIndex, KnownAddressDatabase};
use crate::identify::{AddressIdentifier, AddressType};
use crate::memory::{Address, MemoryAccessor, POINTER_SIZE};
use crate::schema::{TypeSchema, TypeSchemaRegistry};
use crate::structure::{
    slot_fields, ClassDescriptor, ClassIdentifier, ClassIdentifierKind, ClassKind, FieldDescriptor, SchemaFlattener,
    VirtualTableWalker,
};
use crate::symbol::ModuleSymbolResolver;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The shared services classification reads from.
#[derive(Clone)]
pub struct Collaborators {
    pub memory: Arc<dyn MemoryAccessor>,
    pub heuristics: Arc<MemoryHeuristics>,
    pub database: Arc<KnownAddressDatabase>,
    pub schemas: Arc<dyn TypeSchemaRegistry>,
    pub resolver: Arc<dyn ModuleSymbolResolver>,
    pub identifier: Arc<AddressIdentifier>,
}

/// Schema classes one call is flattening, outermost first.
#[derive(Default)]
struct Chain {
    names: Vec<String>,
    /// Shallowest entry a placeholder stood in for. Everything deeper is partial.
    cut: Option<usize>,
}

type Visiting = RefCell<Chain>;

impl Chain {
    fn rooted_at(name: &str) -> Visiting {
        RefCell::new(Chain {
            names: vec![name.to_string()],
            cut: None,
        })
    }
}

/// Builds class descriptors and memoizes them by name until the name database changes.
pub struct ClassRegistry {
    sources: Collaborators,
    analyzer: FunctionAnalyzer,
    max_vtable_pages: u32,
    classes: Mutex<AHashMap<String, Arc<ClassDescriptor>>>,
    function_names: Mutex<AHashMap<Address, String>>,
    seen_generation: AtomicU64,
}

impl ClassRegistry {
    pub fn new(sources: Collaborators, max_function_bytes: usize, max_vtable_pages: u32) -> Self {
        let analyzer = FunctionAnalyzer::new(sources.memory.clone(), sources.identifier.clone(), max_function_bytes);
        let generation = sources.database.generation();
        Self {
            sources,
            analyzer,
            max_vtable_pages,
            classes: Mutex::new(AHashMap::new()),
            function_names: Mutex::new(AHashMap::new()),
            seen_generation: AtomicU64::new(generation),
        }
    }

    pub fn analyzer(&self) -> &FunctionAnalyzer {
        &self.analyzer
    }

    /// Drops every memoized descriptor and name.
    pub fn clear(&self) {
        self.function_names.lock().clear();
        self.classes.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.classes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.lock().is_empty()
    }

    /// Clears the cache after a reload and returns the generation a build starts from.
    fn sync_generation(&self) -> u64 {
        let current = self.sources.database.generation();
        if self.seen_generation.swap(current, Ordering::SeqCst) != current {
            log::debug!("name database generation {}, class cache cleared", current);
            self.clear();
        }
        current
    }

    fn cached(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.lock().get(name).cloned()
    }

    /// Stores a freshly built descriptor unless a concurrent build got there first.
    /// Descriptors built from a database that was replaced meanwhile are returned uncached.
    fn store(&self, class: ClassDescriptor, generation: u64) -> Arc<ClassDescriptor> {
        let mut classes = self.classes.lock();
        if self.sources.database.generation() != generation {
            log::debug!("class {} built from name database generation {}, not cached", class.name, generation);
            return Arc::new(class);
        }
        log::debug!("built class {}", class);
        classes.entry(class.name.clone()).or_insert_with(|| Arc::new(class)).clone()
    }

    /// Descriptor of an object identified by `id`, whose first word is `vtable`.
    ///
    /// `rest_of_page` becomes the size when neither a destructor nor a schema gives one.
    pub fn object_class(&self, id: ClassIdentifier, vtable: Address, rest_of_page: u32) -> Arc<ClassDescriptor> {
        debug_assert!(id.is_object(), "{} does not identify an object", id);
        let generation = self.sync_generation();

        let name = self.class_name(id);
        if let Some(class) = self.cached(&name) {
            return class;
        }

        let mut class = ClassDescriptor::new(&name, ClassKind::Regular);
        class.defining_module = self.defining_module(vtable);
        self.populate_from_vtable(&mut class, Some(vtable));
        self.populate_from_schema(&mut class, &Chain::rooted_at(&name));
        class.aggregate_size(rest_of_page);
        self.store(class, generation)
    }

    /// Descriptor of a type known by name only, as nested fields reference it.
    ///
    /// The destructor size comes from the type's primary vtable in the name database.
    pub fn from_schema(&self, name: &str) -> Arc<ClassDescriptor> {
        self.schema_class(name, &Visiting::default())
    }

    fn schema_class(&self, name: &str, visiting: &Visiting) -> Arc<ClassDescriptor> {
        let generation = self.sync_generation();
        if let Some(class) = self.cached(name) {
            return class;
        }

        let recursed = {
            let mut chain = visiting.borrow_mut();
            let at = chain.names.iter().position(|n| n == name);
            if let Some(at) = at {
                chain.cut = Some(chain.cut.map_or(at, |cut| cut.min(at)));
            }
            at.is_some()
        };
        if recursed {
            // Reached again while this call flattens its own fields.
            let mut placeholder = ClassDescriptor::new(name, ClassKind::Regular);
            placeholder.size_from_schema = self.sources.schemas.lookup(name).map(|s| s.size);
            placeholder.aggregate_size(self.sources.memory.page_size() as u32);
            return Arc::new(placeholder);
        }

        let mut class = ClassDescriptor::new(name, ClassKind::Regular);
        let vtable = self.sources.database.snapshot().and_then(|index| index.primary_vtable(name));
        if let Some(vtable) = vtable {
            self.populate_from_vtable(&mut class, Some(vtable));
        }
        let depth = {
            let mut chain = visiting.borrow_mut();
            chain.names.push(name.to_string());
            chain.names.len() - 1
        };
        self.populate_from_schema(&mut class, visiting);
        let complete = {
            let mut chain = visiting.borrow_mut();
            chain.names.pop();
            let complete = chain.cut.map_or(true, |cut| cut >= depth);
            if chain.cut == Some(depth) {
                chain.cut = None;
            }
            complete
        };
        class.aggregate_size(self.sources.memory.page_size() as u32);

        if !complete {
            log::debug!("class {} holds a placeholder for an enclosing class, not cached", name);
            return Arc::new(class);
        }
        self.store(class, generation)
    }

    /// Descriptor of the virtual table `vtable` of `class_name`.
    pub fn virtual_table_class(
        &self,
        class_name: &str,
        vtable: Address,
        owner: Option<SizeAndDisplacement>,
    ) -> Arc<ClassDescriptor> {
        let generation = self.sync_generation();
        let name = format!("<Virtual Table> {}", class_name);
        if let Some(class) = self.cached(&name) {
            return class;
        }

        let mut names = BTreeMap::new();
        if let Some(index) = self.sources.database.snapshot() {
            if index.primary_vtable(class_name) == Some(vtable) {
                if let Some(entry) = index.class(class_name) {
                    names = entry.vfuncs.clone();
                }
            }
        }

        let known_slots = names.keys().next_back().map_or(1, |&last| last + 1);
        let walker = VirtualTableWalker::new(
            self.sources.memory.as_ref(),
            self.sources.heuristics.as_ref(),
            self.max_vtable_pages,
        );
        let known_bytes = known_slots as u64 * POINTER_SIZE;
        let size = known_bytes + walker.rest_size(vtable + known_bytes);
        let size = u32::try_from(size).unwrap_or(u32::MAX);

        let mut class = ClassDescriptor::new(&name, ClassKind::VirtualTable);
        class.defining_module = self.defining_module(vtable);
        class.estimated_size = size;
        class.size_from_context = Some(size);
        class.vtable_owner = owner;
        class.set_fields(slot_fields(size / POINTER_SIZE as u32, &names));
        self.store(class, generation)
    }

    /// Descriptor of the function starting at `addr`, with its decoded body.
    pub fn function_class(&self, addr: Address) -> Arc<ClassDescriptor> {
        let generation = self.sync_generation();
        let name = self.class_name(ClassIdentifier::new(ClassIdentifierKind::Function, addr));
        if let Some(class) = self.cached(&name) {
            return class;
        }

        let body = self.analyzer.analyze(addr);
        let size = u32::try_from(body.size).unwrap_or(u32::MAX);
        let mut class = ClassDescriptor::new(&name, ClassKind::Function);
        class.defining_module = self.sources.resolver.module_name(addr);
        class.estimated_size = size;
        class.size_from_context = Some(size);
        class.function = Some(body);
        self.store(class, generation)
    }

    /// Name of the class `id` designates. Unknown classes are named after their evidence.
    pub fn class_name(&self, id: ClassIdentifier) -> String {
        let index = self.sources.database.snapshot();
        let index = index.as_deref();
        match id.kind {
            ClassIdentifierKind::WellKnownObject => index
                .and_then(|i| i.class_by_instance(id.address))
                .map(|r| r.class_name.clone())
                .unwrap_or_else(|| format!("WkObj_{:X}", id.address)),
            ClassIdentifierKind::WellKnownObjectByPointer => index
                .and_then(|i| i.class_by_instance_pointer(id.address))
                .map(|r| r.class_name.clone())
                .unwrap_or_else(|| format!("WkObjP_{:X}", id.address)),
            ClassIdentifierKind::ObjectWithVirtualTable => vtable_class_name(index, id.address),
            ClassIdentifierKind::VirtualTable => {
                format!("<Virtual Table> {}", vtable_class_name(index, id.address))
            }
            ClassIdentifierKind::Function => {
                if let Some(name) = self.function_names.lock().get(&id.address) {
                    return name.clone();
                }
                let identified = self.sources.identifier.identify(id.address, AddressType::FUNCTION);
                let name = format!(
                    "<Function> {}",
                    identified.full_name().unwrap_or_else(|| format!("{:X}", id.address))
                );
                self.function_names.lock().entry(id.address).or_insert(name).clone()
            }
        }
    }

    /// Module of `vtable`, provided its first slot points into the same module.
    fn defining_module(&self, vtable: Address) -> Option<String> {
        let memory = &self.sources.memory;
        if !memory.can_read(vtable) {
            return None;
        }
        let first = memory.read_ptr(vtable).ok()?;
        if !memory.can_execute(first) {
            return None;
        }
        let module = self.sources.resolver.module_name(vtable)?;
        let code_module = self.sources.resolver.module_name(first)?;
        module.eq_ignore_ascii_case(&code_module).then_some(module)
    }

    fn destructor_size(&self, vtable: Address) -> Option<u32> {
        let memory = &self.sources.memory;
        if !memory.can_read(vtable) {
            return None;
        }
        let dtor = memory.read_ptr(vtable).ok()?;
        self.sources.heuristics.estimate_size(dtor)
    }

    /// Destructor size from `vtable` and every other dataset vtable of the class, largest wins.
    fn populate_from_vtable(&self, class: &mut ClassDescriptor, vtable: Option<Address>) {
        let mut size = vtable.and_then(|v| self.destructor_size(v));

        if let Some(index) = self.sources.database.snapshot() {
            if let Some(entry) = index.class(&class.name) {
                for other in entry.vtbls.iter().map(|v| index.live_address(v.ea)) {
                    if Some(other) == vtable {
                        continue;
                    }
                    if let Some(other_size) = self.destructor_size(other) {
                        size = Some(size.map_or(other_size, |s| s.max(other_size)));
                    }
                }
            }
        }
        class.size_from_destructor = size;
    }

    /// Parent chain from the name database, fields and methods from the class's schema,
    /// or from the nearest parent that has one.
    fn populate_from_schema(&self, class: &mut ClassDescriptor, visiting: &Visiting) {
        if let Some(index) = self.sources.database.snapshot() {
            class.parents = index.data().parent_chain(&class.name);
        }

        let own = self.sources.schemas.lookup(&class.name);
        if let Some(schema) = &own {
            class.size_from_schema = Some(schema.size);
        }
        let schema = own.or_else(|| class.parents.iter().find_map(|p| self.sources.schemas.lookup(p)));
        let Some(schema) = schema else {
            return;
        };

        let resolve = |name: &str| self.schema_class(name, visiting);
        let fields = SchemaFlattener::new(self.sources.schemas.as_ref(), &resolve).flatten(&schema);
        class.set_fields(within_bounds(&schema, fields));
        class.schema = Some(schema);
    }
}

fn vtable_class_name(index: Option<&DatabaseIndex>, vtable: Address) -> String {
    index
        .and_then(|i| i.class_by_vtable(vtable))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Cls_{:X}", vtable))
}

fn within_bounds(schema: &TypeSchema, fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    fields
        .into_iter()
        .filter(|f| {
            let fits = f.end() <= schema.size as u64;
            if !fits {
                log::warn!("schema {}: field {} exceeds 0x{:x} bytes, skipped", schema.name, f, schema.size);
            }
            fits
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DeallocRoutines;
    use crate::database::{DatasetAddress, NameDatabase};
    use crate::schema::{SchemaField, StaticSchemaRegistry};
    use crate::structure::{FieldKind, SizeProvenance};
    use crate::utils::testing::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;

    const VTABLE: u64 = RDATA_BASE;
    const SECOND_VTABLE: u64 = RDATA_BASE + 0x100;

    fn memory() -> crate::memory::SnapshotMemory {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE).mov_edx(0x40).call(DEALLOC_ROUTINE).ret().write(&mut memory);
        let big_dtor = CodeBuilder::new(CODE_BASE + 0x80).mov_edx(0x58).call(DEALLOC_ROUTINE).ret().write(&mut memory);
        memory.patch_u64(Address::new(VTABLE), dtor.as_u64());
        memory.patch_u64(Address::new(VTABLE + 8), CODE_BASE + 0x200);
        memory.patch_u64(Address::new(VTABLE + 16), CODE_BASE + 0x210);
        memory.patch_u64(Address::new(VTABLE + 24), HEAP_BASE);
        memory.patch_u64(Address::new(SECOND_VTABLE), big_dtor.as_u64());
        memory
    }

    fn database() -> NameDatabase {
        let mut db = NameDatabase::default();
        let mut actor = class_entry(VTABLE, Some("Object"));
        actor.vtbls.push(crate::database::VirtualTableEntry {
            ea: DatasetAddress(SECOND_VTABLE),
            base: None,
        });
        actor.vfuncs.insert(1, "Update".into());
        actor.instances.push(instance(DATA_BASE, Some("g_Player"), false));
        db.classes.insert("Actor".into(), actor);
        db.classes.insert("Object".into(), class_entry(RDATA_BASE + 0x200, None));
        db.functions.insert(DatasetAddress(CODE_BASE + 0x200), "Actor_Update".into());
        db
    }

    fn schemas() -> StaticSchemaRegistry {
        StaticSchemaRegistry::new()
            .with(
                TypeSchema::new("Object", 0x10)
                    .with_field(SchemaField::scalar("VirtualTable", 0, FieldKind::Pointer))
                    .with_field(SchemaField::scalar("Id", 8, FieldKind::UInt32)),
            )
            .with(
                TypeSchema::new("Vec3", 12)
                    .with_field(SchemaField::scalar("X", 0, FieldKind::Single))
                    .with_field(SchemaField::scalar("Y", 4, FieldKind::Single))
                    .with_field(SchemaField::scalar("Z", 8, FieldKind::Single)),
            )
            .with(
                TypeSchema::new("Actor", 0x30)
                    .with_field(SchemaField::base("Object", 0, 0x10, "Object"))
                    .with_field(SchemaField::scalar("VirtualTable", 0, FieldKind::Pointer))
                    .with_field(SchemaField::nested("Position", 0x10, 12, "Vec3"))
                    .with_field(SchemaField::scalar("Broken", 0x2c, FieldKind::UInt64)),
            )
    }

    fn registry_with(db: Option<NameDatabase>) -> (ClassRegistry, Arc<KnownAddressDatabase>) {
        let database = Arc::new(KnownAddressDatabase::new(IMAGE_BASE));
        if let Some(db) = db {
            database.load(db, None);
        }
        (registry_over(database.clone(), Arc::new(schemas())), database)
    }

    fn registry_over(database: Arc<KnownAddressDatabase>, schemas: Arc<dyn TypeSchemaRegistry>) -> ClassRegistry {
        let memory: Arc<dyn MemoryAccessor> = Arc::new(memory());
        let resolver: Arc<dyn ModuleSymbolResolver> = Arc::new(fake_symbols());
        let identifier = Arc::new(AddressIdentifier::new(memory.clone(), database.clone(), resolver.clone(), 2));
        let heuristics = Arc::new(MemoryHeuristics::new(
            memory.clone(),
            DeallocRoutines::new([Address::new(DEALLOC_ROUTINE)]),
            8,
        ));
        let sources = Collaborators {
            memory,
            heuristics,
            database,
            schemas,
            resolver,
            identifier,
        };
        ClassRegistry::new(sources, 0x10000, 16)
    }

    /// Holds the first caller looking up `Vec3` until released.
    struct GatedSchemas {
        inner: StaticSchemaRegistry,
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl TypeSchemaRegistry for GatedSchemas {
        fn lookup(&self, name: &str) -> Option<Arc<TypeSchema>> {
            if name == "Vec3" {
                let gate = self.gate.lock().take();
                if let Some((entered, release)) = gate {
                    entered.send(()).unwrap();
                    release.recv().unwrap();
                }
            }
            self.inner.lookup(name)
        }
    }

    /// Unloads the name database the first time `Actor` is looked up.
    struct ReloadingSchemas {
        inner: StaticSchemaRegistry,
        database: Arc<KnownAddressDatabase>,
        fired: AtomicBool,
    }

    impl TypeSchemaRegistry for ReloadingSchemas {
        fn lookup(&self, name: &str) -> Option<Arc<TypeSchema>> {
            if name == "Actor" && !self.fired.swap(true, Ordering::SeqCst) {
                self.database.unload();
            }
            self.inner.lookup(name)
        }
    }

    fn registry() -> ClassRegistry {
        registry_with(Some(database())).0
    }

    fn by_vtable(addr: u64) -> ClassIdentifier {
        ClassIdentifier::new(ClassIdentifierKind::ObjectWithVirtualTable, Address::new(addr))
    }

    #[test]
    fn test_object_class_merges_sources() {
        let registry = registry();
        let actor = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);

        assert_eq!(actor.name, "Actor");
        assert_eq!(actor.size_from_destructor, Some(0x58));
        assert_eq!(actor.size_from_schema, Some(0x30));
        assert_eq!(actor.estimated_size, 0x58);
        assert_eq!(actor.size_provenance(), SizeProvenance::Destructor);
        assert_eq!(actor.parents, vec!["Object".to_string()]);
        assert_eq!(actor.defining_module.as_deref(), Some(MODULE_NAME));

        let names: Vec<&str> = actor.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["VirtualTable", "Position", "Position.X", "Position.Y", "Position.Z"]);
        assert_eq!(actor.field("Position").unwrap().element_class.as_ref().unwrap().estimated_size, 12);
    }

    #[test]
    fn test_object_class_is_memoized() {
        let registry = registry();
        let first = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
        let second = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x10);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_vtable_gets_placeholder_name() {
        let (registry, _) = registry_with(None);
        let class = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
        assert_eq!(class.name, format!("Cls_{:X}", VTABLE));
        assert_eq!(class.estimated_size, 0x40);
        assert!(!class.is_known());
        assert!(class.is_class());
    }

    #[test]
    fn test_well_known_names() {
        let registry = registry();
        let player = ClassIdentifier::new(ClassIdentifierKind::WellKnownObject, Address::new(DATA_BASE));
        assert_eq!(registry.class_name(player), "Actor");

        let stranger = ClassIdentifier::new(ClassIdentifierKind::WellKnownObject, Address::new(0x1234));
        assert_eq!(registry.class_name(stranger), "WkObj_1234");

        let by_pointer = ClassIdentifier::new(ClassIdentifierKind::WellKnownObjectByPointer, Address::new(0xabc));
        assert_eq!(registry.class_name(by_pointer), "WkObjP_ABC");

        let vtable = ClassIdentifier::new(ClassIdentifierKind::VirtualTable, Address::new(VTABLE));
        assert_eq!(registry.class_name(vtable), "<Virtual Table> Actor");
    }

    #[test]
    fn test_virtual_table_class() {
        let registry = registry();
        let owner = SizeAndDisplacement {
            size: 0x40,
            displacement: 0,
        };
        let vtable = registry.virtual_table_class("Actor", Address::new(VTABLE), Some(owner));

        assert_eq!(vtable.kind, ClassKind::VirtualTable);
        assert_eq!(vtable.estimated_size, 24);
        assert_eq!(vtable.vtable_owner, Some(owner));
        let names: Vec<&str> = vtable.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["<vf0>", "Update", "<vf2>"]);
    }

    #[test]
    fn test_function_class() {
        let registry = registry();
        let function = registry.function_class(Address::new(CODE_BASE));
        assert_eq!(function.name, "<Function> game.exe+0x1000");
        assert_eq!(function.kind, ClassKind::Function);
        assert_eq!(function.estimated_size, 11);
        assert_eq!(function.function.as_ref().unwrap().instructions.len(), 3);

        let named = registry.function_class(Address::new(CODE_BASE + 0x200));
        assert_eq!(named.name, "<Function> Actor_Update");
    }

    #[test]
    fn test_from_schema_uses_dataset_vtable() {
        let registry = registry();
        let object = registry.from_schema("Object");
        assert_eq!(object.size_from_schema, Some(0x10));
        assert_eq!(object.estimated_size, 0x10);

        let unknown = registry.from_schema("Nothing");
        assert_eq!(unknown.estimated_size, 0x1000);
        assert!(unknown.fields.is_empty());
    }

    #[test]
    fn test_reload_clears_cache() {
        let (registry, database) = registry_with(Some(database()));
        registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
        assert!(!registry.is_empty());

        database.unload();
        let class = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
        assert_eq!(class.name, format!("Cls_{:X}", VTABLE));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_build_does_not_share_unfinished_class() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let schemas = GatedSchemas {
            inner: schemas(),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        };
        let known = Arc::new(KnownAddressDatabase::new(IMAGE_BASE));
        known.load(database(), None);
        let registry = registry_over(known, Arc::new(schemas));

        let (position, vec3) = std::thread::scope(|scope| {
            let builder = scope.spawn(|| registry.from_schema("Vec3"));
            entered_rx.recv().unwrap();

            let actor = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
            let position = actor.field("Position").and_then(|f| f.element_class.clone());
            release_tx.send(()).unwrap();
            (position, builder.join().unwrap())
        });

        assert_eq!(position.unwrap().fields.len(), 3);
        assert_eq!(vec3.fields.len(), 3);

        let cached = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
        let cached_position = cached.field("Position").unwrap().element_class.clone().unwrap();
        assert_eq!(cached_position.fields.len(), 3);
    }

    #[test]
    fn test_build_racing_a_reload_is_not_cached() {
        let known = Arc::new(KnownAddressDatabase::new(IMAGE_BASE));
        known.load(database(), None);
        let schemas = ReloadingSchemas {
            inner: schemas(),
            database: known.clone(),
            fired: AtomicBool::new(false),
        };
        let registry = registry_over(known, Arc::new(schemas));

        let actor = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
        assert_eq!(actor.name, "Actor");
        assert!(registry.cached("Actor").is_none());
        assert!(registry.cached("Vec3").is_some());

        let after = registry.object_class(by_vtable(VTABLE), Address::new(VTABLE), 0x800);
        assert_eq!(after.name, format!("Cls_{:X}", VTABLE));
    }

    #[test]
    fn test_self_referencing_schemas_cache_only_the_outer_class() {
        let schemas = StaticSchemaRegistry::new()
            .with(TypeSchema::new("Node", 0x20).with_field(SchemaField::object_array("Links", 0, 0x20, "Link", 1)))
            .with(TypeSchema::new("Link", 0x20).with_field(SchemaField::object_array("Owner", 0, 0x20, "Node", 1)));
        let registry = registry_over(Arc::new(KnownAddressDatabase::new(IMAGE_BASE)), Arc::new(schemas));

        let node = registry.from_schema("Node");
        let link = node.field("Links").unwrap().element_class.clone().unwrap();
        let owner = link.field("Owner").unwrap().element_class.clone().unwrap();
        assert_eq!(link.fields.len(), 1);
        assert!(owner.fields.is_empty());
        assert_eq!(owner.estimated_size, 0x20);

        assert!(registry.cached("Node").is_some());
        assert!(registry.cached("Link").is_none());

        let link = registry.from_schema("Link");
        assert!(Arc::ptr_eq(
            link.field("Owner").unwrap().element_class.as_ref().unwrap(),
            &registry.cached("Node").unwrap()
        ));
    }
}
