// Fri Oct 16 2026 - Alex

pub mod classifier;

pub use classifier::{Classification, ObjectClassifier};

use crate::analysis::{DeallocRoutines, FunctionBody, MemoryHeuristics};
use crate::config::Config;
use crate::database::{KnownAddressDatabase, NameDatabase};
use crate::identify::{AddressIdentification, AddressIdentifier, AddressType};
use crate::memory::{Address, MemoryAccessor, MemoryError, MemoryRange};
use crate::schema::TypeSchemaRegistry;
use crate::structure::{
    pseudo, read_field, ClassDescriptor, ClassRegistry, Collaborators, FieldValue, HexColor, Highlighter,
    StructureError,
};
use crate::symbol::ModuleSymbolResolver;
use std::sync::Arc;

/// Everything the engine offers, wired over one process.
pub struct Inspector {
    memory: Arc<dyn MemoryAccessor>,
    database: Arc<KnownAddressDatabase>,
    heuristics: Arc<MemoryHeuristics>,
    identifier: Arc<AddressIdentifier>,
    registry: Arc<ClassRegistry>,
    classifier: ObjectClassifier,
}

impl Inspector {
    pub fn new(
        config: &Config,
        memory: Arc<dyn MemoryAccessor>,
        resolver: Arc<dyn ModuleSymbolResolver>,
        database: Arc<KnownAddressDatabase>,
        schemas: Arc<dyn TypeSchemaRegistry>,
    ) -> Self {
        let routines = if config.dealloc_routines.is_empty() {
            DeallocRoutines::resolve(memory.as_ref(), resolver.as_ref(), &config.dealloc_signatures)
        } else {
            DeallocRoutines::new(config.dealloc_routines.iter().copied().map(Address::new))
        };
        let heuristics = Arc::new(MemoryHeuristics::new(memory.clone(), routines, config.max_thunk_depth));
        let identifier = Arc::new(AddressIdentifier::new(
            memory.clone(),
            database.clone(),
            resolver.clone(),
            config.identification_ttl,
        ));
        let registry = Arc::new(ClassRegistry::new(
            Collaborators {
                memory: memory.clone(),
                heuristics: heuristics.clone(),
                database: database.clone(),
                schemas,
                resolver: resolver.clone(),
                identifier: identifier.clone(),
            },
            config.max_function_bytes,
            config.max_vtable_pages,
        ));
        let classifier = ObjectClassifier::new(
            memory.clone(),
            heuristics.clone(),
            resolver,
            identifier.clone(),
            registry.clone(),
            config.max_thunk_depth,
        );

        Self {
            memory,
            database,
            heuristics,
            identifier,
            registry,
            classifier,
        }
    }

    pub fn memory(&self) -> &dyn MemoryAccessor {
        self.memory.as_ref()
    }

    pub fn database(&self) -> &KnownAddressDatabase {
        &self.database
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn classify(&self, addr: Address) -> Classification {
        self.classifier.classify(addr)
    }

    pub fn identify(&self, addr: Address, hint: AddressType) -> AddressIdentification {
        self.identifier.identify(addr, hint)
    }

    pub fn analyze_function(&self, addr: Address) -> FunctionBody {
        self.registry.analyzer().analyze(addr)
    }

    pub fn enumerate_well_known(&self, mask: AddressType) -> Vec<(Address, AddressIdentification)> {
        self.identifier.enumerate_well_known(mask)
    }

    pub fn estimate_size(&self, dtor: Address) -> Option<u32> {
        self.heuristics.estimate_size(dtor)
    }

    /// Accumulated `this` adjustment of a virtual function reached through thunks.
    pub fn this_adjustment(&self, vfunc: Address) -> u32 {
        self.heuristics.this_adjustment(vfunc)
    }

    /// Reads a field of whatever object `addr` points into.
    pub fn read_field(&self, addr: Address, field: &str) -> Result<FieldValue, StructureError> {
        let found = self.classify(addr);
        read_field(self.memory.as_ref(), &found.class, found.object_address(addr), field)
    }

    /// Calls a schema method of the object `addr` points into.
    pub fn invoke(&self, addr: Address, method: &str) -> Result<FieldValue, StructureError> {
        let found = self.classify(addr);
        found.class.invoke(method, self.memory.as_ref(), found.object_address(addr))
    }

    /// Byte colours for a snapshot of the `class` object at `addr`.
    pub fn highlight(&self, addr: Address, class: &ClassDescriptor) -> Result<Vec<HexColor>, MemoryError> {
        let bytes = self.memory.read_bytes(addr, class.estimated_size as usize)?;
        let is_known_object = |target: Address| self.classify(target).class.is_known();
        Ok(Highlighter::new(self.memory.as_ref(), &is_known_object).highlight(class, &bytes))
    }

    /// `length` consecutive objects of the named type.
    pub fn array_of(&self, type_name: &str, length: u32) -> Result<ClassDescriptor, StructureError> {
        pseudo::generate_array(self.registry.from_schema(type_name), length)
    }

    pub fn thread_stack(&self, name: &str, range: &MemoryRange) -> ClassDescriptor {
        pseudo::thread_stack(name, range)
    }

    /// Replaces the name database. Every class and identification cached so far is dropped.
    pub fn reload_database(&self, data: NameDatabase, live_base: Option<Address>) -> u64 {
        let generation = self.database.load(data, live_base);
        self.invalidate();
        generation
    }

    pub fn unload_database(&self) -> u64 {
        let generation = self.database.unload();
        self.invalidate();
        generation
    }

    fn invalidate(&self) {
        self.registry.clear();
        self.identifier.clear();
    }

    /// Per-frame sweep of the identification cache.
    pub fn tick(&self) -> usize {
        self.identifier.tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SnapshotMemory;
    use crate::schema::{SchemaField, StaticSchemaRegistry, TypeSchema};
    use crate::structure::{FieldKind, SizeProvenance};
    use crate::utils::testing::*;

    const OBJECT: u64 = HEAP_BASE + 0x100;

    fn memory() -> SnapshotMemory {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE).mov_edx(0x40).call(DEALLOC_ROUTINE).ret().write(&mut memory);
        CodeBuilder::new(CODE_BASE + 0x800)
            .call(DEALLOC_ROUTINE)
            .raw(&[0x48, 0xc7, 0x04])
            .write(&mut memory);
        CodeBuilder::new(CODE_BASE + 0x900)
            .call(DEALLOC_ROUTINE)
            .raw(&[0x48, 0x8b, 0xc3, 0x48, 0x83, 0xc4, 0x20, 0x5f, 0x5d])
            .write(&mut memory);

        memory.patch_u64(Address::new(RDATA_BASE), dtor.as_u64());
        memory.patch_u64(Address::new(RDATA_BASE + 8), HEAP_BASE);
        memory.patch_u64(Address::new(OBJECT), RDATA_BASE);
        memory.patch(Address::new(OBJECT + 8), &7u32.to_le_bytes());
        memory
    }

    fn schemas() -> StaticSchemaRegistry {
        StaticSchemaRegistry::new().with(
            TypeSchema::new("Actor", 0x20)
                .with_field(SchemaField::scalar("VirtualTable", 0, FieldKind::Pointer))
                .with_field(SchemaField::scalar("Id", 8, FieldKind::UInt32))
                .with_method("GetId", |memory, addr| Ok(FieldValue::UInt32(memory.read_u32(addr + 8)?))),
        )
    }

    fn database() -> NameDatabase {
        let mut db = empty_database();
        db.classes.insert("Actor".into(), class_entry(RDATA_BASE, None));
        db
    }

    fn inspector(config: &Config) -> Inspector {
        Inspector::new(
            config,
            Arc::new(memory()),
            Arc::new(fake_symbols()),
            Arc::new(KnownAddressDatabase::new(IMAGE_BASE)),
            Arc::new(schemas()),
        )
    }

    #[test]
    fn test_dealloc_routines_from_signatures() {
        let inspector = inspector(&Config::default());
        assert_eq!(inspector.estimate_size(Address::new(CODE_BASE)), Some(0x40));
    }

    #[test]
    fn test_missing_signature_disables_sizes() {
        let config = Config {
            dealloc_signatures: vec!["DE AD BE EF".to_string()],
            ..Config::default()
        };
        let inspector = inspector(&config);
        assert_eq!(inspector.estimate_size(Address::new(CODE_BASE)), None);

        let found = inspector.classify(Address::new(OBJECT));
        assert_eq!(found.class.estimated_size, 0xf00);
        assert_eq!(found.class.size_provenance(), SizeProvenance::RestOfPage);
    }

    #[test]
    fn test_read_field_and_invoke_after_reload() {
        let inspector = inspector(&Config::default().with_dealloc_routines(vec![DEALLOC_ROUTINE]));
        assert_eq!(inspector.classify(Address::new(OBJECT)).class.name, format!("Cls_{:X}", RDATA_BASE));
        assert!(matches!(
            inspector.read_field(Address::new(OBJECT), "Id"),
            Err(StructureError::UnknownField { .. })
        ));

        inspector.reload_database(database(), None);
        let found = inspector.classify(Address::new(OBJECT));
        assert_eq!(found.class.name, "Actor");
        assert_eq!(found.class.estimated_size, 0x40);
        assert_eq!(found.class.size_from_schema, Some(0x20));

        assert_eq!(inspector.read_field(Address::new(OBJECT), "Id").unwrap(), FieldValue::UInt32(7));
        assert_eq!(inspector.invoke(Address::new(OBJECT), "GetId").unwrap(), FieldValue::UInt32(7));

        inspector.unload_database();
        assert_eq!(inspector.classify(Address::new(OBJECT)).class.name, format!("Cls_{:X}", RDATA_BASE));
    }

    #[test]
    fn test_highlight_object() {
        let inspector = inspector(&Config::default());
        inspector.reload_database(database(), None);
        let actor = inspector.classify(Address::new(OBJECT)).class;

        let colors = inspector.highlight(Address::new(OBJECT), &actor).unwrap();
        assert_eq!(colors.len(), 0x40);
        assert_eq!(colors[0], HexColor::ObjectPointer);
        assert_eq!(colors[8], HexColor::Integer);
        assert_eq!(colors[0x10], HexColor::Null);
    }

    #[test]
    fn test_identify_and_tick() {
        let inspector = inspector(&Config::default());
        let id = inspector.identify(Address::new(CODE_BASE + 0x10), AddressType::FUNCTION);
        assert_eq!(id.full_name().as_deref(), Some("game.exe+0x1010"));
        assert_eq!(inspector.tick(), 0);
        assert_eq!(inspector.tick(), 1);
    }

    #[test]
    fn test_arrays_of_schema_types() {
        let inspector = inspector(&Config::default());
        let array = inspector.array_of("Actor", 3).unwrap();
        assert_eq!(array.name, "Actor[3]");
        assert_eq!(array.estimated_size, 0x60);
    }
}
