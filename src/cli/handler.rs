// Fri Oct 16 2026 - Alex

use super::args::{parse_address, AddressArgs, Args, Command, IdentifyArgs, KindArg, TargetArgs, WellKnownArgs};
use crate::analysis::FunctionBody;
use crate::config::Config;
use crate::database::{KnownAddressDatabase, NameDatabase};
use crate::identify::AddressType;
use crate::inspector::Inspector;
use crate::memory::{Address, MemoryAccessor, Protection, RegionKind, SnapshotMemory};
use crate::schema::{StaticSchemaRegistry, TypeSchemaRegistry};
use crate::structure::{read_value, ClassKind};
use crate::symbol::{ModuleSymbolResolver, SymbolTable};
use anyhow::Context;
use colored::Colorize;
use std::sync::Arc;

impl From<KindArg> for AddressType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Instance => AddressType::INSTANCE,
            KindArg::Vtable => AddressType::VIRTUAL_TABLE,
            KindArg::Function => AddressType::FUNCTION,
            KindArg::Global => AddressType::GLOBAL,
            KindArg::All => AddressType::ALL,
        }
    }
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, args: Args) -> anyhow::Result<()> {
        self.setup_logging(&args)?;
        if args.no_color {
            colored::control::set_override(false);
        }

        let mut config = match &args.config {
            Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(path) = args.dataset.clone() {
            config = config.with_dataset(path);
        }
        if let Some(path) = args.schemas.clone() {
            config = config.with_schemas(path);
        }
        config.validate()?;

        let inspector = self.build_inspector(&config, &args.target)?;

        match args.command {
            Command::Classify(cmd) => self.handle_classify(&inspector, cmd),
            Command::Identify(cmd) => self.handle_identify(&inspector, cmd),
            Command::Disasm(cmd) => self.handle_disasm(&inspector, cmd),
            Command::WellKnown(cmd) => self.handle_well_known(&inspector, cmd),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .init();

        Ok(())
    }

    fn build_inspector(&self, config: &Config, target: &TargetArgs) -> anyhow::Result<Inspector> {
        let (memory, resolver) = self.open_target(config, target)?;

        let database = Arc::new(KnownAddressDatabase::new(config.dataset_preferred_base));
        if let Some(path) = &config.dataset_path {
            let data = NameDatabase::load(path).with_context(|| format!("loading name database {}", path.display()))?;
            let live_base = resolver.main_module().map(|m| m.base());
            let generation = database.load(data, live_base);
            log::info!("name database {} loaded (generation {})", path.display(), generation);
        }

        let schemas: Arc<dyn TypeSchemaRegistry> = match &config.schema_path {
            Some(path) => {
                let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
                let registry = StaticSchemaRegistry::from_json(&json)?;
                log::info!("{} type schemas loaded", registry.len());
                Arc::new(registry)
            }
            None => Arc::new(StaticSchemaRegistry::new()),
        };

        Ok(Inspector::new(config, memory, resolver, database, schemas))
    }

    fn open_target(
        &self,
        config: &Config,
        target: &TargetArgs,
    ) -> anyhow::Result<(Arc<dyn MemoryAccessor>, Arc<dyn ModuleSymbolResolver>)> {
        if let Some(path) = &target.dump {
            let base = Address::new(parse_address(&target.dump_base).map_err(|e| anyhow::anyhow!(e))?);
            let mut memory = SnapshotMemory::new(config.page_size);
            memory.load_dump(path, base, Protection::from_perms(&target.dump_perms), RegionKind::Image)?;
            let size = std::fs::metadata(path)?.len();

            let mut symbols = SymbolTable::new();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("dump");
            symbols.add_module(name, base, size);
            println!("{} Loaded dump {} at {}", "[+]".green(), path.display(), base);
            return Ok((Arc::new(memory), Arc::new(symbols)));
        }
        self.attach(config, target)
    }

    #[cfg(target_os = "linux")]
    fn attach(
        &self,
        config: &Config,
        target: &TargetArgs,
    ) -> anyhow::Result<(Arc<dyn MemoryAccessor>, Arc<dyn ModuleSymbolResolver>)> {
        use crate::memory::ProcessMemory;
        use crate::symbol::ProcessModuleResolver;
        use std::time::Duration;

        let memory = match (&target.pid, &target.process) {
            (Some(pid), _) => ProcessMemory::attach(*pid)?,
            (None, Some(name)) => ProcessMemory::attach_by_name(name)?,
            (None, None) => anyhow::bail!("one of --pid, --process or --dump is required"),
        };
        let pid = memory.pid();
        println!("{} Attached to process {}", "[+]".green(), pid);

        let resolver = ProcessModuleResolver::new(pid, Duration::from_millis(config.module_cache_max_age_ms));
        Ok((Arc::new(memory), Arc::new(resolver)))
    }

    #[cfg(not(target_os = "linux"))]
    fn attach(
        &self,
        _config: &Config,
        _target: &TargetArgs,
    ) -> anyhow::Result<(Arc<dyn MemoryAccessor>, Arc<dyn ModuleSymbolResolver>)> {
        anyhow::bail!("live processes are only supported on Linux, use --dump")
    }

    fn handle_classify(&self, inspector: &Inspector, cmd: AddressArgs) -> anyhow::Result<()> {
        let addr = Address::new(parse_address(&cmd.address).map_err(|e| anyhow::anyhow!(e))?);
        let found = inspector.classify(addr);
        let class = &found.class;

        if class.is_empty() {
            println!("{} {} is not readable", "[!]".red(), addr);
            return Ok(());
        }

        let name = if class.name.is_empty() { "<unknown>" } else { class.name.as_str() };
        println!("{} {}", "Class:".cyan().bold(), name.yellow());
        println!("  Kind: {:?}", class.kind);
        println!("  Size: 0x{:x} ({:?})", class.estimated_size, class.size_provenance());
        if found.displacement != 0 {
            println!("  Displacement: +0x{:x} (object at {})", found.displacement, found.object_address(addr));
        }
        if let Some(module) = &class.defining_module {
            println!("  Module: {}", module);
        }
        if !class.parents.is_empty() {
            println!("  Parents: {}", class.parents.join(" -> "));
        }
        if let Some(owner) = class.vtable_owner {
            println!("  Owner size: 0x{:x}, table at +0x{:x}", owner.size, owner.displacement);
        }

        if class.kind == ClassKind::Function {
            if let Some(body) = &class.function {
                print_function(body);
            }
            return Ok(());
        }

        if !class.fields.is_empty() {
            println!();
            println!("{}", "Fields:".yellow().bold());
            let base = found.object_address(addr);
            for field in &class.fields {
                let value = match read_value(inspector.memory(), base, field) {
                    Ok(value) => value.to_string(),
                    Err(e) => format!("<{}>", e).red().to_string(),
                };
                println!("  +0x{:04x} {:<32} {}", field.offset, field.name.cyan(), value);
            }
        }
        Ok(())
    }

    fn handle_identify(&self, inspector: &Inspector, cmd: IdentifyArgs) -> anyhow::Result<()> {
        let addr = Address::new(parse_address(&cmd.address).map_err(|e| anyhow::anyhow!(e))?);
        let identified = inspector.identify(addr, cmd.hint.into());
        match identified.describe() {
            Some(description) => println!("{} {}", addr, description.green()),
            None => println!("{} {}", addr, "unknown".red()),
        }
        Ok(())
    }

    fn handle_disasm(&self, inspector: &Inspector, cmd: AddressArgs) -> anyhow::Result<()> {
        let addr = Address::new(parse_address(&cmd.address).map_err(|e| anyhow::anyhow!(e))?);
        let body = inspector.analyze_function(addr);
        if body.instructions.is_empty() {
            println!("{} nothing decodable at {}", "[!]".red(), addr);
            return Ok(());
        }
        print_function(&body);
        Ok(())
    }

    fn handle_well_known(&self, inspector: &Inspector, cmd: WellKnownArgs) -> anyhow::Result<()> {
        if !inspector.database().is_loaded() {
            anyhow::bail!("no name database loaded, pass --dataset");
        }
        let found = inspector.enumerate_well_known(cmd.kind.into());
        for (addr, identified) in &found {
            let name = identified.full_name().unwrap_or_default();
            println!("{} {}", addr, name.cyan());
        }
        println!("{} {} addresses", "[+]".green(), found.len());
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Instructions with a jump gutter: one column per display column, `>` at sources, `<` at targets.
fn print_function(body: &FunctionBody) {
    println!();
    println!(
        "{} {} bytes, {} instructions, {} local jumps",
        "Function:".cyan().bold(),
        body.size,
        body.instructions.len(),
        body.local_jump_count()
    );

    let columns = body.jump_columns;
    let mut gutter = vec![vec![' '; columns]; body.instructions.len()];
    for (from, instr) in body.instructions.iter().enumerate() {
        let Some(jump) = instr.local_jump else {
            continue;
        };
        let Some(column) = jump.display_column else {
            continue;
        };
        let (low, high) = (from.min(jump.target), from.max(jump.target));
        for row in &mut gutter[low..=high] {
            row[columns - 1 - column] = '|';
        }
        gutter[from][columns - 1 - column] = '>';
        gutter[jump.target][columns - 1 - column] = '<';
    }

    for (instr, row) in body.instructions.iter().zip(gutter) {
        let gutter: String = row.into_iter().collect();
        let line = format!("{:X}  {}", instr.address(), instr.text());
        match &instr.annotation {
            Some(annotation) => println!("{} {}  {}", gutter.blue(), line, format!("; {}", annotation).green()),
            None => println!("{} {}", gutter.blue(), line),
        }
    }
}
