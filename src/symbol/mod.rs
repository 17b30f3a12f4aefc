// Wed Oct 14 2026 - Alex

pub mod error;
pub mod module_address;
#[cfg(target_os = "linux")]
pub mod process_modules;
pub mod resolver;

pub use error::SymbolError;
pub use module_address::ModuleAddress;
#[cfg(target_os = "linux")]
pub use process_modules::ProcessModuleResolver;
pub use resolver::{ModuleInfo, ModuleSymbolResolver, SymbolTable};
