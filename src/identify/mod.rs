// Wed Oct 14 2026 - Alex

pub mod address_type;
pub mod identification;
pub mod identifier;

pub use address_type::AddressType;
pub use identification::AddressIdentification;
pub use identifier::AddressIdentifier;
