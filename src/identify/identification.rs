// Wed Oct 14 2026 - Alex

use crate::identify::AddressType;
use crate::structure::ClassIdentifier;
use crate::utils::Release;

/// Human-readable identity of an address.
///
/// `kind` is empty for addresses only known through the module resolver;
/// [`AddressIdentification::unknown`] is the sentinel for "nothing known".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressIdentification {
    pub kind: AddressType,
    pub class_name: String,
    pub class_hint: Option<ClassIdentifier>,
    pub name: Option<String>,
}

impl AddressIdentification {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn named(name: String) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    pub fn new(kind: AddressType, class_name: &str, class_hint: Option<ClassIdentifier>, name: Option<&str>) -> Self {
        Self {
            kind,
            class_name: class_name.to_string(),
            class_hint,
            name: name.map(str::to_string),
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }

    fn name_suffix(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => format!(" - {}", name),
            _ => String::new(),
        }
    }

    pub fn full_name(&self) -> Option<String> {
        let suffix = self.name_suffix();
        let kind = self.kind;
        if kind.is_empty() || kind == AddressType::GLOBAL {
            self.name.clone()
        } else if kind == AddressType::VIRTUAL_TABLE {
            Some(format!("vtbl_{}{}", self.class_name, suffix))
        } else if kind == AddressType::FUNCTION {
            if self.class_name.is_empty() {
                self.name.clone()
            } else {
                Some(format!("{}::{}", self.class_name, self.name.as_deref().unwrap_or_default()))
            }
        } else {
            Some(format!("{}{}", self.class_name, suffix))
        }
    }

    pub fn describe(&self) -> Option<String> {
        let suffix = self.name_suffix();
        let name = self.name.as_deref().unwrap_or_default();
        let kind = self.kind;
        if kind.is_empty() {
            self.name.clone()
        } else if kind == AddressType::INSTANCE {
            Some(format!("Well-known {}{}", self.class_name, suffix))
        } else if kind == AddressType::VIRTUAL_TABLE {
            Some(format!("Virtual table of {}{}", self.class_name, suffix))
        } else if kind == AddressType::GLOBAL {
            Some(format!("Global variable {}", name))
        } else if kind == AddressType::FUNCTION {
            if self.class_name.is_empty() {
                Some(format!("Function {}", name))
            } else {
                Some(format!("Function {}::{}", self.class_name, name))
            }
        } else {
            Some(format!("{:?} of {}{}", kind, self.class_name, suffix))
        }
    }
}

impl Release for AddressIdentification {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_names() {
        let vtbl = AddressIdentification::new(AddressType::VIRTUAL_TABLE, "Client::Game::Character", None, None);
        assert_eq!(vtbl.full_name().as_deref(), Some("vtbl_Client::Game::Character"));

        let instance = AddressIdentification::new(AddressType::INSTANCE, "Framework", None, Some("g_Framework"));
        assert_eq!(instance.full_name().as_deref(), Some("Framework - g_Framework"));

        let method = AddressIdentification::new(AddressType::FUNCTION, "Framework", None, Some("Tick"));
        assert_eq!(method.full_name().as_deref(), Some("Framework::Tick"));

        let free = AddressIdentification::new(AddressType::FUNCTION, "", None, Some("malloc"));
        assert_eq!(free.full_name().as_deref(), Some("malloc"));

        assert_eq!(AddressIdentification::unknown().full_name(), None);
        assert_eq!(
            AddressIdentification::named("Foo!Bar+0x10".to_string()).full_name().as_deref(),
            Some("Foo!Bar+0x10")
        );
    }

    #[test]
    fn test_descriptions() {
        let global = AddressIdentification::new(AddressType::GLOBAL, "", None, Some("g_Count"));
        assert_eq!(global.describe().as_deref(), Some("Global variable g_Count"));

        let vtbl = AddressIdentification::new(AddressType::VIRTUAL_TABLE, "Foo", None, None);
        assert_eq!(vtbl.describe().as_deref(), Some("Virtual table of Foo"));

        let method = AddressIdentification::new(AddressType::FUNCTION, "Foo", None, Some("Bar"));
        assert_eq!(method.describe().as_deref(), Some("Function Foo::Bar"));
    }

    #[test]
    fn test_unknown_sentinel() {
        assert!(AddressIdentification::unknown().is_unknown());
        assert!(!AddressIdentification::named("x".into()).is_unknown());
    }
}
