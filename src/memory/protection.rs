// Tue Oct 13 2026 - Alex

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protection {
    #[default]
    None = 0,
    Read = 1,
    Write = 2,
    ReadWrite = 3,
    Execute = 4,
    ReadExecute = 5,
    WriteExecute = 6,
    ReadWriteExecute = 7,
}

impl Protection {
    pub fn from_flags(flags: u32) -> Self {
        match flags & 7 {
            1 => Self::Read,
            2 => Self::Write,
            3 => Self::ReadWrite,
            4 => Self::Execute,
            5 => Self::ReadExecute,
            6 => Self::WriteExecute,
            7 => Self::ReadWriteExecute,
            _ => Self::None,
        }
    }

    /// Parses the permission column of `/proc/<pid>/maps` (`r-xp`, `rw-s`, ...).
    pub fn from_perms(perms: &str) -> Self {
        let bytes = perms.as_bytes();
        let mut flags = 0;
        if bytes.first() == Some(&b'r') {
            flags |= 1;
        }
        if bytes.get(1) == Some(&b'w') {
            flags |= 2;
        }
        if bytes.get(2) == Some(&b'x') {
            flags |= 4;
        }
        Self::from_flags(flags)
    }

    pub fn to_flags(self) -> u32 {
        self as u32
    }

    pub fn can_read(self) -> bool {
        self.to_flags() & 1 != 0
    }

    pub fn can_write(self) -> bool {
        self.to_flags() & 2 != 0
    }

    pub fn can_execute(self) -> bool {
        self.to_flags() & 4 != 0
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = if self.can_read() { 'r' } else { '-' };
        let w = if self.can_write() { 'w' } else { '-' };
        let x = if self.can_execute() { 'x' } else { '-' };
        write!(f, "{}{}{}", r, w, x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegionKind {
    #[default]
    Private,
    Mapped,
    Image,
    Stack,
}

/// Result of a page query. `committed == false` means nothing is mapped there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub committed: bool,
    pub protection: Protection,
    pub kind: RegionKind,
}

impl PageInfo {
    pub fn unmapped() -> Self {
        Self::default()
    }

    pub fn committed(protection: Protection, kind: RegionKind) -> Self {
        Self { committed: true, protection, kind }
    }

    pub fn can_read(&self) -> bool {
        self.committed && self.protection.can_read()
    }

    pub fn can_write(&self) -> bool {
        self.committed && self.protection.can_write()
    }

    /// Executable pages are only useful to the engine when their bytes can be copied too.
    pub fn can_execute(&self) -> bool {
        self.can_read() && self.protection.can_execute()
    }

    pub fn is_image(&self) -> bool {
        self.committed && self.kind == RegionKind::Image
    }
}
