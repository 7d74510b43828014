//! File attributes and the attribute bitmask.
//!
//! Every file attribute a script can name (`size`, `modification`, `hidden`,
//! …) has one bit in an [`AttrMask`].  While a predicate is parsed, each
//! resolved attribute name sets its bit on the enclosing file context; at run
//! time the loader fills exactly the fields whose bits are set, with at most
//! one metadata call per element.

use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::script::value::Kind;

/// Set of attribute fields referenced by a predicate tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct AttrMask(u32);

impl AttrMask {
    pub const ACCESS: Self       = Self(0x0000_0001);
    pub const ARCHIVE: Self      = Self(0x0000_0002);
    pub const CHANGE: Self       = Self(0x0000_0004);
    pub const COMPRESSED: Self   = Self(0x0000_0008);
    pub const CREATION: Self     = Self(0x0000_0010);
    pub const DEPTH: Self        = Self(0x0000_0020);
    pub const DRIVE: Self        = Self(0x0000_0040);
    pub const EMPTY: Self        = Self(0x0000_0080);
    pub const ENCRYPTED: Self    = Self(0x0000_0100);
    pub const EXISTS: Self       = Self(0x0000_0200);
    pub const EXTENSION: Self    = Self(0x0000_0400);
    pub const FULLNAME: Self     = Self(0x0000_0800);
    pub const HIDDEN: Self       = Self(0x0000_1000);
    pub const LIFETIME: Self     = Self(0x0000_2000);
    pub const MODIFICATION: Self = Self(0x0000_4000);
    pub const NAME: Self         = Self(0x0000_8000);
    pub const PARENT: Self       = Self(0x0001_0000);
    pub const PATH: Self         = Self(0x0002_0000);
    pub const READONLY: Self     = Self(0x0004_0000);
    pub const SIZE: Self         = Self(0x0008_0000);
    pub const IS_DIRECTORY: Self = Self(0x0010_0000);
    pub const IS_FILE: Self      = Self(0x0020_0000);

    pub const NONE: Self = Self(0);

    /// Fields that can only be answered by a metadata call.
    pub const NEEDS_METADATA: Self = Self(
        Self::ACCESS.0
            | Self::ARCHIVE.0
            | Self::CHANGE.0
            | Self::COMPRESSED.0
            | Self::CREATION.0
            | Self::EMPTY.0
            | Self::ENCRYPTED.0
            | Self::EXISTS.0
            | Self::HIDDEN.0
            | Self::LIFETIME.0
            | Self::MODIFICATION.0
            | Self::READONLY.0
            | Self::SIZE.0
            | Self::IS_DIRECTORY.0
            | Self::IS_FILE.0,
    );

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Attributes named by this mask, in declaration order.
    pub fn attributes(self) -> Vec<Attribute> {
        Attribute::ALL.iter().copied().filter(|a| self.contains(a.bit())).collect()
    }
}

impl BitOr for AttrMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOrAssign for AttrMask {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

impl BitAnd for AttrMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self { Self(self.0 & rhs.0) }
}

impl Not for AttrMask {
    type Output = Self;
    fn not(self) -> Self { Self(!self.0) }
}

// ── Attribute names ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Access,
    Archive,
    Change,
    Compressed,
    Creation,
    Depth,
    Drive,
    Empty,
    Encrypted,
    Exists,
    Extension,
    Fullname,
    Hidden,
    IsDirectory,
    IsFile,
    Lifetime,
    Modification,
    Name,
    Parent,
    Path,
    Readonly,
    Size,
}

impl Attribute {
    pub const ALL: [Attribute; 22] = [
        Attribute::Access,
        Attribute::Archive,
        Attribute::Change,
        Attribute::Compressed,
        Attribute::Creation,
        Attribute::Depth,
        Attribute::Drive,
        Attribute::Empty,
        Attribute::Encrypted,
        Attribute::Exists,
        Attribute::Extension,
        Attribute::Fullname,
        Attribute::Hidden,
        Attribute::IsDirectory,
        Attribute::IsFile,
        Attribute::Lifetime,
        Attribute::Modification,
        Attribute::Name,
        Attribute::Parent,
        Attribute::Path,
        Attribute::Readonly,
        Attribute::Size,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Access => "access",
            Attribute::Archive => "archive",
            Attribute::Change => "change",
            Attribute::Compressed => "compressed",
            Attribute::Creation => "creation",
            Attribute::Depth => "depth",
            Attribute::Drive => "drive",
            Attribute::Empty => "empty",
            Attribute::Encrypted => "encrypted",
            Attribute::Exists => "exists",
            Attribute::Extension => "extension",
            Attribute::Fullname => "fullname",
            Attribute::Hidden => "hidden",
            Attribute::IsDirectory => "isdirectory",
            Attribute::IsFile => "isfile",
            Attribute::Lifetime => "lifetime",
            Attribute::Modification => "modification",
            Attribute::Name => "name",
            Attribute::Parent => "parent",
            Attribute::Path => "path",
            Attribute::Readonly => "readonly",
            Attribute::Size => "size",
        }
    }

    pub fn from_name(name: &str) -> Option<Attribute> {
        Attribute::ALL.iter().copied().find(|a| a.name() == name)
    }

    pub fn kind(self) -> Kind {
        match self {
            Attribute::Access
            | Attribute::Change
            | Attribute::Creation
            | Attribute::Modification => Kind::Time,
            Attribute::Archive
            | Attribute::Compressed
            | Attribute::Empty
            | Attribute::Encrypted
            | Attribute::Exists
            | Attribute::Hidden
            | Attribute::IsDirectory
            | Attribute::IsFile
            | Attribute::Readonly => Kind::Bool,
            Attribute::Depth | Attribute::Size => Kind::Number,
            Attribute::Lifetime => Kind::Period,
            Attribute::Drive
            | Attribute::Extension
            | Attribute::Fullname
            | Attribute::Name
            | Attribute::Parent
            | Attribute::Path => Kind::String,
        }
    }

    pub fn bit(self) -> AttrMask {
        match self {
            Attribute::Access => AttrMask::ACCESS,
            Attribute::Archive => AttrMask::ARCHIVE,
            Attribute::Change => AttrMask::CHANGE,
            Attribute::Compressed => AttrMask::COMPRESSED,
            Attribute::Creation => AttrMask::CREATION,
            Attribute::Depth => AttrMask::DEPTH,
            Attribute::Drive => AttrMask::DRIVE,
            Attribute::Empty => AttrMask::EMPTY,
            Attribute::Encrypted => AttrMask::ENCRYPTED,
            Attribute::Exists => AttrMask::EXISTS,
            Attribute::Extension => AttrMask::EXTENSION,
            Attribute::Fullname => AttrMask::FULLNAME,
            Attribute::Hidden => AttrMask::HIDDEN,
            Attribute::IsDirectory => AttrMask::IS_DIRECTORY,
            Attribute::IsFile => AttrMask::IS_FILE,
            Attribute::Lifetime => AttrMask::LIFETIME,
            Attribute::Modification => AttrMask::MODIFICATION,
            Attribute::Name => AttrMask::NAME,
            Attribute::Parent => AttrMask::PARENT,
            Attribute::Path => AttrMask::PATH,
            Attribute::Readonly => AttrMask::READONLY,
            Attribute::Size => AttrMask::SIZE,
        }
    }
}
